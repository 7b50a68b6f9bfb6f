// Copyright 2024 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Ritmio Client Libraries for Rust - Authentication Components
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases.
//!
//! This crate keeps a Ritmio user signed in. It stores the session issued by
//! the service, renews the access token before it expires, attaches the token
//! to outgoing requests, and recovers from `401 Unauthorized` responses by
//! renewing the session and retrying once.
//!
//! Most applications create an [AuthController][controller::AuthController],
//! call [bootstrap][controller::AuthController::bootstrap] on startup, and
//! send their own requests through its [Gateway][gateway::Gateway]:
//!
//! ```no_run
//! # use ritmio_auth::config::ClientConfig;
//! # use ritmio_auth::controller::AuthController;
//! # use ritmio_auth::store::{FileStore, TokenStore};
//! # async fn sample() -> anyhow::Result<()> {
//! let store = TokenStore::new(FileStore::new("ritmio-session.json"));
//! let controller = AuthController::new(ClientConfig::default(), store);
//! let _listener = controller.listen();
//! controller.bootstrap().await;
//!
//! let gateway = controller.gateway();
//! let response = gateway
//!     .execute(gateway.request(reqwest::Method::GET, "/users/me/tasks"), None)
//!     .await?;
//! println!("{}", response.text().await?);
//! # Ok(()) }
//! ```

pub mod errors;

/// A `Result` alias where the `Err` case is `ritmio_auth::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;

pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod events;
pub mod gateway;
pub mod scheduler;
pub mod session;
pub mod store;

/// The single-slot cancellable timer used by the scheduler.
pub(crate) mod timer;
