// Copyright 2025 Google LLC
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

//! Ritmio Client Libraries for Rust - Tasks
//!
//! **WARNING:** this crate is under active development. We expect multiple
//! breaking changes in the upcoming releases.
//!
//! This crate manages the tasks, and subtasks, of the signed-in user. It
//! sends all its requests through the [ritmio_auth] gateway, which attaches
//! the access token and recovers from expired tokens.

pub mod client;
pub mod errors;
pub mod model;

pub(crate) mod supersede;

/// A `Result` alias where the `Err` case is `ritmio_tasks::errors::Error`.
pub type Result<T> = std::result::Result<T, crate::errors::Error>;
