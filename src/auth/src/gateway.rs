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

//! Authenticated requests.
//!
//! The [Gateway] attaches the bearer token to outgoing requests. When the
//! service rejects a token with `401 Unauthorized` the gateway renews the
//! session and retries the request once.

use crate::Result;
use crate::api::bearer;
use crate::config::ClientConfig;
use crate::errors::Error;
use crate::scheduler::RefreshScheduler;
use crate::store::TokenStore;
use http::StatusCode;
use http::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};

/// Sends requests on behalf of the signed in user.
#[derive(Clone, Debug)]
pub struct Gateway {
    config: ClientConfig,
    store: TokenStore,
    scheduler: RefreshScheduler,
}

impl Gateway {
    pub fn new(config: ClientConfig, store: TokenStore, scheduler: RefreshScheduler) -> Self {
        Self {
            config,
            store,
            scheduler,
        }
    }

    /// Starts a request for `path`, relative to the configured endpoint.
    ///
    /// # Example
    /// ```no_run
    /// # use ritmio_auth::gateway::Gateway;
    /// # async fn sample(gateway: &Gateway) -> ritmio_auth::Result<()> {
    /// let builder = gateway.request(reqwest::Method::GET, "/users/me");
    /// let response = gateway.execute(builder, None).await?;
    /// println!("status = {}", response.status());
    /// # Ok(()) }
    /// ```
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.config.http().request(method, self.config.url(path))
    }

    /// Sends `builder` with a bearer token.
    ///
    /// Uses `token_override` if provided, and the stored access token
    /// otherwise. Fails with [Error::is_no_session] if there is neither.
    ///
    /// A `401 Unauthorized` response triggers a session refresh. If the
    /// refresh succeeds the request is sent again, once, with the new token.
    /// If it fails, or the request cannot be cloned, the 401 response is
    /// returned. Other responses are returned unchanged, whatever their
    /// status.
    pub async fn execute(
        &self,
        builder: RequestBuilder,
        token_override: Option<&str>,
    ) -> Result<Response> {
        let token = match token_override {
            Some(t) => t.to_string(),
            None => self.store.access_token().ok_or_else(Error::no_session)?,
        };
        let retry = builder.try_clone();
        let response = send(builder, &token).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!("request rejected with 401, refreshing the session");
        let Some(renewed) = self.scheduler.refresh_with(&token).await else {
            return Ok(response);
        };
        let Some(retry) = retry else {
            tracing::warn!("the request body cannot be cloned, returning the 401 response");
            return Ok(response);
        };
        send(retry, &renewed).await
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn scheduler(&self) -> &RefreshScheduler {
        &self.scheduler
    }
}

// Replaces any `Authorization` header set by the caller.
async fn send(builder: RequestBuilder, token: &str) -> Result<Response> {
    let (client, request) = builder.build_split();
    let mut request = request.map_err(Error::request)?;
    request.headers_mut().insert(AUTHORIZATION, bearer(token)?);
    client.execute(request).await.map_err(Error::network)
}
