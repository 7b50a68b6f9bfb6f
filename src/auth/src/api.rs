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

//! The session and account endpoints of the Ritmio API.
//!
//! These endpoints either need no credentials, or take the access token
//! explicitly. Endpoints authenticated with the stored session go through
//! the [Gateway][crate::gateway::Gateway].

use crate::Result;
use crate::config::ClientConfig;
use crate::errors::{AuthErrorKind, Error};
use crate::session::Session;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderValue};

const EMAIL_NOT_VERIFIED_CODE: &str = "EMAIL_NOT_VERIFIED";

/// The request body to create an account.
#[derive(Clone, PartialEq, Eq, serde::Serialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[censored]")
            .finish()
    }
}

/// The calls that create, renew and revoke sessions.
///
/// [HttpSessionApi] is the implementation used against the service. Tests
/// replace it to control the outcome of each call.
#[async_trait::async_trait]
pub trait SessionApi: std::fmt::Debug + Send + Sync {
    /// `POST /sessions`
    async fn login(&self, email: &str, password: &str) -> Result<Session>;
    /// `DELETE /sessions`, a 401 counts as success.
    async fn logout(&self, access_token: &str) -> Result<()>;
    /// `GET /sessions/new-token`, all failures are [Error::is_refresh].
    async fn refresh(&self, access_token: &str) -> Result<Session>;
    /// `POST /users`
    async fn register(&self, registration: &Registration) -> Result<()>;
    /// `POST /users/resend-verification`
    async fn resend_verification(&self, email: &str) -> Result<()>;
    /// `GET /users/verify-email?token=`
    async fn verify_email(&self, token: &str) -> Result<()>;
}

/// Implements [SessionApi] over HTTP.
#[derive(Clone, Debug)]
pub struct HttpSessionApi {
    config: ClientConfig,
}

#[derive(serde::Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(serde::Serialize)]
struct ResendRequest<'a> {
    email: &'a str,
}

#[derive(Default, serde::Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpSessionApi {
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.config.http().request(method, self.config.url(path))
    }
}

#[async_trait::async_trait]
impl SessionApi for HttpSessionApi {
    async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .request(reqwest::Method::POST, "/sessions")
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(Error::network)?;
        let status = response.status();
        if status.is_success() {
            return json_body::<Session>(response).await.map(Session::normalized);
        }
        let kind = match status {
            StatusCode::UNAUTHORIZED => AuthErrorKind::InvalidCredentials,
            StatusCode::FORBIDDEN => {
                let body = error_body(response).await;
                if body.code.as_deref() == Some(EMAIL_NOT_VERIFIED_CODE) {
                    AuthErrorKind::EmailNotVerified
                } else {
                    AuthErrorKind::Forbidden
                }
            }
            status => AuthErrorKind::Rejected(status),
        };
        Err(Error::auth(kind))
    }

    async fn logout(&self, access_token: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE, "/sessions")
            .header(AUTHORIZATION, bearer(access_token)?)
            .send()
            .await
            .map_err(Error::network)?;
        let status = response.status();
        if status.is_success() || status == StatusCode::UNAUTHORIZED {
            return Ok(());
        }
        Err(http_error(response).await)
    }

    async fn refresh(&self, access_token: &str) -> Result<Session> {
        let response = self
            .request(reqwest::Method::GET, "/sessions/new-token")
            .header(AUTHORIZATION, bearer(access_token).map_err(Error::refresh)?)
            .send()
            .await
            .map_err(Error::refresh)?;
        if !response.status().is_success() {
            return Err(Error::refresh(http_error(response).await));
        }
        json_body::<Session>(response)
            .await
            .map(Session::normalized)
            .map_err(Error::refresh)
    }

    async fn register(&self, registration: &Registration) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/users")
            .json(registration)
            .send()
            .await
            .map_err(Error::network)?;
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(match status {
            StatusCode::FORBIDDEN => Error::auth(AuthErrorKind::Forbidden),
            status => Error::auth(AuthErrorKind::Rejected(status)),
        })
    }

    async fn resend_verification(&self, email: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::POST, "/users/resend-verification")
            .json(&ResendRequest { email })
            .send()
            .await
            .map_err(Error::network)?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        Ok(())
    }

    async fn verify_email(&self, token: &str) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, "/users/verify-email")
            .query(&[("token", token)])
            .send()
            .await
            .map_err(Error::network)?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        Ok(())
    }
}

/// Formats `token` as a sensitive bearer `Authorization:` value.
pub(crate) fn bearer(token: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(Error::request)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Parses a successful response body.
pub(crate) async fn json_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let body = response.bytes().await.map_err(Error::network)?;
    serde_json::from_slice::<T>(&body).map_err(Error::deser)
}

/// Converts an unsuccessful response into an error.
///
/// Uses the `message` field of JSON error bodies when present, and the raw
/// body text otherwise.
pub(crate) async fn http_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or(text);
    Error::http(status, message.trim())
}

// Unparsable error bodies read as empty, the status alone decides.
async fn error_body(response: reqwest::Response) -> ErrorBody {
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str(&text).unwrap_or_default()
}
