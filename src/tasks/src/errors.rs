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

use http::StatusCode;

/// Represents an error using the tasks client.
///
/// These errors are local to the call that returned them. Session failures
/// are reported through [Error::Auth], and the auth components have already
/// updated the session state when they are returned.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request could not be authenticated or sent.
    #[error(transparent)]
    Auth(#[from] ritmio_auth::errors::Error),

    /// The service returned an unsuccessful status.
    #[error("the service responded with {status}: {message}")]
    Status { status: StatusCode, message: String },

    /// The response body could not be read.
    #[error("cannot read the response body")]
    Body(#[source] reqwest::Error),

    /// The response body could not be parsed.
    #[error("cannot parse the response body")]
    Deserialization(#[source] serde_json::Error),

    /// A newer list request started before this one completed.
    ///
    /// The result of this request was discarded.
    #[error("superseded by a newer request")]
    Superseded,
}

impl Error {
    /// The HTTP status code, if the service responded with one.
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Auth(e) => e.http_status(),
            _ => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded)
    }
}
