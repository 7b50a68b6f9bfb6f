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

//! Errors returned by the Ritmio auth components.

use http::StatusCode;
use std::error::Error as StdError;
use std::fmt::{Display, Formatter};

type BoxError = Box<dyn StdError + Send + Sync>;

/// The error returned by all the auth components.
///
/// Session-level failures (no session, a failed refresh) mean the caller must
/// treat the user as a guest. Per-request failures ([Error::http_status],
/// [Error::is_network]) are the caller's concern and do not affect the
/// session.
///
/// # Example
/// ```
/// use ritmio_auth::errors::{AuthErrorKind, Error};
/// fn describe(e: &Error) -> &'static str {
///     match e.auth_kind() {
///         Some(AuthErrorKind::EmailNotVerified) => "check your inbox",
///         Some(_) => "sign in failed",
///         None if e.is_no_session() => "sign in first",
///         None => "something went wrong",
///     }
/// }
/// assert_eq!(describe(&Error::no_session()), "sign in first");
/// ```
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
}

/// The reasons a login or registration attempt was rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthErrorKind {
    /// The service rejected the email and password combination (HTTP 401).
    InvalidCredentials,
    /// The account exists but its email is not verified yet (HTTP 403 with
    /// the `EMAIL_NOT_VERIFIED` code).
    EmailNotVerified,
    /// Any other HTTP 403.
    Forbidden,
    /// Any other unsuccessful status.
    Rejected(StatusCode),
}

#[derive(Debug)]
enum ErrorKind {
    NoSession,
    Auth(AuthErrorKind),
    Network,
    Refresh,
    Http { status: StatusCode, message: String },
    Deserialization,
    Request,
    InvalidInput(String),
}

impl Error {
    /// There is no access token, and the operation requires one.
    pub fn no_session() -> Self {
        Self {
            kind: ErrorKind::NoSession,
            source: None,
        }
    }

    /// The service rejected a login or registration attempt.
    pub fn auth(kind: AuthErrorKind) -> Self {
        Self {
            kind: ErrorKind::Auth(kind),
            source: None,
        }
    }

    /// The request could not reach the service.
    pub fn network<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Network,
            source: Some(source.into()),
        }
    }

    /// The refresh endpoint failed or rejected the current token.
    pub fn refresh<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Refresh,
            source: Some(source.into()),
        }
    }

    /// The service returned an unsuccessful status.
    pub fn http<T: Into<String>>(status: StatusCode, message: T) -> Self {
        Self {
            kind: ErrorKind::Http {
                status,
                message: message.into(),
            },
            source: None,
        }
    }

    /// The response body could not be parsed.
    pub fn deser<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Deserialization,
            source: Some(source.into()),
        }
    }

    /// The request could not be created, or could not be cloned for a retry.
    pub fn request<T: Into<BoxError>>(source: T) -> Self {
        Self {
            kind: ErrorKind::Request,
            source: Some(source.into()),
        }
    }

    /// The caller provided input that is rejected without contacting the
    /// service, for example an empty verification token.
    pub fn invalid_input<T: Into<String>>(message: T) -> Self {
        Self {
            kind: ErrorKind::InvalidInput(message.into()),
            source: None,
        }
    }

    /// No access token was available.
    ///
    /// Callers should treat the user as a guest.
    pub fn is_no_session(&self) -> bool {
        matches!(self.kind, ErrorKind::NoSession)
    }

    /// The reason a login or registration was rejected, if that is what
    /// this error represents.
    pub fn auth_kind(&self) -> Option<&AuthErrorKind> {
        match &self.kind {
            ErrorKind::Auth(k) => Some(k),
            _ => None,
        }
    }

    /// The request failed before a response was received.
    pub fn is_network(&self) -> bool {
        matches!(self.kind, ErrorKind::Network)
    }

    /// The session could not be refreshed.
    ///
    /// These errors are never retried. The session is already cleared when
    /// they are reported.
    pub fn is_refresh(&self) -> bool {
        matches!(self.kind, ErrorKind::Refresh)
    }

    /// The HTTP status code, for errors created from unsuccessful responses.
    pub fn http_status(&self) -> Option<StatusCode> {
        match &self.kind {
            ErrorKind::Http { status, .. } => Some(*status),
            ErrorKind::Auth(AuthErrorKind::InvalidCredentials) => Some(StatusCode::UNAUTHORIZED),
            ErrorKind::Auth(AuthErrorKind::EmailNotVerified | AuthErrorKind::Forbidden) => {
                Some(StatusCode::FORBIDDEN)
            }
            ErrorKind::Auth(AuthErrorKind::Rejected(status)) => Some(*status),
            _ => None,
        }
    }

    /// The response could not be parsed.
    pub fn is_deserialization(&self) -> bool {
        matches!(self.kind, ErrorKind::Deserialization)
    }

    /// The request could not be built.
    pub fn is_request(&self) -> bool {
        matches!(self.kind, ErrorKind::Request)
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidInput(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ErrorKind::NoSession => write!(f, "no active session, sign in first"),
            ErrorKind::Auth(AuthErrorKind::InvalidCredentials) => {
                write!(f, "invalid email or password")
            }
            ErrorKind::Auth(AuthErrorKind::EmailNotVerified) => {
                write!(f, "email verification required")
            }
            ErrorKind::Auth(AuthErrorKind::Forbidden) => write!(f, "access denied"),
            ErrorKind::Auth(AuthErrorKind::Rejected(status)) => {
                write!(f, "the request was rejected with status {status}")
            }
            ErrorKind::Network => write!(f, "cannot reach the server"),
            ErrorKind::Refresh => write!(f, "the session could not be refreshed"),
            ErrorKind::Http { status, message } if message.is_empty() => {
                write!(f, "the server responded with {status}")
            }
            ErrorKind::Http { status, message } => {
                write!(f, "the server responded with {status}: {message}")
            }
            ErrorKind::Deserialization => write!(f, "cannot parse the server response"),
            ErrorKind::Request => write!(f, "cannot prepare the request"),
            ErrorKind::InvalidInput(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn no_session() {
        let e = Error::no_session();
        assert!(e.is_no_session(), "{e:?}");
        assert!(e.source().is_none(), "{e:?}");
        assert!(e.auth_kind().is_none(), "{e:?}");
        assert!(e.http_status().is_none(), "{e:?}");
    }

    #[test_case(AuthErrorKind::InvalidCredentials, StatusCode::UNAUTHORIZED)]
    #[test_case(AuthErrorKind::EmailNotVerified, StatusCode::FORBIDDEN)]
    #[test_case(AuthErrorKind::Forbidden, StatusCode::FORBIDDEN)]
    #[test_case(AuthErrorKind::Rejected(StatusCode::BAD_GATEWAY), StatusCode::BAD_GATEWAY)]
    fn auth(kind: AuthErrorKind, want: StatusCode) {
        let e = Error::auth(kind.clone());
        assert_eq!(e.auth_kind(), Some(&kind));
        assert_eq!(e.http_status(), Some(want));
        assert!(!e.is_no_session(), "{e:?}");
    }

    #[test]
    fn with_source() {
        let e = Error::network("connection reset");
        assert!(e.is_network(), "{e:?}");
        let source = e.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("connection reset"));

        let e = Error::refresh("expired");
        assert!(e.is_refresh(), "{e:?}");
        assert!(e.source().is_some(), "{e:?}");

        let e = Error::deser("bad json");
        assert!(e.is_deserialization(), "{e:?}");

        let e = Error::request("cannot clone");
        assert!(e.is_request(), "{e:?}");

        let e = Error::invalid_input("passwords do not match");
        assert!(e.is_invalid_input(), "{e:?}");
        assert!(e.source().is_none(), "{e:?}");
        assert_eq!(e.to_string(), "passwords do not match");
    }

    #[test]
    fn fmt() {
        let e = Error::http(StatusCode::NOT_FOUND, "task not found");
        let got = format!("{e}");
        assert!(got.contains("404"), "{got}");
        assert!(got.contains("task not found"), "{got}");

        let e = Error::http(StatusCode::NOT_FOUND, "");
        let got = format!("{e}");
        assert!(!got.ends_with(": "), "{got}");

        let got = format!("{}", Error::auth(AuthErrorKind::InvalidCredentials));
        assert!(got.contains("invalid email or password"), "{got}");
    }
}
