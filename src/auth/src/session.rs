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

//! Types to work with Ritmio sessions and user profiles.

use time::OffsetDateTime;

/// An authenticated session, as returned by the login and refresh endpoints.
#[derive(Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// The bearer token.
    ///
    /// This is the value used in the `Authorization:` header.
    pub access_token: String,

    /// The instant at which the service stops accepting the token.
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,

    /// The instant after which the token should be renewed.
    ///
    /// Always at or before `expires_at`.
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_after: OffsetDateTime,
}

impl Session {
    /// Creates a session, clamping `refresh_after` to `expires_at`.
    pub fn new<T: Into<String>>(
        access_token: T,
        expires_at: OffsetDateTime,
        refresh_after: OffsetDateTime,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
            refresh_after,
        }
        .normalized()
    }

    // Services occasionally send a refresh time past the expiration. Renewing
    // at expiration is the latest safe choice.
    pub(crate) fn normalized(mut self) -> Self {
        if self.refresh_after > self.expires_at {
            tracing::warn!(
                refresh_after = %self.refresh_after,
                expires_at = %self.expires_at,
                "session refresh time is after its expiration, clamping"
            );
            self.refresh_after = self.expires_at;
        }
        self
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"[censored]")
            .field("expires_at", &self.expires_at)
            .field("refresh_after", &self.refresh_after)
            .finish()
    }
}

/// The profile of the signed-in user.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use time::Duration;
    use time::macros::datetime;

    pub(crate) fn test_session(token: &str, refresh_after: OffsetDateTime) -> Session {
        Session::new(token, refresh_after + Duration::minutes(5), refresh_after)
    }

    #[test]
    fn debug() {
        let session = Session::new(
            "token-test-only",
            datetime!(2025-03-01 10:00 UTC),
            datetime!(2025-03-01 09:55 UTC),
        );
        let got = format!("{session:?}");
        assert!(!got.contains("token-test-only"), "{got}");
        assert!(got.contains("access_token: \"[censored]\""), "{got}");
        assert!(got.contains("expires_at"), "{got}");
    }

    #[test]
    fn deserialize() -> anyhow::Result<()> {
        let got = serde_json::from_value::<Session>(json!({
            "accessToken": "abc",
            "expiresAt": "2025-03-01T10:00:00Z",
            "refreshAfter": "2025-03-01T09:55:00.250+00:00",
        }))?;
        assert_eq!(got.access_token, "abc");
        assert_eq!(got.expires_at, datetime!(2025-03-01 10:00 UTC));
        assert_eq!(got.refresh_after, datetime!(2025-03-01 09:55:00.250 UTC));
        Ok(())
    }

    #[test]
    fn deserialize_bad_timestamp() {
        let got = serde_json::from_value::<Session>(json!({
            "accessToken": "abc",
            "expiresAt": "tomorrow",
            "refreshAfter": "2025-03-01T09:55:00Z",
        }));
        assert!(got.is_err(), "{got:?}");
    }

    #[test]
    fn clamps_refresh_after() {
        let session = Session::new(
            "abc",
            datetime!(2025-03-01 10:00 UTC),
            datetime!(2025-03-01 11:00 UTC),
        );
        assert_eq!(session.refresh_after, session.expires_at);
    }

    #[test]
    fn profile_serde() -> anyhow::Result<()> {
        let profile = serde_json::from_value::<Profile>(json!({
            "id": 7, "name": "Ada", "email": "a@b.com"
        }))?;
        assert_eq!(
            profile,
            Profile {
                id: 7,
                name: "Ada".into(),
                email: "a@b.com".into()
            }
        );
        Ok(())
    }
}
