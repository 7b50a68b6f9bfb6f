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

//! Client configuration.

use crate::clock::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// The environment variable overriding the default API endpoint.
pub const API_URL_VAR: &str = "RITMIO_API_URL";

pub(crate) const DEFAULT_ENDPOINT: &str = "http://localhost:8080/api/v1";

/// How long before the refresh-after instant the scheduler renews a token.
pub const DEFAULT_EARLY_REFRESH: Duration = Duration::from_secs(5);

/// The longest delay armed on a single timer.
///
/// Longer waits are split: the timer fires at this limit and the scheduler
/// re-arms itself from the stored refresh time.
pub const DEFAULT_MAX_TIMER: Duration = Duration::from_millis(2_147_000_000);

/// Shorter `max_timer` values are raised to this limit.
pub const MIN_MAX_TIMER: Duration = Duration::from_secs(1);

/// The configuration shared by the API client, the gateway and the scheduler.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub(crate) endpoint: String,
    pub(crate) early_refresh: Duration,
    pub(crate) max_timer: Duration,
    pub(crate) http: reqwest::Client,
    pub(crate) clock: Arc<dyn Clock>,
}

impl ClientConfig {
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// The API base URL, without a trailing slash.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn early_refresh(&self) -> Duration {
        self.early_refresh
    }

    pub fn max_timer(&self) -> Duration {
        self.max_timer
    }

    /// Returns the absolute URL for `path`.
    ///
    /// # Example
    /// ```
    /// # use ritmio_auth::config::ClientConfig;
    /// let config = ClientConfig::builder().with_endpoint("https://api.example.com/v1/").build();
    /// assert_eq!(config.url("sessions"), "https://api.example.com/v1/sessions");
    /// assert_eq!(config.url("/users/me"), "https://api.example.com/v1/users/me");
    /// ```
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.endpoint)
        } else {
            format!("{}/{path}", self.endpoint)
        }
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Builder::default().build()
    }
}

/// Builds a [ClientConfig].
///
/// Settings not provided explicitly fall back to the environment, and then to
/// built-in defaults.
#[derive(Debug, Default)]
pub struct Builder {
    endpoint: Option<String>,
    early_refresh: Option<Duration>,
    max_timer: Option<Duration>,
    http: Option<reqwest::Client>,
    clock: Option<Arc<dyn Clock>>,
}

impl Builder {
    /// Sets the API base URL.
    ///
    /// If not set, the value of `RITMIO_API_URL` is used, and if that is not
    /// set either, `http://localhost:8080/api/v1`.
    pub fn with_endpoint<T: Into<String>>(mut self, endpoint: T) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets how long before the refresh-after instant tokens are renewed.
    pub fn with_early_refresh(mut self, v: Duration) -> Self {
        self.early_refresh = Some(v);
        self
    }

    /// Sets the longest delay armed on a single timer.
    ///
    /// Values below [MIN_MAX_TIMER] are raised to it.
    pub fn with_max_timer(mut self, v: Duration) -> Self {
        self.max_timer = Some(v);
        self
    }

    /// Uses a preconfigured HTTP client, for example with custom timeouts.
    pub fn with_http_client(mut self, v: reqwest::Client) -> Self {
        self.http = Some(v);
        self
    }

    /// Replaces the wall clock used in refresh decisions.
    pub fn with_clock<C: Clock + 'static>(mut self, v: C) -> Self {
        self.clock = Some(Arc::new(v));
        self
    }

    pub fn build(self) -> ClientConfig {
        let endpoint = self
            .endpoint
            .or_else(|| std::env::var(API_URL_VAR).ok().filter(|v| !v.is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        ClientConfig {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            early_refresh: self.early_refresh.unwrap_or(DEFAULT_EARLY_REFRESH),
            max_timer: self
                .max_timer
                .unwrap_or(DEFAULT_MAX_TIMER)
                .max(MIN_MAX_TIMER),
            http: self.http.unwrap_or_default(),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoped_env::ScopedEnv;
    use test_case::test_case;

    #[test]
    #[serial_test::serial]
    fn defaults() {
        let _e = ScopedEnv::remove(API_URL_VAR);
        let config = ClientConfig::default();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert_eq!(config.early_refresh(), Duration::from_secs(5));
        assert_eq!(config.max_timer(), Duration::from_millis(2_147_000_000));
    }

    #[test]
    #[serial_test::serial]
    fn endpoint_from_env() {
        let _e = ScopedEnv::set(API_URL_VAR, "https://api.ritmio.test/v2//");
        let config = ClientConfig::default();
        assert_eq!(config.endpoint(), "https://api.ritmio.test/v2");

        let config = ClientConfig::builder()
            .with_endpoint("https://override.test")
            .build();
        assert_eq!(config.endpoint(), "https://override.test");
    }

    #[test]
    #[serial_test::serial]
    fn empty_env_is_ignored() {
        let _e = ScopedEnv::set(API_URL_VAR, "");
        let config = ClientConfig::default();
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
    }

    #[test_case(Duration::ZERO, MIN_MAX_TIMER; "zero")]
    #[test_case(Duration::from_millis(10), MIN_MAX_TIMER; "too short")]
    #[test_case(Duration::from_secs(60), Duration::from_secs(60); "kept")]
    fn max_timer(v: Duration, want: Duration) {
        let config = ClientConfig::builder()
            .with_endpoint("http://h.test")
            .with_max_timer(v)
            .build();
        assert_eq!(config.max_timer(), want);
    }

    #[test_case("sessions", "http://h.test/api/sessions")]
    #[test_case("/sessions", "http://h.test/api/sessions")]
    #[test_case("/users/me/tasks?page=2", "http://h.test/api/users/me/tasks?page=2")]
    fn url(path: &str, want: &str) {
        let config = ClientConfig::builder()
            .with_endpoint("http://h.test/api/")
            .build();
        assert_eq!(config.url(path), want);
    }

    #[test]
    fn overrides() {
        let config = ClientConfig::builder()
            .with_early_refresh(Duration::from_secs(30))
            .with_max_timer(Duration::from_secs(60))
            .build();
        assert_eq!(config.early_refresh(), Duration::from_secs(30));
        assert_eq!(config.max_timer(), Duration::from_secs(60));
    }
}
