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

//! Proactive session renewal.
//!
//! The service tells us when a token should be renewed (`refreshAfter`). The
//! scheduler keeps one timer armed for slightly before that instant, renews
//! the token when it fires, and re-arms itself for the new session. Very long
//! waits are split into several timers, each no longer than
//! [ClientConfig::max_timer].

use crate::api::SessionApi;
use crate::config::ClientConfig;
use crate::events::{SessionEvent, SessionEvents};
use crate::store::TokenStore;
use crate::timer::TimerSlot;
use std::sync::{Arc, Weak};
use std::time::Duration;
use time::OffsetDateTime;

/// Renews the stored session before it expires.
///
/// Cloning the scheduler is cheap, all clones share the same timer.
#[derive(Clone, Debug)]
pub struct RefreshScheduler {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    store: TokenStore,
    api: Arc<dyn SessionApi>,
    events: SessionEvents,
    timer: TimerSlot,
}

impl RefreshScheduler {
    pub fn new(
        config: ClientConfig,
        store: TokenStore,
        api: Arc<dyn SessionApi>,
        events: SessionEvents,
    ) -> Self {
        let inner = Inner {
            config,
            store,
            api,
            events,
            timer: TimerSlot::new(),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Arms the refresh timer for a session renewable at `refresh_after`.
    ///
    /// Replaces any pending timer. Must be called from within a tokio runtime.
    pub fn schedule(&self, refresh_after: OffsetDateTime) {
        let now = self.inner.config.clock().now();
        let delay = refresh_delay(refresh_after, now, self.inner.config.early_refresh());
        let max_timer = self.inner.config.max_timer();
        let weak = Arc::downgrade(&self.inner);
        if delay > max_timer {
            tracing::debug!(?delay, ?max_timer, "refresh is too far away, splitting the wait");
            self.inner.timer.arm(max_timer, async move {
                if let Some(this) = Self::upgrade(&weak) {
                    this.reschedule();
                }
            });
            return;
        }
        tracing::debug!(?delay, "scheduling session refresh");
        self.inner.timer.arm(delay, async move {
            if let Some(this) = Self::upgrade(&weak) {
                this.refresh_now().await;
            }
        });
    }

    /// Renews the stored session immediately.
    ///
    /// Returns the new access token, or `None` if there is no stored session
    /// or the renewal failed.
    pub async fn refresh_now(&self) -> Option<String> {
        let Some(token) = self.inner.store.access_token() else {
            tracing::debug!("no stored session, skipping refresh");
            return None;
        };
        self.refresh_with(&token).await
    }

    /// Renews the session identified by `access_token`.
    ///
    /// On success the new session is stored, the next refresh is scheduled,
    /// and [SessionEvent::Refreshed] is published. On failure the timer is
    /// cancelled, the store cleared, and [SessionEvent::Expired] published.
    /// Failed renewals are not retried.
    ///
    /// The renewal runs on its own task. Dropping the returned future stops
    /// waiting for it, but the new session is still stored and announced.
    pub async fn refresh_with(&self, access_token: &str) -> Option<String> {
        let this = self.clone();
        let token = access_token.to_string();
        match tokio::spawn(async move { this.renew(&token).await }).await {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::warn!("session refresh task did not complete: {e}");
                None
            }
        }
    }

    async fn renew(&self, access_token: &str) -> Option<String> {
        match self.inner.api.refresh(access_token).await {
            Ok(session) => {
                tracing::debug!(refresh_after = %session.refresh_after, "session refreshed");
                self.inner.store.set(&session);
                self.schedule(session.refresh_after);
                let token = session.access_token.clone();
                self.inner.events.publish(SessionEvent::Refreshed(session));
                Some(token)
            }
            Err(e) => {
                tracing::warn!("session refresh failed, signing out: {e}");
                self.inner.timer.cancel();
                self.inner.store.clear();
                self.inner.events.publish(SessionEvent::Expired);
                None
            }
        }
    }

    /// Cancels the pending refresh, if any.
    pub fn cancel(&self) {
        self.inner.timer.cancel();
    }

    /// Returns true if a refresh timer is pending.
    pub fn is_armed(&self) -> bool {
        self.inner.timer.is_armed()
    }

    fn reschedule(&self) {
        match self.inner.store.refresh_after() {
            Some(refresh_after) => self.schedule(refresh_after),
            None => tracing::debug!("session cleared while waiting, not rescheduling"),
        }
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}

/// The time to wait before renewing a session, never negative.
fn refresh_delay(refresh_after: OffsetDateTime, now: OffsetDateTime, early: Duration) -> Duration {
    Duration::try_from(refresh_after - now)
        .unwrap_or(Duration::ZERO)
        .saturating_sub(early)
}
