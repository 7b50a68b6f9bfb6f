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

//! Session lifecycle notifications.
//!
//! The scheduler and the gateway never touch the UI state directly. They
//! announce refreshes and expirations on a broadcast channel, and whoever
//! cares (typically the [AuthController][crate::controller::AuthController])
//! subscribes.

use crate::session::Session;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

/// A change in the session, observed by the controller.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    /// The access token was renewed. Carries the new session.
    Refreshed(Session),
    /// The session could not be renewed and was cleared.
    Expired,
}

/// The in-process broadcast channel for [SessionEvent]s.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    tx: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Sends `event` to all current subscribers.
    ///
    /// Having no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::debug!(receivers, "published session event");
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}
