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

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::AbortHandle;

/// Holds at most one pending deferred callback.
///
/// Arming the slot cancels whatever was pending. A timer that fires releases
/// the slot before running its callback, so the callback may re-arm the slot
/// without cancelling itself.
///
/// Must be used from within a tokio runtime.
#[derive(Clone, Debug, Default)]
pub(crate) struct TimerSlot {
    inner: Arc<Mutex<Slot>>,
}

#[derive(Debug, Default)]
struct Slot {
    // Incremented on every arm and cancel. A firing timer whose generation
    // does not match was superseded and must not run.
    generation: u64,
    pending: Option<AbortHandle>,
}

impl TimerSlot {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Runs `callback` after `delay`, replacing any pending timer.
    pub(crate) fn arm<F>(&self, delay: Duration, callback: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut slot = self.lock();
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;
        let inner = self.inner.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = inner.lock().expect("timer slot lock is poisoned");
                if slot.generation != generation {
                    return;
                }
                slot.pending = None;
            }
            callback.await;
        });
        slot.pending = Some(handle.abort_handle());
    }

    /// Cancels the pending timer, if any.
    pub(crate) fn cancel(&self) {
        let mut slot = self.lock();
        slot.generation += 1;
        if let Some(pending) = slot.pending.take() {
            pending.abort();
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.inner.lock().expect("timer slot lock is poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::mpsc;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn fires_after_delay() -> anyhow::Result<()> {
        let start = Instant::now();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot = TimerSlot::new();
        slot.arm(Duration::from_secs(30), async move {
            let _ = tx.send(Instant::now());
        });
        assert!(slot.is_armed());

        let fired = rx.recv().await.expect("timer should fire");
        assert_eq!(fired - start, Duration::from_secs(30));
        assert!(!slot.is_armed());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rearm_replaces_pending() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = TimerSlot::new();
        for i in 1..=3 {
            let calls = calls.clone();
            slot.arm(Duration::from_secs(10), async move {
                calls.fetch_add(i, Ordering::SeqCst);
            });
        }
        tokio::time::sleep(Duration::from_secs(60)).await;
        // Only the last timer, which adds 3, ran.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel() {
        let calls = Arc::new(AtomicUsize::new(0));
        let slot = TimerSlot::new();
        let c = calls.clone();
        slot.arm(Duration::from_secs(10), async move {
            c.fetch_add(1, Ordering::SeqCst);
        });
        slot.cancel();
        slot.cancel();
        assert!(!slot.is_armed());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn callback_can_rearm() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let slot = TimerSlot::new();
        let inner = slot.clone();
        slot.arm(Duration::from_secs(10), async move {
            let tx2 = tx.clone();
            inner.arm(Duration::from_secs(10), async move {
                let _ = tx2.send("second");
            });
            // The timer is running, re-arming must not have aborted it.
            tokio::task::yield_now().await;
            let _ = tx.send("first");
        });

        assert_eq!(rx.recv().await, Some("first"));
        assert!(slot.is_armed());
        assert_eq!(rx.recv().await, Some("second"));
    }
}
