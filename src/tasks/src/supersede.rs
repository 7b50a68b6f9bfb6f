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

use crate::Result;
use crate::errors::Error;
use std::future::Future;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Runs operations where only the latest one matters.
///
/// Starting an operation cancels the one in flight, which then resolves to
/// [Error::Superseded].
#[derive(Debug, Default)]
pub(crate) struct Supersede {
    current: Mutex<Option<CancellationToken>>,
}

impl Supersede {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn run<F, T>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let token = self.begin();
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Superseded),
            result = operation => result,
        }
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let previous = self
            .current
            .lock()
            .expect("supersede lock is poisoned")
            .replace(token.clone());
        if let Some(previous) = previous {
            tracing::debug!("cancelling superseded request");
            previous.cancel();
        }
        token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn single() -> anyhow::Result<()> {
        let guard = Supersede::new();
        let got = guard.run(async { Ok(42) }).await?;
        assert_eq!(got, 42);
        let got = guard.run(async { Ok(7) }).await?;
        assert_eq!(got, 7);
        Ok(())
    }

    #[tokio::test]
    async fn errors_pass_through() {
        let guard = Supersede::new();
        let err = guard
            .run(async {
                Err::<(), _>(Error::Status {
                    status: http::StatusCode::NOT_FOUND,
                    message: String::new(),
                })
            })
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(http::StatusCode::NOT_FOUND));
    }

    #[tokio::test(start_paused = true)]
    async fn newer_cancels_older() -> anyhow::Result<()> {
        let guard = Arc::new(Supersede::new());
        let (started_tx, started_rx) = oneshot::channel();
        let older = {
            let guard = guard.clone();
            tokio::spawn(async move {
                guard
                    .run(async move {
                        let _ = started_tx.send(());
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok("older")
                    })
                    .await
            })
        };
        started_rx.await?;

        let newer = guard.run(async { Ok("newer") }).await?;
        assert_eq!(newer, "newer");
        let err = older.await?.unwrap_err();
        assert!(err.is_superseded(), "{err:?}");
        Ok(())
    }
}
