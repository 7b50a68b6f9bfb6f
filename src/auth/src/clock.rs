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

use time::OffsetDateTime;

/// The source of wall-clock time for refresh decisions.
///
/// Session timestamps come from the service as absolute instants, so the
/// scheduler needs the current wall-clock time, not a monotonic clock.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: std::fmt::Debug + Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

/// A [Clock] reading the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}
