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

//! Durable storage for the session and the cached profile.
//!
//! The client keeps four entries: the access token, the refresh-after and
//! expiration timestamps, and an optional copy of the user profile. All of
//! them are written and cleared together. Storage problems never surface as
//! errors, a missing or corrupt entry simply reads as absent.

use crate::session::{Profile, Session};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub(crate) const ACCESS_TOKEN_KEY: &str = "accessToken";
pub(crate) const REFRESH_AFTER_KEY: &str = "refreshAfter";
pub(crate) const EXPIRES_AT_KEY: &str = "expiresAt";
pub(crate) const PROFILE_CACHE_KEY: &str = "meCache";

/// A synchronous key/value store that survives restarts.
///
/// Implementations must not panic on missing or corrupt data. Failures to
/// persist are logged and otherwise ignored.
pub trait KeyValueStore: std::fmt::Debug + Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
}

/// A [KeyValueStore] that lives in memory.
///
/// Useful in tests, and for clients that should not persist credentials.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().expect("memory store lock is poisoned")
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.entries().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.entries().remove(key);
    }
}

/// A [KeyValueStore] backed by a JSON file.
///
/// The file holds a single JSON object mapping keys to string values. It is
/// rewritten on every change, through a temporary file and a rename, so a
/// crash never leaves a half-written file behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // Serializes the read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> BTreeMap<String, String> {
        let contents = match std::fs::read(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "cannot read session store: {e}");
                return BTreeMap::new();
            }
        };
        serde_json::from_slice(&contents).unwrap_or_else(|e| {
            tracing::warn!(path = %self.path.display(), "ignoring corrupt session store: {e}");
            BTreeMap::new()
        })
    }

    fn save(&self, entries: &BTreeMap<String, String>) {
        if let Err(e) = self.try_save(entries) {
            tracing::warn!(path = %self.path.display(), "cannot write session store: {e}");
        }
    }

    fn try_save(&self, entries: &BTreeMap<String, String>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_vec(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)
    }

    fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self.lock.lock().expect("file store lock is poisoned");
        let mut entries = self.load();
        if f(&mut entries) {
            self.save(&entries);
        }
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().expect("file store lock is poisoned");
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: String) {
        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        });
    }

    fn remove(&self, key: &str) {
        self.update(|entries| entries.remove(key).is_some());
    }
}

/// Reads and writes the session entries of a [KeyValueStore].
///
/// The store is the only owner of the persisted session. Writes overwrite
/// whatever is there, the last writer wins.
#[derive(Clone, Debug)]
pub struct TokenStore {
    inner: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn from_arc(store: Arc<dyn KeyValueStore>) -> Self {
        Self { inner: store }
    }

    /// Creates a store that lives in memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// Returns the stored session, if all its entries are present and valid.
    pub fn get(&self) -> Option<Session> {
        let access_token = self.access_token()?;
        let expires_at = self.timestamp(EXPIRES_AT_KEY)?;
        let refresh_after = self.refresh_after()?;
        Some(Session {
            access_token,
            expires_at,
            refresh_after,
        })
    }

    /// Returns the stored access token, even if the timestamps are missing.
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .get(ACCESS_TOKEN_KEY)
            .filter(|token| !token.is_empty())
    }

    /// Returns the stored refresh-after instant.
    pub fn refresh_after(&self) -> Option<OffsetDateTime> {
        self.timestamp(REFRESH_AFTER_KEY)
    }

    /// Replaces the stored session.
    pub fn set(&self, session: &Session) {
        self.inner.set(ACCESS_TOKEN_KEY, session.access_token.clone());
        self.set_timestamp(REFRESH_AFTER_KEY, session.refresh_after);
        self.set_timestamp(EXPIRES_AT_KEY, session.expires_at);
    }

    /// Removes the session and the cached profile.
    pub fn clear(&self) {
        self.inner.remove(ACCESS_TOKEN_KEY);
        self.inner.remove(REFRESH_AFTER_KEY);
        self.inner.remove(EXPIRES_AT_KEY);
        self.clear_profile();
    }

    /// Returns the cached profile.
    ///
    /// A cached profile that cannot be parsed is deleted.
    pub fn profile(&self) -> Option<Profile> {
        let raw = self.inner.get(PROFILE_CACHE_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                tracing::warn!("dropping corrupt cached profile: {e}");
                self.clear_profile();
                None
            }
        }
    }

    pub fn set_profile(&self, profile: &Profile) {
        match serde_json::to_string(profile) {
            Ok(raw) => self.inner.set(PROFILE_CACHE_KEY, raw),
            Err(e) => tracing::warn!("cannot cache profile: {e}"),
        }
    }

    pub fn clear_profile(&self) {
        self.inner.remove(PROFILE_CACHE_KEY);
    }

    fn timestamp(&self, key: &str) -> Option<OffsetDateTime> {
        let raw = self.inner.get(key)?;
        OffsetDateTime::parse(&raw, &Rfc3339)
            .inspect_err(|e| tracing::warn!(key, "ignoring corrupt stored timestamp: {e}"))
            .ok()
    }

    fn set_timestamp(&self, key: &str, value: OffsetDateTime) {
        match value.format(&Rfc3339) {
            Ok(raw) => self.inner.set(key, raw),
            Err(e) => {
                tracing::warn!(key, "cannot format timestamp: {e}");
                self.inner.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::tests::test_session;
    use time::macros::datetime;

    #[test]
    fn roundtrip() {
        let store = TokenStore::in_memory();
        assert!(store.get().is_none());

        let session = test_session("token-1", datetime!(2025-03-01 09:55 UTC));
        store.set(&session);
        assert_eq!(store.get(), Some(session.clone()));
        assert_eq!(store.access_token().as_deref(), Some("token-1"));
        assert_eq!(store.refresh_after(), Some(session.refresh_after));

        store.clear();
        assert!(store.get().is_none());
        assert!(store.access_token().is_none());
    }

    #[test]
    fn last_write_wins() {
        let store = TokenStore::in_memory();
        store.set(&test_session("token-1", datetime!(2025-03-01 09:55 UTC)));
        let second = test_session("token-2", datetime!(2025-03-01 10:55 UTC));
        store.set(&second);
        assert_eq!(store.get(), Some(second));
    }

    #[test]
    fn clear_is_idempotent() {
        let store = TokenStore::in_memory();
        store.clear();
        store.set(&test_session("token-1", datetime!(2025-03-01 09:55 UTC)));
        store.clear();
        store.clear();
        assert!(store.get().is_none());
    }

    #[test]
    fn corrupt_timestamp() {
        let kv = Arc::new(MemoryStore::new());
        let store = TokenStore::from_arc(kv.clone());
        store.set(&test_session("token-1", datetime!(2025-03-01 09:55 UTC)));
        kv.set(REFRESH_AFTER_KEY, "not-a-date".to_string());

        assert!(store.get().is_none());
        assert!(store.refresh_after().is_none());
        assert_eq!(store.access_token().as_deref(), Some("token-1"));
    }

    #[test]
    fn profile_cache() {
        let store = TokenStore::in_memory();
        assert!(store.profile().is_none());

        let profile = Profile {
            id: 1,
            name: "Ada".into(),
            email: "a@b.com".into(),
        };
        store.set_profile(&profile);
        assert_eq!(store.profile(), Some(profile));

        store.clear();
        assert!(store.profile().is_none());
    }

    #[test]
    fn corrupt_profile_heals() {
        let kv = Arc::new(MemoryStore::new());
        let store = TokenStore::from_arc(kv.clone());
        kv.set(PROFILE_CACHE_KEY, "{not json".to_string());

        assert!(store.profile().is_none());
        assert!(kv.get(PROFILE_CACHE_KEY).is_none());
    }

    #[test]
    fn file_store_survives_restart() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("session.json");
        let session = test_session("token-1", datetime!(2025-03-01 09:55 UTC));

        TokenStore::new(FileStore::new(&path)).set(&session);

        let reopened = TokenStore::new(FileStore::new(&path));
        assert_eq!(reopened.get(), Some(session));
        reopened.clear();

        let reopened = TokenStore::new(FileStore::new(&path));
        assert!(reopened.get().is_none());
        Ok(())
    }

    #[test]
    fn file_store_corrupt_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2")?;

        let store = FileStore::new(&path);
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());

        store.set(ACCESS_TOKEN_KEY, "token-1".to_string());
        assert_eq!(store.get(ACCESS_TOKEN_KEY).as_deref(), Some("token-1"));
        Ok(())
    }

    #[test]
    fn file_store_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("missing.json"));
        assert!(store.get(ACCESS_TOKEN_KEY).is_none());
        store.remove(ACCESS_TOKEN_KEY);
        assert!(!store.path().exists());
    }
}
