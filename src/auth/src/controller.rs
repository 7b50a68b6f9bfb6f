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

//! The authentication lifecycle, as observed by a user interface.
//!
//! The [AuthController] starts in [AuthStatus::Checking]. [bootstrap] decides,
//! from the stored session, whether the user is signed in. From then on the
//! status moves between [AuthStatus::Guest] and [AuthStatus::Auth] as the user
//! signs in and out, and as sessions expire.
//!
//! The state is published on a [tokio::sync::watch] channel. Interfaces
//! subscribe and render whatever the latest [AuthState] is.
//!
//! [bootstrap]: AuthController::bootstrap

use crate::Result;
use crate::api::{HttpSessionApi, Registration, SessionApi, http_error, json_body};
use crate::config::ClientConfig;
use crate::errors::{AuthErrorKind, Error};
use crate::events::{SessionEvent, SessionEvents};
use crate::gateway::Gateway;
use crate::scheduler::RefreshScheduler;
use crate::session::{Profile, Session};
use crate::store::TokenStore;
use reqwest::Method;
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const MIN_PASSWORD_LEN: usize = 6;

/// Whether the user is signed in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthStatus {
    /// The stored session has not been validated yet.
    #[default]
    Checking,
    Guest,
    Auth,
}

/// The state published by the [AuthController].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthState {
    pub status: AuthStatus,
    /// The signed-in user. Possibly stale while a fetch is in progress.
    pub profile: Option<Profile>,
    /// The email waiting for verification, set after registration or after
    /// a login rejected with `EMAIL_NOT_VERIFIED`.
    pub pending_verification: Option<String>,
}

/// Drives the authentication state machine.
///
/// Cloning the controller is cheap, all clones share the same state.
///
/// # Example
/// ```no_run
/// # use ritmio_auth::config::ClientConfig;
/// # use ritmio_auth::controller::{AuthController, AuthStatus};
/// # use ritmio_auth::store::{FileStore, TokenStore};
/// # async fn sample() -> ritmio_auth::Result<()> {
/// let store = TokenStore::new(FileStore::new("session.json"));
/// let controller = AuthController::new(ClientConfig::default(), store);
/// let _listener = controller.listen();
/// if controller.bootstrap().await == AuthStatus::Guest {
///     controller.login("a@b.com", "secret1").await?;
/// }
/// # Ok(()) }
/// ```
#[derive(Clone, Debug)]
pub struct AuthController {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    config: ClientConfig,
    api: Arc<dyn SessionApi>,
    gateway: Gateway,
    events: SessionEvents,
    state: watch::Sender<AuthState>,
}

#[derive(serde::Serialize)]
struct NameUpdate<'a> {
    name: &'a str,
}

#[derive(serde::Serialize)]
struct EmailUpdate<'a> {
    email: &'a str,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordUpdate<'a> {
    old_password: &'a str,
    new_password: &'a str,
    confirm_password: &'a str,
}

impl AuthController {
    /// Creates a controller talking to the configured endpoint.
    pub fn new(config: ClientConfig, store: TokenStore) -> Self {
        let api = Arc::new(HttpSessionApi::new(config.clone()));
        Self::with_api(config, store, api)
    }

    /// Creates a controller using a custom [SessionApi].
    pub fn with_api(config: ClientConfig, store: TokenStore, api: Arc<dyn SessionApi>) -> Self {
        let events = SessionEvents::new();
        let scheduler =
            RefreshScheduler::new(config.clone(), store.clone(), api.clone(), events.clone());
        let gateway = Gateway::new(config.clone(), store, scheduler);
        let (state, _) = watch::channel(AuthState::default());
        let inner = Inner {
            config,
            api,
            gateway,
            events,
            state,
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The latest state.
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    /// Returns a receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    /// The gateway for authenticated requests, shared with other clients.
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }

    /// Validates the stored session.
    ///
    /// Without a stored token the user is a guest. Otherwise the user is
    /// optimistically signed in with the cached profile, the session is
    /// renewed if its refresh time has passed, and the profile is fetched.
    /// Any failure signs the user out.
    pub async fn bootstrap(&self) -> AuthStatus {
        let store = self.store();
        if store.access_token().is_none() {
            tracing::debug!("no stored session");
            self.update(|s| s.status = AuthStatus::Guest);
            return AuthStatus::Guest;
        }

        let cached = store.profile();
        self.update(|s| {
            s.status = AuthStatus::Auth;
            s.profile = cached;
        });

        let now = self.inner.config.clock().now();
        match store.refresh_after() {
            Some(refresh_after) if refresh_after > now => self.scheduler().schedule(refresh_after),
            _ => {
                tracing::debug!("stored session is due for renewal");
                if self.scheduler().refresh_now().await.is_none() {
                    self.sign_out_locally();
                    return AuthStatus::Guest;
                }
            }
        }

        if let Err(e) = self.fetch_profile().await {
            tracing::warn!("cannot load the profile, signing out: {e}");
            self.sign_out_locally();
            return AuthStatus::Guest;
        }
        AuthStatus::Auth
    }

    /// Signs in with an email and password.
    ///
    /// If the email is not verified yet, the pending verification is set and
    /// the [AuthErrorKind::EmailNotVerified] error is returned. Other
    /// failures leave the state unchanged.
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        let email = email.trim();
        match self.inner.api.login(email, password).await {
            Ok(session) => self.login_success(session).await,
            Err(e) if e.auth_kind() == Some(&AuthErrorKind::EmailNotVerified) => {
                self.verification_required(email);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Starts a session obtained outside [login][Self::login].
    ///
    /// Stores the session, schedules its renewal and loads the profile. If
    /// the profile cannot be loaded the session is discarded.
    pub async fn login_success(&self, session: Session) -> Result<()> {
        self.store().set(&session);
        self.scheduler().schedule(session.refresh_after);
        if let Err(e) = self.fetch_profile().await {
            self.sign_out_locally();
            return Err(e);
        }
        self.update(|s| {
            s.status = AuthStatus::Auth;
            s.pending_verification = None;
        });
        Ok(())
    }

    /// Creates an account. The new account must verify its email.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<()> {
        let registration = Registration {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.inner.api.register(&registration).await?;
        self.verification_required(&registration.email);
        Ok(())
    }

    /// Marks `email` as waiting for verification. The user is a guest.
    pub fn verification_required(&self, email: &str) {
        let email = email.trim().to_string();
        self.update(|s| {
            s.status = AuthStatus::Guest;
            s.profile = None;
            s.pending_verification = Some(email);
        });
    }

    pub async fn resend_verification(&self, email: &str) -> Result<()> {
        self.inner.api.resend_verification(email.trim()).await
    }

    /// Confirms an email with the token from the verification link.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::invalid_input("the verification token is missing"));
        }
        self.inner.api.verify_email(token).await
    }

    /// Forgets the pending verification, going back to the login form.
    pub fn dismiss_verification(&self) {
        self.update(|s| s.pending_verification = None);
    }

    /// Signs out.
    ///
    /// The service is notified on a best-effort basis. The local session is
    /// always discarded.
    pub async fn logout(&self) {
        if let Some(token) = self.store().access_token() {
            if let Err(e) = self.inner.api.logout(&token).await {
                tracing::debug!("ignoring logout failure: {e}");
            }
        }
        self.sign_out_locally();
        self.update(|s| s.pending_verification = None);
    }

    /// Applies a [SessionEvent] to the state.
    pub fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::Refreshed(session) => {
                self.scheduler().schedule(session.refresh_after);
            }
            SessionEvent::Expired => {
                tracing::debug!("session expired");
                self.sign_out_locally();
            }
        }
    }

    /// Spawns a task applying [SessionEvent]s as they are published.
    ///
    /// The task stops once all the clones of this controller are dropped.
    pub fn listen(&self) -> JoinHandle<()> {
        let mut rx = self.inner.events.subscribe();
        let weak = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => match Self::upgrade(&weak) {
                        Some(this) => this.handle_event(event),
                        None => break,
                    },
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "session event listener lagged behind");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    /// Fetches the profile of the signed-in user and caches it.
    pub async fn fetch_profile(&self) -> Result<Profile> {
        let gateway = self.gateway();
        let response = gateway
            .execute(gateway.request(Method::GET, "/users/me"), None)
            .await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        let profile = json_body::<Profile>(response).await?;
        self.store().set_profile(&profile);
        let published = profile.clone();
        self.update(|s| s.profile = Some(published));
        Ok(profile)
    }

    pub async fn update_name(&self, name: &str) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::invalid_input("the name cannot be empty"));
        }
        self.patch_me("/users/me/name", &NameUpdate { name }).await?;
        self.fetch_profile().await
    }

    pub async fn update_email(&self, email: &str) -> Result<Profile> {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::invalid_input("the email cannot be empty"));
        }
        self.patch_me("/users/me/email", &EmailUpdate { email }).await?;
        self.fetch_profile().await
    }

    /// Changes the password.
    ///
    /// All fields are required, the new password must have at least 6
    /// characters, and `confirm_password` must match it.
    pub async fn update_password(
        &self,
        old_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<()> {
        if old_password.is_empty() || new_password.is_empty() || confirm_password.is_empty() {
            return Err(Error::invalid_input("fill in all password fields"));
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_input(format!(
                "the new password must contain at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if new_password != confirm_password {
            return Err(Error::invalid_input(
                "the new password and its confirmation must match",
            ));
        }
        let body = PasswordUpdate {
            old_password,
            new_password,
            confirm_password,
        };
        self.patch_me("/users/me/password", &body).await
    }

    async fn patch_me<B: serde::Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let gateway = self.gateway();
        let response = gateway
            .execute(gateway.request(Method::PATCH, path).json(body), None)
            .await?;
        if !response.status().is_success() {
            return Err(http_error(response).await);
        }
        Ok(())
    }

    fn sign_out_locally(&self) {
        self.scheduler().cancel();
        self.store().clear();
        self.update(|s| {
            s.status = AuthStatus::Guest;
            s.profile = None;
        });
    }

    fn update<F: FnOnce(&mut AuthState)>(&self, f: F) {
        self.inner.state.send_modify(f);
    }

    fn store(&self) -> &TokenStore {
        self.inner.gateway.store()
    }

    fn scheduler(&self) -> &RefreshScheduler {
        self.inner.gateway.scheduler()
    }

    fn upgrade(weak: &Weak<Inner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }
}
