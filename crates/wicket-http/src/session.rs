//! Session state machine.
//!
//! [`SessionManager`] owns the user's identity and publishes a
//! [`SessionState`] that external code can read or watch:
//!
//! ```text
//!   Initializing --> Authenticated <--> Unauthenticated
//!        \______________________________^
//! ```
//!
//! Login, registration, logout, and refresh failure are the only
//! transitions. An in-flight login or logout raises the `busy` flag but
//! leaves the committed status alone until it settles.
//!
//! Every committed transition bumps an epoch. Background work (startup
//! revalidation, profile refresh) records the epoch it started under and
//! discards its result if a transition happened in the meantime, so a slow
//! response can never resurrect a session the user has logged out of.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use wicket_core::error::{AuthError, Error};
use wicket_core::{
    CachedProfile, CredentialPair, LoginCredentials, Profile, Registration, Result, SessionStore,
};

use crate::api::ApiClient;
use crate::config::ClientConfig;
use crate::dispatch::RequestDescriptor;
use crate::http::{AuthResponse, ProfileResponse, RefreshTokenRequest, ensure_success};
use crate::refresh::SessionEvent;

/// Committed authentication status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// The state surface exposed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub status: SessionStatus,
    pub user: Option<Profile>,
    /// A login, registration, or logout is in flight.
    pub busy: bool,
    /// Human-readable message from the last failed operation.
    pub error: Option<String>,
}

impl SessionState {
    fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            user: None,
            busy: false,
            error: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }
}

/// Drives login, logout, and profile state on top of an [`ApiClient`].
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: ApiClient,
    state: watch::Sender<SessionState>,
    epoch: AtomicU64,
}

impl SessionInner {
    fn store(&self) -> &SessionStore {
        self.client.store()
    }

    /// Apply a transition and return the new epoch.
    fn commit(&self, update: impl FnOnce(&mut SessionState)) -> u64 {
        let mut epoch = 0;
        self.state.send_modify(|state| {
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            update(state);
        });
        epoch
    }

    /// Apply a transition only if no other transition happened since `epoch`.
    fn commit_if_current(&self, epoch: u64, update: impl FnOnce(&mut SessionState)) -> bool {
        self.state.send_if_modified(|state| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            update(state);
            true
        })
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    fn set_busy(&self) {
        self.state.send_modify(|state| {
            state.busy = true;
            state.error = None;
        });
    }

    fn set_failed(&self, error: &Error) {
        self.state.send_modify(|state| {
            state.busy = false;
            state.error = Some(error.user_message());
        });
    }

    /// React to a failed token refresh anywhere in the client.
    fn expire(&self, reason: &str) {
        self.store().profile().clear();
        let changed = self.state.send_if_modified(|state| {
            if state.status == SessionStatus::Unauthenticated && state.user.is_none() {
                return false;
            }
            self.epoch.fetch_add(1, Ordering::SeqCst);
            state.status = SessionStatus::Unauthenticated;
            state.user = None;
            state.error = Some("your session has expired, please log in again".to_string());
            true
        });
        if changed {
            info!(reason, "Session expired");
        }
    }
}

impl SessionManager {
    /// Wrap a client. Must be called from within a Tokio runtime; a
    /// background task listens for session expiry.
    pub fn new(client: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::initializing());
        let inner = Arc::new(SessionInner {
            client,
            state,
            epoch: AtomicU64::new(0),
        });
        spawn_expiry_listener(&inner);
        Self { inner }
    }

    /// Build the HTTP client and wrap it.
    pub fn connect(config: ClientConfig, store: SessionStore) -> Result<Self> {
        Ok(Self::new(ApiClient::new(config, store)?))
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Restore the session from persisted state.
    ///
    /// With both credentials stored, the cached profile is published as
    /// `Authenticated` before this returns, and the profile is revalidated
    /// in the background. Without a refresh token the session is
    /// `Unauthenticated` immediately and `None` is returned. With only a
    /// refresh token, the status stays `Initializing` until the background
    /// fetch (which refreshes) settles.
    ///
    /// The returned handle completes when revalidation has been applied.
    #[instrument(skip(self))]
    pub fn initialize(&self) -> Option<JoinHandle<()>> {
        let store = self.inner.store();
        let CredentialPair { access, refresh } = store.credentials().get();

        if refresh.is_none() {
            info!("No refresh token stored, starting unauthenticated");
            self.inner.commit(|state| {
                state.status = SessionStatus::Unauthenticated;
                state.user = None;
            });
            return None;
        }

        let cached = if access.is_some() {
            store.profile().load()
        } else {
            None
        };

        let epoch = if access.is_some() {
            let user = cached.as_ref().map(|c| c.profile.clone());
            debug!(cached = user.is_some(), "Restoring session optimistically");
            self.inner.commit(|state| {
                state.status = SessionStatus::Authenticated;
                state.user = user;
            })
        } else {
            debug!("Access token missing, waiting for revalidation");
            self.inner.commit(|state| state.status = SessionStatus::Initializing)
        };

        let manager = self.clone();
        Some(tokio::spawn(async move {
            manager.revalidate(epoch, cached).await;
        }))
    }

    async fn revalidate(&self, epoch: u64, cached: Option<CachedProfile>) {
        let store = self.inner.store().clone();

        match self.fetch_profile().await {
            Ok(profile) => {
                let applied = self.inner.commit_if_current(epoch, |state| {
                    store.profile().save(&profile);
                    state.status = SessionStatus::Authenticated;
                    state.user = Some(profile);
                });
                if applied {
                    debug!("Session revalidated");
                } else {
                    debug!("Session changed during revalidation, discarding profile");
                }
            }
            Err(e) => {
                let max_staleness = self.inner.client.config().profile_max_staleness;
                let keep_stale = match &cached {
                    Some(cached) if !e.is_session_expired() => {
                        // A timestamp from the future counts as fresh.
                        cached
                            .age()
                            .to_std()
                            .map_or(true, |age| age <= max_staleness)
                    }
                    _ => false,
                };

                if keep_stale {
                    warn!(error = %e, "Profile revalidation failed, keeping cached profile");
                    return;
                }

                warn!(error = %e, "Profile revalidation failed, signing out");
                self.inner.commit_if_current(epoch, |state| {
                    store.clear();
                    state.status = SessionStatus::Unauthenticated;
                    state.user = None;
                });
            }
        }
    }

    /// Log in with email and password.
    ///
    /// On failure the committed state is unchanged, `state().error` holds a
    /// readable message, and the error is returned.
    #[instrument(skip(self, credentials), fields(email = %credentials.email()))]
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Profile> {
        let path = self.inner.client.config().endpoints.login.clone();
        self.authenticate(&path, &credentials).await
    }

    /// Create an account and log in to it.
    #[instrument(skip(self, registration), fields(email = %registration.email()))]
    pub async fn register(&self, registration: Registration) -> Result<Profile> {
        let path = self.inner.client.config().endpoints.register.clone();
        self.authenticate(&path, &registration).await
    }

    async fn authenticate<B: Serialize>(&self, path: &str, body: &B) -> Result<Profile> {
        self.inner.set_busy();

        match self.exchange_credentials(path, body).await {
            Ok(profile) => {
                let user = profile.clone();
                self.inner.commit(|state| {
                    state.status = SessionStatus::Authenticated;
                    state.user = Some(user);
                    state.busy = false;
                    state.error = None;
                });
                info!(user_id = profile.id, "Logged in");
                Ok(profile)
            }
            Err(e) => {
                warn!(error = %e, "Authentication failed");
                self.inner.set_failed(&e);
                Err(e)
            }
        }
    }

    async fn exchange_credentials<B: Serialize>(&self, path: &str, body: &B) -> Result<Profile> {
        let store = self.inner.store();
        let request = RequestDescriptor::post(path).json(body)?.credential_exempt();
        let response = self.inner.client.send(request).await?;

        let auth: AuthResponse = response.json()?;
        ensure_success(response.status, auth.success, &auth.message, &auth.code)?;
        let tokens = auth.tokens.ok_or_else(|| Error::Decode {
            message: "authentication response did not contain tokens".to_string(),
        })?;

        // The profile fetch must carry the new bearer; the previous pair comes
        // back if no profile can be settled.
        let previous = store.credentials().get();
        store
            .credentials()
            .set_pair(&CredentialPair::new(tokens.access, tokens.refresh));

        let profile = match self.fetch_profile().await {
            Ok(profile) => profile,
            Err(e) => match auth.user {
                Some(user) => {
                    debug!(error = %e, "Profile fetch failed, using embedded user");
                    user
                }
                None => {
                    store.credentials().replace(&previous);
                    return Err(e);
                }
            },
        };

        store.profile().save(&profile);
        Ok(profile)
    }

    /// Log out. Always ends `Unauthenticated` with local state cleared,
    /// whether or not the server acknowledged the logout.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.inner.set_busy();
        let store = self.inner.store();

        if let Some(refresh_token) = store.credentials().refresh_token() {
            let path = self.inner.client.config().endpoints.logout.clone();
            let result = match RequestDescriptor::post(path).json(&RefreshTokenRequest {
                refresh_token: refresh_token.as_str(),
            }) {
                Ok(request) => self.inner.client.send(request).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                warn!(error = %e, "Server-side logout failed, clearing local session anyway");
            }
        }

        store.clear();
        self.inner.commit(|state| {
            state.status = SessionStatus::Unauthenticated;
            state.user = None;
            state.busy = false;
            state.error = None;
        });
        info!("Logged out");
    }

    /// Fetch the profile again and publish it.
    ///
    /// Requires an authenticated session. If the session turns out to be
    /// expired, the session is logged out and the error returned.
    #[instrument(skip(self))]
    pub async fn refresh_profile(&self) -> Result<Profile> {
        if !self.is_authenticated() {
            return Err(AuthError::NotAuthenticated.into());
        }
        let epoch = self.inner.current_epoch();

        match self.fetch_profile().await {
            Ok(profile) => {
                let store = self.inner.store().clone();
                let user = profile.clone();
                self.inner.commit_if_current(epoch, |state| {
                    store.profile().save(&user);
                    state.user = Some(user);
                });
                Ok(profile)
            }
            Err(e) if e.is_session_expired() => {
                self.logout().await;
                self.inner.state.send_modify(|state| {
                    state.error = Some(e.user_message());
                });
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_profile(&self) -> Result<Profile> {
        let path = self.inner.client.config().endpoints.profile.clone();
        let response = self.inner.client.send(RequestDescriptor::get(path)).await?;

        let body: ProfileResponse = response.json()?;
        ensure_success(response.status, body.success, &body.message, &body.code)?;
        body.user.ok_or_else(|| Error::Decode {
            message: "profile response did not contain a user".to_string(),
        })
    }
}

fn spawn_expiry_listener(inner: &Arc<SessionInner>) {
    let mut events = inner.client.subscribe();
    let weak: Weak<SessionInner> = Arc::downgrade(inner);

    tokio::spawn(async move {
        loop {
            let event = events.recv().await;
            let Some(inner) = weak.upgrade() else {
                break;
            };

            match event {
                Ok(SessionEvent::Expired { reason }) => inner.expire(&reason),
                Ok(SessionEvent::Refreshed) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed session events");
                    if inner.store().credentials().get().access.is_none() {
                        inner.expire("credentials cleared while events were missed");
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.inner.state.borrow())
            .field("client", &self.inner.client)
            .finish()
    }
}
