//! Single-flight access token refresh.
//!
//! [`RefreshCoordinator::dispatch_with_refresh`] sends a request and, when
//! the backend answers 401, recovers by refreshing the access token. At
//! most one refresh call is in flight at a time: a request that hits 401
//! while a refresh is running is parked as a waiter and replayed once the
//! refresh settles.
//!
//! State machine:
//!
//! ```text
//!   Idle --first 401--> Refreshing { waiters } --refresh settles--> Idle
//! ```
//!
//! The `Idle -> Refreshing` transition and the decision to enqueue happen
//! under one lock, so two requests can never both start a refresh. The
//! lock is never held across network I/O.
//!
//! The refresh itself runs on a spawned task. The request that triggered
//! it waits on a continuation like every other waiter, so dropping that
//! request (for example under an outer timeout) cannot strand the queue.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, oneshot};
use tracing::{debug, info, instrument, warn};

use wicket_core::error::{AuthError, Error};
use wicket_core::{AccessToken, RefreshToken, Result};

use crate::dispatch::{ApiResponse, Dispatcher, RequestDescriptor};
use crate::http::{RefreshTokenRequest, RefreshTokenResponse, ensure_success};

/// Capacity of the session event channel.
const EVENT_CAPACITY: usize = 16;

/// Notifications published by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A refresh succeeded and a new access token is stored.
    Refreshed,
    /// A refresh failed. Stored credentials have been cleared and the
    /// session must be treated as logged out.
    Expired { reason: String },
}

type Reply = oneshot::Sender<Result<ApiResponse>>;

/// A request parked until the in-flight refresh settles.
struct Waiter {
    request: RequestDescriptor,
    reply: Reply,
}

enum RefreshState {
    Idle,
    Refreshing {
        /// The request that started the refresh. Replayed last.
        leader: Option<Waiter>,
        /// Requests that hit 401 during the refresh, in arrival order.
        waiters: VecDeque<Waiter>,
    },
}

/// How a refresh settled.
#[derive(Debug)]
enum Outcome {
    Refreshed,
    /// The credentials were cleared or replaced while the refresh was in
    /// flight; its result was dropped.
    Superseded,
    Failed(Error),
}

/// What a 401'd request does next, decided under the state lock.
enum Next {
    Wait(oneshot::Receiver<Result<ApiResponse>>),
    Replay(RequestDescriptor),
}

/// Coordinates token refresh across all requests sharing a credential store.
///
/// Cheap to clone; clones share the same refresh state.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    dispatcher: Dispatcher,
    state: Mutex<RefreshState>,
    events: broadcast::Sender<SessionEvent>,
}

impl RefreshCoordinator {
    pub fn new(dispatcher: Dispatcher) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(CoordinatorInner {
                dispatcher,
                state: Mutex::new(RefreshState::Idle),
                events,
            }),
        }
    }

    /// Subscribe to refresh outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Send a request, recovering from an expired access token.
    ///
    /// A request is retried at most once. A request rejected with 401 again
    /// after a successful refresh fails with that 401. If the refresh fails,
    /// every request waiting on it fails with the same
    /// [`AuthError::SessionExpired`].
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn dispatch_with_refresh(
        &self,
        mut request: RequestDescriptor,
    ) -> Result<ApiResponse> {
        let dispatcher = &self.inner.dispatcher;
        let result = dispatcher.send(&mut request).await;

        match result {
            Err(ref e)
                if e.is_unauthorized() && !dispatcher.is_exempt(&request) && !request.is_retried() => {}
            other => return other,
        }

        request.mark_retried();
        debug!("Access token rejected");

        match self.enqueue(request).await {
            Next::Replay(mut request) => {
                debug!("Token changed while request was in flight, replaying");
                dispatcher.send(&mut request).await
            }
            Next::Wait(rx) => rx.await.unwrap_or_else(|_| {
                Err(AuthError::SessionExpired {
                    reason: "token refresh was aborted".to_string(),
                }
                .into())
            }),
        }
    }

    /// Decide, atomically, whether to join the in-flight refresh, start one,
    /// or replay immediately because a refresh already completed.
    async fn enqueue(&self, request: RequestDescriptor) -> Next {
        let mut state = self.inner.state.lock().await;
        let (reply, rx) = oneshot::channel();

        match &mut *state {
            RefreshState::Refreshing { waiters, .. } => {
                waiters.push_back(Waiter { request, reply });
                debug!(queued = waiters.len(), "Joined in-flight refresh");
                Next::Wait(rx)
            }
            RefreshState::Idle => {
                let current = self.inner.dispatcher.credentials().access_token();
                if current.is_some() && current.as_ref() != request.sent_with() {
                    return Next::Replay(request);
                }

                *state = RefreshState::Refreshing {
                    leader: Some(Waiter { request, reply }),
                    waiters: VecDeque::new(),
                };
                drop(state);

                let coordinator = self.clone();
                tokio::spawn(async move { coordinator.run_refresh().await });
                Next::Wait(rx)
            }
        }
    }

    /// Refresh, return to `Idle`, then settle every waiter in FIFO order
    /// followed by the request that started the refresh.
    async fn run_refresh(&self) {
        let outcome = self.refresh().await;

        let (leader, waiters) = {
            let mut state = self.inner.state.lock().await;
            match std::mem::replace(&mut *state, RefreshState::Idle) {
                RefreshState::Refreshing { leader, waiters } => (leader, waiters),
                RefreshState::Idle => (None, VecDeque::new()),
            }
        };

        let queued = waiters.into_iter().chain(leader);

        match outcome {
            Outcome::Failed(e) => {
                warn!(error = %e, "Token refresh failed, session expired");
                let expired = Error::Auth(AuthError::SessionExpired {
                    reason: e.to_string(),
                });
                for waiter in queued {
                    let _ = waiter.reply.send(Err(expired.clone()));
                }
                let _ = self.inner.events.send(SessionEvent::Expired {
                    reason: e.to_string(),
                });
            }
            settled => {
                if matches!(settled, Outcome::Refreshed) {
                    info!("Access token refreshed");
                    let _ = self.inner.events.send(SessionEvent::Refreshed);
                }
                for Waiter { mut request, reply } in queued {
                    if reply.is_closed() {
                        continue;
                    }
                    let result = self.inner.dispatcher.send(&mut request).await;
                    let _ = reply.send(result);
                }
            }
        }
    }

    /// Call the refresh endpoint and store the result.
    ///
    /// Both the write on success and the clear on failure are conditional
    /// on the stored refresh token still being the one that was sent. If a
    /// logout or login replaced the credentials meanwhile, the result is
    /// discarded and waiters are replayed with whatever is stored now.
    async fn refresh(&self) -> Outcome {
        let credentials = self.inner.dispatcher.credentials();
        let sent = credentials.refresh_token();

        let result = match &sent {
            Some(refresh_token) => self.request_new_token(refresh_token).await,
            None => Err(AuthError::MissingRefreshToken.into()),
        };

        match result {
            Ok((access, rotated)) => {
                if credentials.set_if_refresh_is(sent.as_ref(), &access, rotated.as_ref()) {
                    Outcome::Refreshed
                } else {
                    debug!("Credentials changed during refresh, discarding new token");
                    Outcome::Superseded
                }
            }
            Err(e) => {
                if credentials.clear_if_refresh_is(sent.as_ref()) {
                    Outcome::Failed(e)
                } else {
                    debug!(error = %e, "Credentials changed during failed refresh");
                    Outcome::Superseded
                }
            }
        }
    }

    async fn request_new_token(
        &self,
        refresh_token: &RefreshToken,
    ) -> Result<(AccessToken, Option<RefreshToken>)> {
        let dispatcher = &self.inner.dispatcher;

        let mut request = RequestDescriptor::post(dispatcher.endpoints().refresh.clone())
            .json(&RefreshTokenRequest {
                refresh_token: refresh_token.as_str(),
            })?
            .credential_exempt();

        let response = dispatcher.send(&mut request).await?;
        let body: RefreshTokenResponse = response.json()?;
        ensure_success(response.status, body.success, &body.message, &body.code)?;

        let access = body.access_token.filter(|t| !t.is_empty()).ok_or_else(|| {
            Error::Decode {
                message: "refresh response did not contain an access token".to_string(),
            }
        })?;

        Ok((
            AccessToken::new(access),
            body.refresh_token.filter(|t| !t.is_empty()).map(RefreshToken::new),
        ))
    }

    /// Number of requests parked on the in-flight refresh, if any.
    #[cfg(test)]
    pub(crate) async fn queued(&self) -> Option<usize> {
        match &*self.inner.state.lock().await {
            RefreshState::Idle => None,
            RefreshState::Refreshing { waiters, .. } => Some(waiters.len()),
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}
