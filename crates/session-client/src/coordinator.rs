//! Single-flight refresh of the session's access credential
//!
//! State machine:
//! - Idle → Refreshing (first expired request, refresh credential present)
//! - Refreshing → Idle (exchange succeeded: new pair stored, waiters resolved)
//! - Refreshing → Idle (exchange failed: store cleared, waiters rejected)
//!
//! Every request that sees an expiry while a refresh is in flight queues a
//! one-shot continuation instead of starting a second exchange. The state
//! check and the enqueue happen in one critical section with no `.await`, so
//! at most one exchange runs at a time no matter how many requests fail
//! together.
//!
//! The exchange runs on its own task. The queue therefore always drains even
//! if the request that started the cycle is dropped.
//!
//! Every declared expiry bumps an epoch counter. A request records the epoch
//! before it is sent; if an expiry was declared while it was in flight, its
//! 401 belongs to that failure event and is rejected without another notice.
//! A request sent after the declaration is a new event and is announced.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use parking_lot::Mutex;
use session_auth::{
    CredentialPair, CredentialStore, RefreshRequest, RefreshResponse, SESSION_EXPIRED_MESSAGE,
};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::metrics;
use crate::notify::{NoticeKind, NotificationSink, SessionEvent};
use crate::transport::{ApiRequest, Transport, TransportOutcome};

type Waiter = oneshot::Sender<Result<Secret<String>>>;

enum RefreshState {
    Idle,
    /// The queue lives inside the state, so leaving `Refreshing` always drains it.
    Refreshing { waiters: Vec<Waiter> },
}

struct Inner {
    state: RefreshState,
    /// Number of expiries declared so far.
    epoch: u64,
}

/// What a caller gets from the single critical section.
enum Ticket {
    /// Credential was already rotated past the one the request used.
    Fresh(Secret<String>),
    Wait(oneshot::Receiver<Result<Secret<String>>>),
    Expired,
}

/// Owns the refresh state machine and the pending-request queue.
pub struct RefreshCoordinator {
    inner: Mutex<Inner>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn NotificationSink>,
    events: broadcast::Sender<SessionEvent>,
    refresh_path: String,
    wait_timeout: Option<Duration>,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        notifier: Arc<dyn NotificationSink>,
        refresh_path: impl Into<String>,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Mutex::new(Inner {
                state: RefreshState::Idle,
                epoch: 0,
            }),
            store,
            transport,
            notifier,
            events,
            refresh_path: refresh_path.into(),
            wait_timeout: None,
        }
    }

    /// Bound how long a queued request waits for the exchange. The cycle
    /// itself is unaffected; only the impatient caller gives up.
    pub fn with_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Subscribe to `Refreshed` / `Expired` signals.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(self.inner.lock().state, RefreshState::Refreshing { .. })
    }

    /// Requests currently waiting on the in-flight exchange.
    pub fn queued(&self) -> usize {
        match &self.inner.lock().state {
            RefreshState::Refreshing { waiters } => waiters.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Expiry epoch; read it before sending and hand it to
    /// `ensure_fresh_credential_since` when the response is a 401.
    pub fn epoch(&self) -> u64 {
        self.inner.lock().epoch
    }

    /// Return an access credential newer than `stale`, the bearer that was
    /// just rejected.
    ///
    /// Starts the refresh exchange if none is running, otherwise joins the
    /// running one. Fails with `SessionExpired` when no refresh credential
    /// exists or the exchange fails; in both cases the store is cleared and
    /// the user has been notified exactly once for the whole batch.
    pub async fn ensure_fresh_credential(
        self: &Arc<Self>,
        stale: Option<&str>,
    ) -> Result<Secret<String>> {
        let epoch = self.epoch();
        self.ensure_fresh_credential_since(stale, epoch).await
    }

    /// Like `ensure_fresh_credential`, for a request sent at `sent_epoch`.
    pub async fn ensure_fresh_credential_since(
        self: &Arc<Self>,
        stale: Option<&str>,
        sent_epoch: u64,
    ) -> Result<Secret<String>> {
        let rx = match self.ticket(stale, sent_epoch) {
            Ticket::Fresh(access) => return Ok(access),
            Ticket::Expired => return Err(ClientError::SessionExpired),
            Ticket::Wait(rx) => rx,
        };

        let received = match self.wait_timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(received) => received,
                Err(_) => {
                    warn!(timeout = ?limit, "gave up waiting for refresh exchange");
                    return Err(ClientError::RefreshTimeout);
                }
            },
            None => rx.await,
        };

        // Sender dropped without an answer: the exchange task was torn down
        received.unwrap_or(Err(ClientError::SessionExpired))
    }

    /// Force an exchange for the credential currently in the store.
    pub async fn refresh_now(self: &Arc<Self>) -> Result<Secret<String>> {
        let current = self.store.get().map(|pair| pair.access);
        self.ensure_fresh_credential(current.as_ref().map(|a| a.as_str()))
            .await
    }

    fn ticket(self: &Arc<Self>, stale: Option<&str>, sent_epoch: u64) -> Ticket {
        let mut inner = self.inner.lock();

        if let RefreshState::Refreshing { waiters } = &mut inner.state {
            let (tx, rx) = oneshot::channel();
            waiters.push(tx);
            debug!(queued = waiters.len(), "refresh in flight, request queued");
            return Ticket::Wait(rx);
        }

        let current = self.store.get();
        if let Some(pair) = &current {
            if !pair.access.is_empty() && stale != Some(pair.access.as_str()) {
                debug!("access credential already rotated, reusing it");
                return Ticket::Fresh(pair.access.clone());
            }
        }

        let refresh = current
            .as_ref()
            .map(|pair| pair.refresh.clone())
            .filter(|refresh| !refresh.is_empty());

        let Some(refresh) = refresh else {
            let already_reported = inner.epoch != sent_epoch;
            if !already_reported {
                inner.epoch += 1;
            }
            drop(inner);

            if current.is_some() {
                self.clear_store();
            }
            if already_reported {
                debug!("session already expired, rejecting late request");
            } else {
                warn!("no refresh credential available, session expired");
                metrics::record_refresh("missing_credential", 1);
                self.announce_expiry();
            }
            return Ticket::Expired;
        };

        let (tx, rx) = oneshot::channel();
        inner.state = RefreshState::Refreshing { waiters: vec![tx] };
        drop(inner);

        info!("access credential rejected, starting refresh exchange");
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run_exchange(refresh).await });
        Ticket::Wait(rx)
    }

    async fn run_exchange(self: Arc<Self>, refresh: Secret<String>) {
        let mut guard = CycleGuard {
            coordinator: self.as_ref(),
            finished: false,
        };

        match self.exchange(&refresh).await {
            Ok(pair) => {
                let access = pair.access.clone();
                // Store before going idle so late arrivals see the new pair
                if let Err(e) = self.store.set(pair) {
                    warn!(error = %e, "failed to persist refreshed credentials");
                }
                let waiters = self.finish_cycle(false);
                guard.finished = true;

                info!(waiters = waiters.len(), "session refresh succeeded");
                metrics::record_refresh("success", waiters.len());
                let _ = self.events.send(SessionEvent::Refreshed);
                for waiter in waiters {
                    let _ = waiter.send(Ok(access.clone()));
                }
            }
            Err(reason) => {
                warn!(error = %reason, "session refresh failed, clearing credentials");
                self.clear_store();
                let waiters = self.finish_cycle(true);
                guard.finished = true;

                metrics::record_refresh("failure", waiters.len());
                self.announce_expiry();
                for waiter in waiters {
                    let _ = waiter.send(Err(ClientError::SessionExpired));
                }
            }
        }
    }

    /// One refresh exchange, straight on the transport. Going around the
    /// pipeline keeps a 401 from the refresh endpoint from re-entering here.
    async fn exchange(&self, refresh: &Secret<String>) -> std::result::Result<CredentialPair, String> {
        let request = ApiRequest::post(self.refresh_path.as_str())
            .json(&RefreshRequest {
                refresh_token: refresh.as_str(),
            })
            .map_err(|e| e.to_string())?;

        match self.transport.send(&request).await {
            TransportOutcome::Success(response) => {
                let body: RefreshResponse = response
                    .json()
                    .map_err(|e| format!("invalid refresh response: {e}"))?;
                if body.access_token.is_empty() {
                    return Err("refresh response carried an empty access token".into());
                }
                Ok(body.into_pair(refresh.as_str()))
            }
            TransportOutcome::HttpFailure { status, .. } => {
                Err(format!("refresh endpoint returned {status}"))
            }
            TransportOutcome::NetworkFailure(cause) => Err(format!("refresh request failed: {cause}")),
        }
    }

    /// Go idle and hand back the queue in arrival order. A failed cycle
    /// declares an expiry.
    fn finish_cycle(&self, expired: bool) -> Vec<Waiter> {
        let mut inner = self.inner.lock();
        if expired {
            inner.epoch += 1;
        }
        match std::mem::replace(&mut inner.state, RefreshState::Idle) {
            RefreshState::Refreshing { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        }
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear credential store");
        }
    }

    fn announce_expiry(&self) {
        self.notifier.notify(NoticeKind::Error, SESSION_EXPIRED_MESSAGE);
        let _ = self.events.send(SessionEvent::Expired);
    }
}

/// Returns the coordinator to idle if the exchange task unwinds mid-cycle.
/// Dropping the queued senders wakes every waiter with `SessionExpired`.
struct CycleGuard<'a> {
    coordinator: &'a RefreshCoordinator,
    finished: bool,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("refresh exchange aborted, releasing queued requests");
            self.coordinator.inner.lock().state = RefreshState::Idle;
        }
    }
}
