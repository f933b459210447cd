//! Authenticated request pipeline
//!
//! Every call goes through two stages around the transport:
//!
//! 1. Outbound: attach `Authorization: Bearer <access>` when the store holds a
//!    pair. Never blocks, never fails.
//! 2. Inbound: classify the outcome. A 401 on an ordinary request that has not
//!    been resent yet hands off to the `RefreshCoordinator` and, once a fresh
//!    credential is available, resends the original request exactly once.
//!    Everything else is terminal and produces one user notification.
//!
//! A 401 from login, register or the refresh exchange is a wrong password or
//! a dead session, never an expired access credential, so those paths are
//! exempt from refresh.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use serde::de::DeserializeOwned;
use session_auth::{CredentialStore, LOGIN_PATH, NETWORK_ERROR_MESSAGE, REFRESH_PATH, REGISTER_PATH};
use tokio::sync::broadcast;
use tracing::{Instrument, debug, info_span, warn};

use crate::coordinator::RefreshCoordinator;
use crate::error::{ClientError, Result};
use crate::messages;
use crate::metrics;
use crate::notify::{NoticeKind, NotificationSink, SessionEvent, TracingSink};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportOutcome};

/// Auth endpoint paths, relative to the transport base URL.
#[derive(Debug, Clone)]
pub struct AuthPaths {
    pub login: String,
    pub register: String,
    pub refresh: String,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            login: LOGIN_PATH.to_owned(),
            register: REGISTER_PATH.to_owned(),
            refresh: REFRESH_PATH.to_owned(),
        }
    }
}

impl AuthPaths {
    /// Whether `path` is one of the auth exchanges (query string ignored).
    pub fn is_auth_exchange(&self, path: &str) -> bool {
        let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
        [&self.login, &self.register, &self.refresh]
            .iter()
            .any(|exempt| exempt.trim_end_matches('/') == path)
    }
}

/// HTTP client that keeps a session authenticated across access expiry.
///
/// Cheap to share behind an `Arc`; all mutable state lives in the credential
/// store and the coordinator.
pub struct SessionClient {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn NotificationSink>,
    coordinator: Arc<RefreshCoordinator>,
    paths: AuthPaths,
}

impl SessionClient {
    pub fn builder(
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> SessionClientBuilder {
        SessionClientBuilder {
            transport,
            store,
            notifier: Arc::new(TracingSink),
            paths: AuthPaths::default(),
            refresh_wait_timeout: None,
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn paths(&self) -> &AuthPaths {
        &self.paths
    }

    /// Session lifecycle signals; `Expired` means "go to the login entry point".
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.coordinator.subscribe()
    }

    /// Send a request through both stages.
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let span = info_span!(
            "session_request",
            request_id = %uuid::Uuid::new_v4(),
            method = %request.method,
            path = %request.path,
        );
        self.execute_inner(request).instrument(span).await
    }

    /// Send a request and decode its JSON body.
    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    async fn execute_inner(&self, mut request: ApiRequest) -> Result<ApiResponse> {
        self.attach_credential(&mut request);
        let sent_epoch = self.coordinator.epoch();
        let outcome = self.transport.send(&request).await;

        match outcome {
            TransportOutcome::HttpFailure { status: 401, .. } if self.may_refresh(&request) => {
                request.mark_retried();
                let stale: Option<Secret<String>> = request.bearer().map(Secret::from);
                debug!("access credential rejected, waiting for a fresh one");

                let access = match self
                    .coordinator
                    .ensure_fresh_credential_since(stale.as_ref().map(|s| s.as_str()), sent_epoch)
                    .await
                {
                    Ok(access) => access,
                    Err(e) => return Err(self.coordinator_failure(e)),
                };

                request.set_bearer(access.as_str());
                debug!("resending with refreshed credential");
                let outcome = self.transport.send(&request).await;
                self.finish(outcome)
            }
            other => self.finish(other),
        }
    }

    /// Outbound stage.
    fn attach_credential(&self, request: &mut ApiRequest) {
        if let Some(pair) = self.store.get() {
            if !pair.access.is_empty() {
                request.set_bearer(pair.access.as_str());
            }
        }
    }

    fn may_refresh(&self, request: &ApiRequest) -> bool {
        !request.is_retried() && !self.paths.is_auth_exchange(&request.path)
    }

    /// Terminal classification of an outcome that will not be retried.
    fn finish(&self, outcome: TransportOutcome) -> Result<ApiResponse> {
        match outcome {
            TransportOutcome::Success(response) => {
                metrics::record_request("success");
                Ok(response)
            }
            TransportOutcome::HttpFailure { status, body } => {
                let message = messages::user_message(status, &body);
                warn!(status, "request failed");
                self.notifier.notify(NoticeKind::Error, &message);
                metrics::record_request("http_error");
                if status == 401 {
                    Err(ClientError::Unauthorized { message })
                } else {
                    Err(ClientError::Http {
                        status,
                        message,
                        body,
                    })
                }
            }
            TransportOutcome::NetworkFailure(cause) => {
                warn!(error = %cause, "request failed without a response");
                self.notifier.notify(NoticeKind::Error, NETWORK_ERROR_MESSAGE);
                metrics::record_request("network_error");
                Err(ClientError::Network(cause))
            }
        }
    }

    /// `SessionExpired` was announced by the coordinator, once per failure
    /// event; only a timeout is news to the user.
    fn coordinator_failure(&self, err: ClientError) -> ClientError {
        match &err {
            ClientError::RefreshTimeout => {
                self.notifier.notify(NoticeKind::Error, &err.user_message());
                metrics::record_request("refresh_timeout");
            }
            _ => metrics::record_request("session_expired"),
        }
        err
    }
}

/// Builder for `SessionClient`.
pub struct SessionClientBuilder {
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn NotificationSink>,
    paths: AuthPaths,
    refresh_wait_timeout: Option<Duration>,
}

impl SessionClientBuilder {
    /// Where user-facing messages go (default: the log).
    pub fn notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn paths(mut self, paths: AuthPaths) -> Self {
        self.paths = paths;
        self
    }

    /// Optional bound on how long a request waits for an in-flight refresh.
    pub fn refresh_wait_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.refresh_wait_timeout = timeout;
        self
    }

    pub fn build(self) -> SessionClient {
        let coordinator = RefreshCoordinator::new(
            self.store.clone(),
            self.transport.clone(),
            self.notifier.clone(),
            self.paths.refresh.clone(),
        )
        .with_wait_timeout(self.refresh_wait_timeout);

        SessionClient {
            transport: self.transport,
            store: self.store,
            notifier: self.notifier,
            coordinator: Arc::new(coordinator),
            paths: self.paths,
        }
    }
}
