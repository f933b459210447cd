//! Scripted transport and recording sink shared by the unit tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use session_auth::{LOGIN_PATH, REFRESH_PATH, REGISTER_PATH};
use tokio::sync::Notify;

use crate::notify::{NoticeKind, NotificationSink};
use crate::transport::{ApiRequest, ApiResponse, Transport, TransportOutcome};

/// How the fake answers the refresh exchange.
pub(crate) enum RefreshScript {
    Rotate {
        access: &'static str,
        refresh: Option<&'static str>,
    },
    Status(u16),
    Network,
    Garbage,
}

#[derive(Debug, Clone)]
pub(crate) struct Sent {
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<String>,
}

/// In-process backend.
///
/// - refresh path: answers per `RefreshScript`; a rotation makes the new
///   access credential the only accepted bearer
/// - login/register: always 401 with a `detail`
/// - `/network`: no response
/// - `/status/<code>`: that status with an empty body
/// - anything else: 200 echoing path and bearer when the bearer is accepted,
///   401 otherwise
pub(crate) struct FakeTransport {
    accepted: Mutex<Option<String>>,
    reject_all: AtomicBool,
    script: RefreshScript,
    gate: Option<Arc<Notify>>,
    refresh_calls: AtomicUsize,
    log: Mutex<Vec<Sent>>,
}

impl FakeTransport {
    pub fn new(script: RefreshScript) -> Self {
        Self {
            accepted: Mutex::new(None),
            reject_all: AtomicBool::new(false),
            script,
            gate: None,
            refresh_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Accept `bearer` on protected paths from the start.
    pub fn accepting(self, bearer: &str) -> Self {
        *self.accepted.lock() = Some(bearer.to_owned());
        self
    }

    /// Hold every refresh exchange until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Reject every bearer on protected paths, even freshly rotated ones.
    pub fn rejecting_everything(self) -> Self {
        self.reject_all.store(true, Ordering::SeqCst);
        self
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn sent_to(&self, path: &str) -> Vec<Sent> {
        self.log
            .lock()
            .iter()
            .filter(|s| s.path == path)
            .cloned()
            .collect()
    }

    fn ok(body: serde_json::Value) -> TransportOutcome {
        TransportOutcome::Success(ApiResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from(body.to_string()),
        })
    }

    fn refresh_outcome(&self) -> TransportOutcome {
        match &self.script {
            RefreshScript::Rotate { access, refresh } => {
                *self.accepted.lock() = Some((*access).to_owned());
                let mut body = serde_json::json!({ "access_token": access, "expires_in": 3600 });
                if let Some(refresh) = refresh {
                    body["refresh_token"] = serde_json::json!(refresh);
                }
                Self::ok(body)
            }
            RefreshScript::Status(status) => TransportOutcome::HttpFailure {
                status: *status,
                body: r#"{"detail":"Invalid refresh token"}"#.into(),
            },
            RefreshScript::Network => TransportOutcome::NetworkFailure("connection reset".into()),
            RefreshScript::Garbage => Self::ok(serde_json::json!({ "token": "nope" })),
        }
    }

    fn protected_outcome(&self, path: &str, bearer: Option<&str>) -> TransportOutcome {
        let accepted = self.accepted.lock().clone();
        if !self.reject_all.load(Ordering::SeqCst) && bearer.is_some() && bearer == accepted.as_deref() {
            Self::ok(serde_json::json!({ "path": path, "bearer": bearer }))
        } else {
            TransportOutcome::HttpFailure {
                status: 401,
                body: r#"{"detail":"Token expired"}"#.into(),
            }
        }
    }
}

impl Transport for FakeTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportOutcome> + Send + 'a>> {
        Box::pin(async move {
            let bearer = request.bearer().map(str::to_owned);
            self.log.lock().push(Sent {
                path: request.path.clone(),
                bearer: bearer.clone(),
                body: request
                    .body
                    .as_ref()
                    .map(|b| String::from_utf8_lossy(b).into_owned()),
            });

            let path = request.path.as_str();
            if path == REFRESH_PATH {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                if let Some(gate) = &self.gate {
                    gate.notified().await;
                }
                return self.refresh_outcome();
            }
            if path == LOGIN_PATH || path == REGISTER_PATH {
                return TransportOutcome::HttpFailure {
                    status: 401,
                    body: r#"{"detail":"Invalid credentials"}"#.into(),
                };
            }
            if path == "/network" {
                return TransportOutcome::NetworkFailure("connection refused".into());
            }
            if let Some(code) = path.strip_prefix("/status/") {
                return TransportOutcome::HttpFailure {
                    status: code.parse().unwrap_or(500),
                    body: String::new(),
                };
            }
            self.protected_outcome(path, bearer.as_deref())
        })
    }
}

/// Keeps every error notice for assertions.
#[derive(Default)]
pub(crate) struct RecordingSink {
    notices: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, kind: NoticeKind, message: &str) {
        if kind == NoticeKind::Error {
            self.notices.lock().push(message.to_owned());
        }
    }
}
