//! Authenticated HTTP client for a session-based API
//!
//! Wraps a `Transport` with a request pipeline that attaches the session's
//! access credential to every call and recovers transparently when it
//! expires. Concurrent expiries share one refresh exchange; every request
//! that waited on it is resent exactly once or rejected with
//! `ClientError::SessionExpired`.
//!
//! Request lifecycle:
//! 1. `SessionClient::execute()` attaches `Authorization: Bearer <access>`
//! 2. Transport returns 401 → `RefreshCoordinator` starts or joins the exchange
//! 3. Exchange succeeds → new pair stored, request resent with the new bearer
//! 4. Exchange fails → store cleared, one "session expired" notice, every
//!    waiting request rejected, `SessionEvent::Expired` broadcast
//! 5. Any other failure → mapped to a user message and returned

pub mod api;
pub mod coordinator;
pub mod error;
pub mod messages;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod transport;

#[cfg(test)]
mod testing;

pub use api::{
    BatchUploadResponse, DashboardResponse, DocumentChunk, DocumentChunksResponse,
    DocumentListResponse, DocumentMetadata, DocumentResponse, DocumentStatus, DocumentType,
    HealthCheckResponse, UploadError, UploadFile, UploadOptions,
};
pub use coordinator::RefreshCoordinator;
pub use error::{ClientError, Result};
pub use notify::{ChannelSink, Notice, NoticeKind, NotificationSink, SessionEvent, TracingSink};
pub use pipeline::{AuthPaths, SessionClient, SessionClientBuilder};
pub use transport::{
    ApiRequest, ApiResponse, FormPart, HttpTransport, Transport, TransportOutcome,
};
