//! Typed endpoints on top of `SessionClient`
//!
//! Each call is a thin `impl SessionClient` method; credentials, refresh and
//! error mapping all happen in the pipeline.

mod auth;
mod documents;

pub use auth::DashboardResponse;
pub use documents::{
    BatchUploadResponse, DocumentChunk, DocumentChunksResponse, DocumentListResponse,
    DocumentMetadata, DocumentResponse, DocumentStatus, DocumentType, HealthCheckResponse,
    UploadError, UploadFile, UploadOptions,
};
