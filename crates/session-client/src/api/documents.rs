//! Document endpoints

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::SessionClient;
use crate::transport::{ApiRequest, FormPart};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Text,
    Md,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub user_id: String,
    pub filename: String,
    pub file_type: DocumentType,
    pub file_size: u64,
    pub chunks_count: u64,
    pub status: DocumentStatus,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentResponse {
    pub id: String,
    pub message: String,
    pub document: DocumentMetadata,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentMetadata>,
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentChunk {
    pub document_id: String,
    pub chunk_index: u64,
    pub content: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentChunksResponse {
    pub document_id: String,
    pub chunks: Vec<DocumentChunk>,
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HealthCheckResponse {
    pub redis_connected: bool,
    pub embedding_model_loaded: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UploadError {
    pub filename: String,
    pub error: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchUploadResponse {
    pub successful: Vec<DocumentResponse>,
    pub failed: Vec<UploadError>,
}

/// Chunking parameters; unset fields use the server defaults (500 / 50).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub chunk_size: Option<u32>,
    pub chunk_overlap: Option<u32>,
}

impl UploadOptions {
    fn form_parts(&self) -> impl Iterator<Item = FormPart> {
        [
            self.chunk_size.map(|v| FormPart::text("chunk_size", v.to_string())),
            self.chunk_overlap
                .map(|v| FormPart::text("chunk_overlap", v.to_string())),
        ]
        .into_iter()
        .flatten()
    }
}

/// A file to upload, already read into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub content: Bytes,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    /// Content type from the extension, for the types the server accepts.
    pub fn content_type(&self) -> Option<&'static str> {
        let (_, ext) = self.filename.rsplit_once('.')?;
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some("application/pdf"),
            "txt" => Some("text/plain"),
            "md" => Some("text/markdown"),
            _ => None,
        }
    }

    fn form_part(&self, field: &str) -> FormPart {
        let part = FormPart::file(field, self.filename.clone(), self.content.clone());
        match self.content_type() {
            Some(mime) => part.with_content_type(mime),
            None => part,
        }
    }
}

impl SessionClient {
    /// Upload one document under the form field `file`.
    pub async fn upload_document(
        &self,
        file: &UploadFile,
        options: UploadOptions,
    ) -> Result<DocumentResponse> {
        let parts = std::iter::once(file.form_part("file"))
            .chain(options.form_parts())
            .collect();
        self.execute_json(ApiRequest::post("/documents/upload").multipart(parts))
            .await
    }

    /// Upload several documents in one request, each under the field `files`.
    ///
    /// Per-file rejections come back in `failed`; the call itself only fails
    /// when the whole request does.
    pub async fn upload_documents(
        &self,
        files: &[UploadFile],
        options: UploadOptions,
    ) -> Result<BatchUploadResponse> {
        let parts = files
            .iter()
            .map(|f| f.form_part("files"))
            .chain(options.form_parts())
            .collect();
        self.execute_json(ApiRequest::post("/documents/upload/batch").multipart(parts))
            .await
    }

    pub async fn list_documents(&self) -> Result<DocumentListResponse> {
        self.execute_json(ApiRequest::get("/documents")).await
    }

    pub async fn document(&self, id: &str) -> Result<DocumentResponse> {
        self.execute_json(ApiRequest::get(format!("/documents/{id}")))
            .await
    }

    /// The server answers with an empty body; only the status matters.
    pub async fn delete_document(&self, id: &str) -> Result<()> {
        self.execute(ApiRequest::delete(format!("/documents/{id}")))
            .await?;
        Ok(())
    }

    pub async fn document_chunks(&self, id: &str) -> Result<DocumentChunksResponse> {
        self.execute_json(ApiRequest::get(format!("/documents/{id}/chunks")))
            .await
    }

    pub async fn documents_health(&self) -> Result<HealthCheckResponse> {
        self.execute_json(ApiRequest::get("/documents/health/check"))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_parses_with_null_optionals() {
        let json = r#"{
            "id": "d1", "user_id": "u1", "filename": "notes.md", "file_type": "md",
            "file_size": 1024, "chunks_count": 3, "status": "completed",
            "created_at": "2024-01-01T00:00:00Z", "updated_at": null, "error_message": null
        }"#;
        let doc: DocumentMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(doc.file_type, DocumentType::Md);
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert!(doc.error_message.is_none());
    }

    #[test]
    fn upload_parts_follow_extension_and_options() {
        let file = UploadFile::new("Notes.MD", Bytes::from_static(b"# hi"));
        assert_eq!(file.content_type(), Some("text/markdown"));
        assert_eq!(UploadFile::new("archive", Vec::new()).content_type(), None);

        let options = UploadOptions {
            chunk_size: Some(800),
            chunk_overlap: None,
        };
        let parts: Vec<_> = options.form_parts().collect();
        assert_eq!(parts, vec![FormPart::text("chunk_size", "800")]);
        assert_eq!(UploadOptions::default().form_parts().count(), 0);

        assert_eq!(
            file.form_part("files"),
            FormPart::file("files", "Notes.MD", Bytes::from_static(b"# hi"))
                .with_content_type("text/markdown")
        );
    }

    #[test]
    fn chunk_embedding_is_optional() {
        let json = r#"{"document_id":"d1","chunk_index":0,"content":"hello"}"#;
        let chunk: DocumentChunk = serde_json::from_str(json).unwrap();
        assert!(chunk.embedding.is_none());
    }
}
