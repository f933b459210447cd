//! Transport seam between the pipeline and the network
//!
//! The pipeline and the refresh coordinator only ever see a
//! `TransportOutcome`, so the failure classifier matches exhaustively on
//! success / HTTP failure / network failure instead of inspecting optional
//! fields. `HttpTransport` is the reqwest-backed implementation; tests plug in
//! scripted transports through the same trait.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{ClientError, Result};

/// One field of a `multipart/form-data` body.
///
/// Kept as plain data rather than a `reqwest::multipart::Form` so the body can
/// be rebuilt for every attempt; a form is consumed when sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content_type: Option<String>,
        content: Bytes,
    },
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Text {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(name: impl Into<String>, filename: impl Into<String>, content: Bytes) -> Self {
        Self::File {
            name: name.into(),
            filename: filename.into(),
            content_type: None,
            content,
        }
    }

    /// Set the part's content type; ignored for text fields.
    pub fn with_content_type(mut self, mime: impl Into<String>) -> Self {
        if let Self::File { content_type, .. } = &mut self {
            *content_type = Some(mime.into());
        }
        self
    }

    fn to_reqwest(&self) -> (String, reqwest::multipart::Part) {
        match self {
            Self::Text { name, value } => {
                (name.clone(), reqwest::multipart::Part::text(value.clone()))
            }
            Self::File {
                name,
                filename,
                content_type,
                content,
            } => {
                let part = reqwest::multipart::Part::bytes(content.to_vec())
                    .file_name(filename.clone());
                let part = match content_type {
                    Some(mime) => match part.mime_str(mime) {
                        Ok(part) => part,
                        Err(e) => {
                            warn!(filename = %filename, mime = %mime, error = %e, "invalid part content type, sending without it");
                            reqwest::multipart::Part::bytes(content.to_vec())
                                .file_name(filename.clone())
                        }
                    },
                    None => part,
                };
                (name.clone(), part)
            }
        }
    }
}

/// A replayable request: everything needed to send it again after a refresh.
///
/// `path` is relative to the transport's base URL (e.g. `/documents/abc`).
/// A request carries either a raw `body` or `form` parts, never both.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub form: Option<Vec<FormPart>>,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
            form: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Serialize `body` as the JSON request body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ClientError::Decode(format!("serializing request body: {e}")))?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(bytes));
        self.form = None;
        Ok(self)
    }

    /// Send `parts` as a `multipart/form-data` body. The boundary and content
    /// type are chosen per attempt by the transport.
    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.headers.remove(CONTENT_TYPE);
        self.body = None;
        self.form = Some(parts);
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    ///
    /// A token that cannot be a header value is dropped with a warning and the
    /// request goes out without credentials; the server's 401 then drives the
    /// normal expiry handling.
    pub fn set_bearer(&mut self, token: &str) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.headers.insert(AUTHORIZATION, value);
            }
            Err(_) => {
                warn!(path = %self.path, "access credential is not a valid header value, sending without it");
                self.headers.remove(AUTHORIZATION);
            }
        }
    }

    /// Bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Whether this request has already been resent after a refresh.
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }
}

/// A 2xx response with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Body as (lossy) UTF-8 text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Result of one transport attempt.
#[derive(Debug, Clone)]
pub enum TransportOutcome {
    Success(ApiResponse),
    /// A response arrived with a non-success status.
    HttpFailure { status: u16, body: String },
    /// No response: connection refused, DNS, timeout, TLS, truncated body.
    NetworkFailure(String),
}

/// Sends one request and reports what happened.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportOutcome> + Send + 'a>>;
}

/// reqwest-backed transport rooted at `base_url + prefix`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport with its own client and a per-request timeout.
    pub fn new(base_url: &str, prefix: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Configuration(format!("building HTTP client: {e}")))?;
        Self::with_client(client, base_url, prefix)
    }

    /// Reuse an existing client (shared connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str, prefix: &str) -> Result<Self> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ClientError::Configuration(format!(
                "base_url must start with http:// or https://, got: {base_url}"
            )));
        }
        let prefix = prefix.trim_matches('/');
        let base_url = if prefix.is_empty() {
            base_url.trim_end_matches('/').to_owned()
        } else {
            format!("{}/{prefix}", base_url.trim_end_matches('/'))
        };
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

impl Transport for HttpTransport {
    fn send<'a>(
        &'a self,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = TransportOutcome> + Send + 'a>> {
        Box::pin(async move {
            let url = self.url(&request.path);
            let mut builder = self
                .client
                .request(request.method.clone(), url.as_str())
                .headers(request.headers.clone());
            if let Some(parts) = &request.form {
                let form = parts
                    .iter()
                    .map(FormPart::to_reqwest)
                    .fold(reqwest::multipart::Form::new(), |form, (name, part)| {
                        form.part(name, part)
                    });
                builder = builder.multipart(form);
            } else if let Some(body) = &request.body {
                builder = builder.body(body.clone());
            }

            let response = match builder.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(url = %url, error = %e, "no response from server");
                    return TransportOutcome::NetworkFailure(e.to_string());
                }
            };

            let status = response.status();
            let headers = response.headers().clone();
            match response.bytes().await {
                Ok(body) if status.is_success() => {
                    TransportOutcome::Success(ApiResponse {
                        status,
                        headers,
                        body,
                    })
                }
                Ok(body) => TransportOutcome::HttpFailure {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body).into_owned(),
                },
                Err(e) => TransportOutcome::NetworkFailure(format!("reading response body: {e}")),
            }
        })
    }
}
