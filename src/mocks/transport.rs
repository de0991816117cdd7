//! Mock HTTP transport for testing.

use crate::config::DEFAULT_UPLOAD_CHUNK_SIZE;
use crate::error::{NetworkError, S3Error, TransferError};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Mock HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl MockResponse {
    /// Create a successful response with empty body.
    pub fn ok() -> Self {
        Self::with_status(200, Bytes::new())
    }

    /// Create a successful response with body.
    pub fn ok_with_body(body: impl Into<Bytes>) -> Self {
        Self::with_status(200, body)
    }

    /// Create a 200 response carrying an XML document.
    pub fn xml(body: impl Into<Bytes>) -> Self {
        Self::ok_with_body(body).with_header("content-type", "application/xml")
    }

    /// Create a 204 No Content response.
    pub fn no_content() -> Self {
        Self::with_status(204, Bytes::new())
    }

    /// Create a 201 Created response carrying an XML document.
    pub fn created(body: impl Into<Bytes>) -> Self {
        Self::with_status(201, body).with_header("content-type", "application/xml")
    }

    /// Create an error response.
    pub fn error(status: u16, body: impl Into<Bytes>) -> Self {
        Self::with_status(status, body)
    }

    /// Create a response with any status.
    pub fn with_status(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header to the response.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Add multiple headers to the response.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// Builder for mock responses.
pub struct MockResponseBuilder {
    responses: Vec<MockResponse>,
}

impl MockResponseBuilder {
    /// Create a new mock response builder.
    pub fn new() -> Self {
        Self {
            responses: Vec::new(),
        }
    }

    /// Add a response to return.
    pub fn respond(mut self, response: MockResponse) -> Self {
        self.responses.push(response);
        self
    }

    /// Add multiple responses.
    pub fn respond_all(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses.extend(responses);
        self
    }

    /// Build the mock transport.
    pub fn build(self) -> MockTransport {
        MockTransport::with_responses(self.responses)
    }
}

impl Default for MockResponseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A request as seen by [`MockTransport`], with its body drained.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers, in send order.
    pub headers: Vec<(String, String)>,
    /// Canonical resource.
    pub resource: String,
    /// Body bytes received.
    pub body: Bytes,
    /// Number of reads needed to drain a streamed body.
    pub chunks: usize,
    /// Largest single read from a streamed body.
    pub max_chunk: usize,
}

impl RecordedRequest {
    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Header names in send order.
    pub fn header_names(&self) -> Vec<&str> {
        self.headers.iter().map(|(k, _)| k.as_str()).collect()
    }
}

/// Mock HTTP transport for testing.
///
/// Streamed request bodies are drained through a fixed-size buffer, the
/// same way a real connection would consume them.
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<RecordedRequest>>,
    default_response: Option<MockResponse>,
    chunk_size: usize,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::with_responses(Vec::new())
    }

    /// Create a mock transport with queued responses.
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            default_response: None,
            chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }

    /// Create a mock transport with a default response.
    pub fn with_default(response: MockResponse) -> Self {
        let mut transport = Self::new();
        transport.default_response = Some(response);
        transport
    }

    /// Create a builder for the mock transport.
    pub fn builder() -> MockResponseBuilder {
        MockResponseBuilder::new()
    }

    /// Queue a response to return.
    pub fn queue_response(&self, response: MockResponse) {
        self.responses.lock().push_back(response);
    }

    /// Get all recorded requests.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().clone()
    }

    /// Get the number of requests made.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Get the last request made.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests.lock().last().cloned()
    }

    /// Clear all recorded requests.
    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }

    async fn drain_body(&self, body: RequestBody) -> Result<(Bytes, usize, usize), S3Error> {
        match body {
            RequestBody::Empty => Ok((Bytes::new(), 0, 0)),
            RequestBody::Bytes(bytes) => {
                let len = bytes.len();
                Ok((bytes, usize::from(len > 0), len))
            }
            RequestBody::Stream { mut reader, length } => {
                let mut collected = BytesMut::new();
                let mut buf = vec![0u8; self.chunk_size];
                let mut chunks = 0;
                let mut max_chunk = 0;
                loop {
                    let n = reader.read(&mut buf).await.map_err(|e| {
                        S3Error::Transfer(TransferError::SourceRead {
                            message: e.to_string(),
                        })
                    })?;
                    if n == 0 {
                        break;
                    }
                    chunks += 1;
                    max_chunk = max_chunk.max(n);
                    collected.extend_from_slice(&buf[..n]);
                }

                let actual = collected.len() as u64;
                if actual != length {
                    return Err(S3Error::Transfer(TransferError::LengthMismatch {
                        declared: length,
                        actual,
                    }));
                }
                Ok((collected.freeze(), chunks, max_chunk))
            }
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(
        &self,
        request: HttpRequest,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<HttpResponse, S3Error> {
        let HttpRequest {
            method,
            url,
            headers,
            resource,
            body,
        } = request;
        let (body, chunks, max_chunk) = self.drain_body(body).await?;
        self.requests.lock().push(RecordedRequest {
            method,
            url,
            headers,
            resource: resource.clone(),
            body,
            chunks,
            max_chunk,
        });

        let response = {
            let mut responses = self.responses.lock();
            responses
                .pop_front()
                .or_else(|| self.default_response.clone())
        };

        let mock = response.ok_or_else(|| {
            S3Error::Network(NetworkError::ConnectionFailed {
                message: "No mock response available".to_string(),
                resource: resource.clone(),
            })
        })?;

        match sink {
            Some(sink) if mock.status == 200 => {
                let mut written: u64 = 0;
                for chunk in mock.body.chunks(self.chunk_size) {
                    sink.write_all(chunk).await.map_err(|e| {
                        S3Error::Transfer(TransferError::SinkWrite {
                            bytes_written: written,
                            message: e.to_string(),
                        })
                    })?;
                    written += chunk.len() as u64;
                }
                sink.flush().await.map_err(|e| {
                    S3Error::Transfer(TransferError::SinkWrite {
                        bytes_written: written,
                        message: e.to_string(),
                    })
                })?;
                Ok(HttpResponse {
                    status: mock.status,
                    headers: mock.headers,
                    body: Bytes::new(),
                    streamed_bytes: Some(written),
                })
            }
            _ => Ok(HttpResponse::new(mock.status, mock.headers, mock.body)),
        }
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("queued_responses", &self.responses.lock().len())
            .field("recorded_requests", &self.requests.lock().len())
            .finish()
    }
}
