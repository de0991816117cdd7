//! HTTP transport layer.
//!
//! The transport executes one signed request and either accumulates the
//! response body in memory or, for a `200` response with a sink supplied,
//! writes each chunk to the sink as it arrives.

use crate::error::{NetworkError, S3Error, TransferError};
use crate::transfer::LengthCheckedReader;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;
use tracing::{debug, trace};

/// Readable payload source attached to a request.
pub type BodyReader = Box<dyn AsyncRead + Send + Sync + Unpin>;

/// Request payload. At most one source is ever attached.
pub enum RequestBody {
    /// No body.
    Empty,
    /// In-memory buffer.
    Bytes(Bytes),
    /// Readable stream with a declared length, sent in chunks.
    Stream {
        /// Source of the payload bytes.
        reader: BodyReader,
        /// Exact number of bytes the reader must produce.
        length: u64,
    },
}

impl RequestBody {
    /// Declared payload length, if a payload is attached.
    pub fn len(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Bytes(bytes) => Some(bytes.len() as u64),
            RequestBody::Stream { length, .. } => Some(*length),
        }
    }

    /// Whether no payload is attached.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Empty
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => f.write_str("Empty"),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            RequestBody::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish_non_exhaustive()
            }
        }
    }
}

/// HTTP request to be sent.
#[derive(Debug)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers, in send order.
    pub headers: Vec<(String, String)>,
    /// Canonical resource, carried for error reporting.
    pub resource: String,
    /// Request body.
    pub body: RequestBody,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            resource: String::new(),
            body: RequestBody::Empty,
        }
    }

    /// Set the request body.
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the canonical resource.
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = resource.into();
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// HTTP response received.
#[derive(Debug)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body, empty when the body went to a sink.
    pub body: Bytes,
    /// Bytes written to the sink, when the body was streamed.
    pub streamed_bytes: Option<u64>,
}

impl HttpResponse {
    /// Create a response with a buffered body.
    pub fn new(status: u16, headers: HashMap<String, String>, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
            streamed_bytes: None,
        }
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Get the content type.
    pub fn content_type(&self) -> Option<&str> {
        self.get_header("content-type")
    }
}

/// HTTP transport trait for making requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send a request.
    ///
    /// When `sink` is supplied and the status is 200, the body is written to
    /// the sink chunk by chunk and [`HttpResponse::body`] is left empty.
    async fn send(
        &self,
        request: HttpRequest,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<HttpResponse, S3Error>;
}

/// Default HTTP transport using reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
    upload_chunk_size: usize,
}

impl ReqwestTransport {
    /// Create a new transport with default settings.
    pub fn new() -> Result<Self, S3Error> {
        Self::builder().build()
    }

    /// Create a transport builder.
    pub fn builder() -> ReqwestTransportBuilder {
        ReqwestTransportBuilder::new()
    }
}

/// Response headers as text. Values that are not valid UTF-8 are dropped.
fn collect_headers(headers: &reqwest::header::HeaderMap, resource: &str) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| match v.to_str() {
            Ok(value) => Some((k.to_string(), value.to_string())),
            Err(_) => {
                debug!(header = %k, resource = %resource, "Skipping non-UTF-8 response header");
                None
            }
        })
        .collect()
}

fn map_reqwest_error(e: reqwest::Error, resource: &str) -> S3Error {
    let resource = resource.to_string();
    let message = e.to_string();
    if e.is_timeout() {
        S3Error::Network(NetworkError::Timeout { message, resource })
    } else if e.is_builder() {
        S3Error::Network(NetworkError::InvalidRequest { message, resource })
    } else if e.is_body() || e.is_decode() {
        S3Error::Network(NetworkError::BodyFailed { message, resource })
    } else {
        S3Error::Network(NetworkError::ConnectionFailed { message, resource })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: HttpRequest,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<HttpResponse, S3Error> {
        let resource = request.resource;
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            S3Error::Network(NetworkError::InvalidRequest {
                message: format!("Invalid HTTP method: {}", e),
                resource: resource.clone(),
            })
        })?;

        let mut req_builder = self.client.request(method, &request.url);

        for (name, value) in &request.headers {
            req_builder = req_builder.header(name.as_str(), value.as_str());
        }

        req_builder = match request.body {
            RequestBody::Empty => req_builder,
            RequestBody::Bytes(bytes) => req_builder.body(bytes),
            RequestBody::Stream { reader, length } => {
                let checked = LengthCheckedReader::new(reader, length);
                let stream = ReaderStream::with_capacity(checked, self.upload_chunk_size);
                req_builder
                    .header(reqwest::header::CONTENT_LENGTH, length.to_string())
                    .body(reqwest::Body::wrap_stream(stream))
            }
        };

        let mut response = req_builder
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, &resource))?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers(), &resource);

        match sink {
            Some(sink) if status == 200 => {
                let mut written: u64 = 0;
                let mut stream = response.bytes_stream();
                while let Some(chunk) = stream.next().await {
                    let chunk = chunk.map_err(|e| map_reqwest_error(e, &resource))?;
                    sink.write_all(&chunk).await.map_err(|e| {
                        S3Error::Transfer(TransferError::SinkWrite {
                            bytes_written: written,
                            message: e.to_string(),
                        })
                    })?;
                    written += chunk.len() as u64;
                    trace!(bytes = written, "Streamed response chunk to sink");
                }
                sink.flush().await.map_err(|e| {
                    S3Error::Transfer(TransferError::SinkWrite {
                        bytes_written: written,
                        message: e.to_string(),
                    })
                })?;

                Ok(HttpResponse {
                    status,
                    headers,
                    body: Bytes::new(),
                    streamed_bytes: Some(written),
                })
            }
            _ => {
                let mut body = BytesMut::new();
                while let Some(chunk) = response
                    .chunk()
                    .await
                    .map_err(|e| map_reqwest_error(e, &resource))?
                {
                    body.extend_from_slice(&chunk);
                }
                Ok(HttpResponse::new(status, headers, body.freeze()))
            }
        }
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestTransport")
            .field("upload_chunk_size", &self.upload_chunk_size)
            .finish_non_exhaustive()
    }
}

/// Builder for reqwest transport.
pub struct ReqwestTransportBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    verify_ssl: bool,
    user_agent: String,
    upload_chunk_size: usize,
}

impl ReqwestTransportBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(300),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            verify_ssl: true,
            user_agent: format!("s3-cdn/{}", env!("CARGO_PKG_VERSION")),
            upload_chunk_size: crate::config::DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the request timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the maximum idle connections per host.
    pub fn pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }

    /// Set the idle connection timeout.
    pub fn pool_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.pool_idle_timeout = timeout;
        self
    }

    /// Set whether to verify SSL certificates.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = verify;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the size of chunks read from streamed request bodies.
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = size.max(1);
        self
    }

    /// Build the transport.
    pub fn build(self) -> Result<ReqwestTransport, S3Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.read_timeout)
            .pool_max_idle_per_host(self.pool_max_idle_per_host)
            .pool_idle_timeout(self.pool_idle_timeout)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| {
                S3Error::Network(NetworkError::TlsError {
                    message: e.to_string(),
                })
            })?;

        Ok(ReqwestTransport {
            client,
            upload_chunk_size: self.upload_chunk_size,
        })
    }
}

impl Default for ReqwestTransportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::new("PUT", "https://bucket.s3.amazonaws.com/key")
            .with_header("Content-Type", "text/plain")
            .with_resource("/bucket/key")
            .with_body(RequestBody::Bytes(Bytes::from_static(b"test body")));

        assert_eq!(request.method, "PUT");
        assert_eq!(request.get_header("content-type"), Some("text/plain"));
        assert_eq!(request.resource, "/bucket/key");
        assert_eq!(request.body.len(), Some(9));
    }

    #[test]
    fn test_request_body_lengths() {
        assert_eq!(RequestBody::Empty.len(), None);
        assert!(RequestBody::Empty.is_empty());

        let stream = RequestBody::Stream {
            reader: Box::new(std::io::Cursor::new(vec![0u8; 4])),
            length: 4,
        };
        assert_eq!(stream.len(), Some(4));
        assert!(format!("{:?}", stream).contains("length: 4"));
    }

    #[test]
    fn test_http_response_headers() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/xml".to_string());
        headers.insert("etag".to_string(), "\"abc123\"".to_string());

        let response = HttpResponse::new(200, headers, Bytes::new());

        assert!(response.is_success());
        assert_eq!(response.get_header("Content-Type"), Some("application/xml"));
        assert_eq!(response.content_type(), Some("application/xml"));
        assert_eq!(response.get_header("ETag"), Some("\"abc123\""));
    }

    #[test]
    fn test_collect_headers_skips_non_utf8_values() {
        use reqwest::header::{HeaderMap, HeaderValue};

        let mut map = HeaderMap::new();
        map.insert("etag", HeaderValue::from_static("\"abc\""));
        map.insert("x-amz-meta-note", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let headers = collect_headers(&map, "/bucket/key");

        assert_eq!(headers.get("etag").map(String::as_str), Some("\"abc\""));
        assert!(!headers.contains_key("x-amz-meta-note"));
    }

    #[test]
    fn test_transport_builder() {
        let transport = ReqwestTransport::builder()
            .connect_timeout(Duration::from_secs(10))
            .read_timeout(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .upload_chunk_size(16 * 1024)
            .verify_ssl(true)
            .build();

        assert!(transport.is_ok());
    }
}
