//! Response normalisation.
//!
//! Turns a raw [`HttpResponse`] into an [`S3Response`]: headers of interest
//! are captured, XML bodies are parsed, and service error documents become
//! [`S3Error::Provider`] values instead of success payloads.

use crate::error::{map_error_document, ResponseError, S3Error};
use crate::signing::parse_http_date;
use crate::transport::HttpResponse;
use crate::xml::{self, parse_error_document, strip_quotes, XmlElement};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Statuses never treated as carrying an error document.
pub const NON_ERROR_STATUSES: [u16; 2] = [200, 204];

const META_PREFIX: &str = "x-amz-meta-";

/// Value of an `x-amz-meta-*` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaValue {
    /// Value that parsed as an integer.
    Integer(i64),
    /// Any other value.
    Text(String),
}

impl MetaValue {
    fn from_header(value: &str) -> Self {
        match value.trim().parse::<i64>() {
            Ok(n) => MetaValue::Integer(n),
            Err(_) => MetaValue::Text(value.to_string()),
        }
    }

    /// The value as text.
    pub fn as_text(&self) -> String {
        match self {
            MetaValue::Integer(n) => n.to_string(),
            MetaValue::Text(s) => s.clone(),
        }
    }
}

/// Headers of interest captured from a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// `Last-Modified`.
    pub time: Option<DateTime<Utc>>,
    /// `Content-Length`.
    pub size: Option<u64>,
    /// `Content-Type`.
    pub content_type: Option<String>,
    /// `ETag` without quotes.
    pub hash: Option<String>,
    /// `x-amz-meta-*` headers keyed by their full lower-case name.
    pub meta: BTreeMap<String, MetaValue>,
}

impl ResponseHeaders {
    /// Capture headers of interest. Names are matched case-insensitively.
    pub fn from_headers(headers: &HashMap<String, String>) -> Self {
        let mut captured = ResponseHeaders::default();
        for (name, value) in headers {
            let name = name.to_ascii_lowercase();
            match name.as_str() {
                "last-modified" => captured.time = parse_http_date(value),
                "content-length" => captured.size = value.trim().parse().ok(),
                "content-type" => captured.content_type = Some(value.clone()),
                "etag" => captured.hash = Some(strip_quotes(value).to_string()),
                _ if name.starts_with(META_PREFIX) => {
                    captured.meta.insert(name, MetaValue::from_header(value));
                }
                _ => {}
            }
        }
        captured
    }

    /// Metadata value by its short name (without `x-amz-meta-`).
    pub fn metadata(&self, name: &str) -> Option<&MetaValue> {
        self.meta
            .get(&format!("{}{}", META_PREFIX, name.to_ascii_lowercase()))
    }
}

/// Normalised response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// No body.
    Empty,
    /// Raw bytes (object data, or XML that failed to parse).
    Raw(Bytes),
    /// Parsed XML document.
    Xml(XmlElement),
    /// Body written to the caller's sink.
    Streamed {
        /// Bytes written.
        bytes: u64,
    },
}

/// A response that is not a service error.
#[derive(Debug, Clone)]
pub struct S3Response {
    /// HTTP status.
    pub status: u16,
    /// Captured headers.
    pub headers: ResponseHeaders,
    /// All response headers.
    pub raw_headers: HashMap<String, String>,
    /// Body.
    pub body: ResponseBody,
    /// Canonical resource of the request.
    pub resource: String,
}

fn looks_like_xml(content_type: Option<&str>, body: &[u8]) -> bool {
    let by_type = content_type
        .map(|ct| {
            let essence = ct.split(';').next().unwrap_or_default().trim();
            essence.eq_ignore_ascii_case("application/xml")
                || essence.eq_ignore_ascii_case("text/xml")
        })
        .unwrap_or(false);
    by_type || body.starts_with(b"<?xml")
}

impl S3Response {
    /// Normalise a transport response.
    ///
    /// Bodies are parsed as XML when `parse_xml` is set, and always when the
    /// status is outside [`NON_ERROR_STATUSES`] so error documents are never
    /// missed. A parsed error document with a non-success status yields
    /// [`S3Error::Provider`]. A body that fails to parse is kept raw.
    pub fn from_http(http: HttpResponse, resource: &str, parse_xml: bool) -> Result<Self, S3Error> {
        let headers = ResponseHeaders::from_headers(&http.headers);
        let is_error_status = !NON_ERROR_STATUSES.contains(&http.status);

        let body = if let Some(bytes) = http.streamed_bytes {
            ResponseBody::Streamed { bytes }
        } else if http.body.is_empty() {
            ResponseBody::Empty
        } else if (parse_xml || is_error_status) && looks_like_xml(http.content_type(), &http.body)
        {
            match xml::parse(&http.body) {
                Ok(root) => ResponseBody::Xml(root),
                Err(e) => {
                    trace!(error = %e, resource, "Response body is not well-formed XML");
                    ResponseBody::Raw(http.body.clone())
                }
            }
        } else {
            ResponseBody::Raw(http.body.clone())
        };

        if is_error_status {
            if let ResponseBody::Xml(root) = &body {
                if let Some(document) = parse_error_document(root) {
                    return Err(map_error_document(document, http.status, resource));
                }
            }
        }

        Ok(Self {
            status: http.status,
            headers,
            raw_headers: http.headers,
            body,
            resource: resource.to_string(),
        })
    }

    /// Fail with "unexpected HTTP status" unless the status is one of `expected`.
    pub fn ensure_status(self, expected: &[u16]) -> Result<Self, S3Error> {
        if expected.contains(&self.status) {
            Ok(self)
        } else {
            Err(S3Error::Response(ResponseError::UnexpectedStatus {
                status: self.status,
                resource: self.resource,
            }))
        }
    }

    /// The parsed XML root.
    pub fn xml(&self) -> Result<&XmlElement, S3Error> {
        match &self.body {
            ResponseBody::Xml(root) => Ok(root),
            _ => Err(S3Error::Response(ResponseError::InvalidResponse {
                message: format!("expected an XML document from {}", self.resource),
            })),
        }
    }

    /// The body as bytes. Parsed and streamed bodies yield nothing.
    pub fn into_bytes(self) -> Bytes {
        match self.body {
            ResponseBody::Raw(bytes) => bytes,
            _ => Bytes::new(),
        }
    }

    /// Raw header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
