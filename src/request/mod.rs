//! Request assembly and signing.
//!
//! An [`S3Request`] is built per call, mutated only before it is sent, and
//! consumed by [`S3Request::send`]. The attached body (and any file or reader
//! behind it) is owned by the request and released when `send` returns.

use crate::config::S3Config;
use crate::error::S3Error;
use crate::response::S3Response;
use crate::signing::{
    build_query_string, canonical_amz_headers, encode_object_key, format_http_date,
    is_sub_resource, string_to_sign, AwsSigner,
};
use crate::transport::{HttpRequest, HttpTransport, RequestBody};
use chrono::{DateTime, Utc};
use std::fmt;
use tokio::io::AsyncWrite;
use tracing::debug;

/// HTTP verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// GET
    Get,
    /// PUT
    Put,
    /// POST
    Post,
    /// HEAD
    Head,
    /// DELETE
    Delete,
}

impl Verb {
    /// Method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Put => "PUT",
            Verb::Post => "POST",
            Verb::Head => "HEAD",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which API a request addresses; decides how it is signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Api {
    /// Object storage API. Signs the full canonical string.
    Storage,
    /// CDN control API. Signs the `Date` header only.
    Cdn,
}

fn upsert(list: &mut Vec<(String, String)>, key: &str, value: String) {
    match list.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
        Some(entry) => entry.1 = value,
        None => list.push((key.to_string(), value)),
    }
}

/// A storage or CDN request under construction.
#[derive(Debug)]
pub struct S3Request {
    verb: Verb,
    api: Api,
    bucket: String,
    uri: String,
    resource: String,
    scheme: &'static str,
    host: String,
    path: String,
    parameters: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    amz_headers: Vec<(String, String)>,
    body: RequestBody,
    parse_xml: bool,
}

impl S3Request {
    /// Create a storage request for `key` in `bucket`. Either may be empty.
    pub fn new(config: &S3Config, verb: Verb, bucket: &str, key: &str) -> Self {
        let bucket = bucket.to_lowercase();
        let uri = if key.is_empty() {
            "/".to_string()
        } else {
            format!("/{}", encode_object_key(key))
        };
        let resource = if bucket.is_empty() {
            uri.clone()
        } else {
            format!("/{}{}", bucket, uri)
        };
        let path = if config.path_style && !bucket.is_empty() {
            resource.clone()
        } else {
            uri.clone()
        };
        let host = config.bucket_host(&bucket);

        Self::assemble(verb, Api::Storage, bucket, uri, resource, config.scheme(), host, path)
    }

    /// Create a CDN control request for `path` (e.g. `2008-06-30/distribution`).
    /// CDN requests always use HTTPS.
    pub fn cdn(config: &S3Config, verb: Verb, path: &str) -> Self {
        let uri = format!("/{}", encode_object_key(path.trim_start_matches('/')));
        Self::assemble(
            verb,
            Api::Cdn,
            String::new(),
            uri.clone(),
            uri.clone(),
            "https",
            config.cdn_host.clone(),
            uri,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        verb: Verb,
        api: Api,
        bucket: String,
        uri: String,
        resource: String,
        scheme: &'static str,
        host: String,
        path: String,
    ) -> Self {
        let headers = vec![
            ("Host".to_string(), host.clone()),
            ("Date".to_string(), format_http_date(&Utc::now())),
            ("Content-MD5".to_string(), String::new()),
            ("Content-Type".to_string(), String::new()),
        ];
        Self {
            verb,
            api,
            bucket,
            uri,
            resource,
            scheme,
            host,
            path,
            parameters: Vec::new(),
            headers,
            amz_headers: Vec::new(),
            body: RequestBody::Empty,
            parse_xml: true,
        }
    }

    /// Override the `Date` header.
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.set_header("Date", format_http_date(&date));
        self
    }

    /// Record a query parameter. An empty value is sent as a bare flag.
    pub fn set_parameter(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.parameters.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((key.to_string(), value)),
        }
    }

    /// Record a bare query flag such as `acl`.
    pub fn set_flag(&mut self, key: &str) {
        self.set_parameter(key, "");
    }

    /// Set a request header, replacing any previous value.
    pub fn set_header(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.headers, key, value.into());
    }

    /// Set an `x-amz-*` header, replacing any previous value.
    pub fn set_amz_header(&mut self, key: &str, value: impl Into<String>) {
        upsert(&mut self.amz_headers, key, value.into());
    }

    /// Attach the payload, replacing any previous one.
    pub fn set_body(&mut self, body: RequestBody) {
        self.body = body;
    }

    /// Whether XML response bodies are parsed. On by default.
    pub fn set_parse_xml(&mut self, parse_xml: bool) {
        self.parse_xml = parse_xml;
    }

    /// Standard header value.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// `x-amz-*` header value.
    pub fn amz_header(&self, key: &str) -> Option<&str> {
        self.amz_headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// HTTP verb.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Target API.
    pub fn api(&self) -> Api {
        self.api
    }

    /// Lower-cased bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Encoded request URI (`/` for the bucket root).
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Host the request is sent to.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Query string in insertion order, without the leading `?`.
    pub fn query_string(&self) -> String {
        build_query_string(&self.parameters)
    }

    /// Canonical resource, suffixed with the query when a sub-resource is addressed.
    pub fn canonical_resource(&self) -> String {
        let query = self.query_string();
        if !query.is_empty() && self.parameters.iter().any(|(k, _)| is_sub_resource(k)) {
            format!("{}?{}", self.resource, query)
        } else {
            self.resource.clone()
        }
    }

    /// Full request URL.
    pub fn url(&self) -> String {
        let query = self.query_string();
        if query.is_empty() {
            format!("{}://{}{}", self.scheme, self.host, self.path)
        } else {
            format!("{}://{}{}?{}", self.scheme, self.host, self.path, query)
        }
    }

    /// The string the signature is computed over.
    pub fn string_to_sign(&self) -> String {
        let date = self.header("Date").unwrap_or_default();
        match self.api {
            Api::Cdn => date.to_string(),
            Api::Storage => string_to_sign(
                self.verb.as_str(),
                self.header("Content-MD5").unwrap_or_default(),
                self.header("Content-Type").unwrap_or_default(),
                date,
                &canonical_amz_headers(&self.amz_headers),
                &self.canonical_resource(),
            ),
        }
    }

    /// Sign the request and turn it into a transport request.
    ///
    /// Headers go out as `x-amz-*` first, then the non-empty standard
    /// headers, then `Authorization`.
    pub async fn finalize_and_sign(self, signer: &dyn AwsSigner) -> Result<HttpRequest, S3Error> {
        let signature = signer.sign(&self.string_to_sign()).await?;

        let mut request = HttpRequest::new(self.verb.as_str(), self.url())
            .with_resource(self.canonical_resource());
        for (key, value) in self.amz_headers.iter().chain(self.headers.iter()) {
            if !value.is_empty() {
                request = request.with_header(key.as_str(), value.as_str());
            }
        }
        Ok(request
            .with_header("Authorization", signature.authorization())
            .with_body(self.body))
    }

    /// Sign and send the request, then normalise the response.
    ///
    /// A 200 response body is written to `sink` when one is supplied.
    pub async fn send(
        self,
        transport: &dyn HttpTransport,
        signer: &dyn AwsSigner,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<S3Response, S3Error> {
        let resource = self.canonical_resource();
        let parse_xml = self.parse_xml;
        let method = self.verb;

        debug!(method = %method, resource = %resource, "Sending request");
        let request = self.finalize_and_sign(signer).await?;
        let response = transport.send(request, sink).await?;
        debug!(method = %method, resource = %resource, status = response.status, "Received response");

        S3Response::from_http(response, &resource, parse_xml)
    }
}
