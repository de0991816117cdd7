//! Object operations: upload, download, metadata, copy and delete.

use crate::config::S3Config;
use crate::error::{RequestError, S3Error};
use crate::request::{S3Request, Verb};
use crate::response::{ResponseBody, ResponseHeaders, S3Response};
use crate::signing::{content_md5, encode_object_key, file_content_md5, AwsSigner};
use crate::transfer::{create_file_sink, detect_content_type, open_file_source, DEFAULT_CONTENT_TYPE};
use crate::transport::{HttpTransport, RequestBody};
use crate::types::*;
use crate::xml;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tracing::debug;

/// Service for object operations.
pub struct ObjectsService {
    config: Arc<S3Config>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
}

impl ObjectsService {
    /// Create a new objects service.
    pub fn new(
        config: Arc<S3Config>,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
    ) -> Self {
        Self {
            config,
            transport,
            signer,
        }
    }

    async fn send(
        &self,
        request: S3Request,
        sink: Option<&mut (dyn AsyncWrite + Send + Unpin)>,
    ) -> Result<S3Response, S3Error> {
        request
            .send(self.transport.as_ref(), self.signer.as_ref(), sink)
            .await
    }

    /// Upload an object.
    ///
    /// File sources are opened before anything is sent, so an unreadable file
    /// fails without network activity. File and reader payloads are streamed.
    pub async fn put(&self, request: PutObjectRequest) -> Result<PutObjectOutput, S3Error> {
        let PutObjectRequest {
            bucket,
            key,
            source,
            acl,
            content_type,
            md5,
            headers,
            metadata,
        } = request;

        if key.is_empty() {
            return Err(S3Error::Request(RequestError::MissingInput {
                message: "object key is empty".to_string(),
            }));
        }

        let content_type = content_type
            .or_else(|| {
                headers
                    .iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case("Content-Type"))
                    .map(|(_, v)| v.clone())
            })
            .or_else(|| match &source {
                ObjectSource::File(path) => detect_content_type(path),
                _ => None,
            })
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let (body, digest) = match source {
            ObjectSource::Bytes(data) => {
                let digest = match md5 {
                    Md5Policy::Compute => Some(content_md5(&data)),
                    Md5Policy::Skip => None,
                    Md5Policy::Provided(digest) => Some(digest),
                };
                (RequestBody::Bytes(data), digest)
            }
            ObjectSource::File(path) => {
                let (file, length) = open_file_source(&path).await?;
                let digest = match md5 {
                    Md5Policy::Compute => Some(file_content_md5(&path).await?),
                    Md5Policy::Skip => None,
                    Md5Policy::Provided(digest) => Some(digest),
                };
                let body = RequestBody::Stream {
                    reader: Box::new(file),
                    length,
                };
                (body, digest)
            }
            ObjectSource::Reader { reader, length } => {
                let digest = match md5 {
                    Md5Policy::Provided(digest) => Some(digest),
                    Md5Policy::Compute | Md5Policy::Skip => None,
                };
                (RequestBody::Stream { reader, length }, digest)
            }
        };

        let mut http = S3Request::new(&self.config, Verb::Put, &bucket, &key);
        for (name, value) in &headers {
            http.set_header(name, value.as_str());
        }
        http.set_header("Content-Type", content_type);
        if let Some(digest) = digest {
            http.set_header("Content-MD5", digest);
        }
        http.set_amz_header("x-amz-acl", acl.as_str());
        for (name, value) in &metadata {
            http.set_amz_header(&format!("x-amz-meta-{}", name), value.as_str());
        }

        debug!(bucket = %bucket, key = %key, length = ?body.len(), "Uploading object");
        http.set_body(body);

        let response = self.send(http, None).await?.ensure_status(&[200])?;
        Ok(PutObjectOutput {
            hash: response.headers.hash,
        })
    }

    /// Download an object into memory.
    pub async fn get(&self, bucket: &str, key: &str) -> Result<GetObjectOutput, S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Get, bucket, key);
        request.set_parse_xml(false);

        let response = self.send(request, None).await?.ensure_status(&[200])?;
        let headers = response.headers.clone();
        Ok(GetObjectOutput {
            headers,
            body: response.into_bytes(),
        })
    }

    /// Stream an object into `sink` as it arrives.
    pub async fn get_to_writer(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<DownloadOutput, S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Get, bucket, key);
        request.set_parse_xml(false);

        let response = self.send(request, Some(sink)).await?.ensure_status(&[200])?;
        let bytes_written = match response.body {
            ResponseBody::Streamed { bytes } => bytes,
            _ => 0,
        };
        Ok(DownloadOutput {
            headers: response.headers,
            bytes_written,
        })
    }

    /// Stream an object into a local file.
    ///
    /// The destination is created before the request is sent.
    pub async fn get_to_file(
        &self,
        bucket: &str,
        key: &str,
        path: impl AsRef<Path>,
    ) -> Result<DownloadOutput, S3Error> {
        let mut file = create_file_sink(path.as_ref()).await?;
        self.get_to_writer(bucket, key, &mut file).await
    }

    /// Fetch object headers. `None` when the object does not exist.
    pub async fn head(&self, bucket: &str, key: &str) -> Result<Option<ResponseHeaders>, S3Error> {
        let request = S3Request::new(&self.config, Verb::Head, bucket, key);
        let response = self.send(request, None).await?;
        if response.status == 404 {
            return Ok(None);
        }
        let response = response.ensure_status(&[200])?;
        Ok(Some(response.headers))
    }

    /// Copy an object server-side.
    ///
    /// Supplying headers or metadata replaces the source metadata.
    pub async fn copy(&self, request: CopyObjectRequest) -> Result<CopyObjectOutput, S3Error> {
        let mut http = S3Request::new(&self.config, Verb::Put, &request.bucket, &request.key);
        http.set_header("Content-Length", "0");
        for (name, value) in &request.headers {
            http.set_header(name, value.as_str());
        }
        for (name, value) in &request.metadata {
            http.set_amz_header(&format!("x-amz-meta-{}", name), value.as_str());
        }
        http.set_amz_header("x-amz-acl", request.acl.as_str());
        http.set_amz_header(
            "x-amz-copy-source",
            format!(
                "/{}/{}",
                request.source_bucket,
                encode_object_key(&request.source_key)
            ),
        );
        if request.replaces_metadata() {
            http.set_amz_header("x-amz-metadata-directive", "REPLACE");
        }

        let response = self.send(http, None).await?.ensure_status(&[200])?;
        let (last_modified, hash) = xml::parse_copy_result(response.xml()?)?;
        Ok(CopyObjectOutput {
            last_modified,
            hash,
        })
    }

    /// Delete an object.
    pub async fn delete(&self, bucket: &str, key: &str) -> Result<(), S3Error> {
        let request = S3Request::new(&self.config, Verb::Delete, bucket, key);
        self.send(request, None).await?.ensure_status(&[204])?;
        Ok(())
    }
}

impl std::fmt::Debug for ObjectsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
