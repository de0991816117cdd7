//! Request types for storage and CDN operations.

use super::common::*;
use crate::transport::BodyReader;
use bytes::Bytes;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default maximum upload size accepted by a POST policy (5 MiB).
pub const DEFAULT_POST_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Request to list a bucket's objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListObjectsRequest {
    /// Bucket name.
    pub bucket: String,
    /// Only keys beginning with this prefix.
    pub prefix: Option<String>,
    /// Start listing after this key.
    pub marker: Option<String>,
    /// Page size cap. When set, only a single page is fetched.
    pub max_keys: Option<u32>,
    /// Roll keys up to this delimiter into common prefixes.
    pub delimiter: Option<String>,
    /// Include common prefixes in the listing.
    pub return_common_prefixes: bool,
}

impl ListObjectsRequest {
    /// Create a request listing every object in `bucket`.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            ..Self::default()
        }
    }

    /// Set the key prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Set the start marker.
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Cap the listing to one page of at most `max_keys` entries.
    pub fn with_max_keys(mut self, max_keys: u32) -> Self {
        self.max_keys = Some(max_keys);
        self
    }

    /// Set the delimiter.
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Include common prefixes in the result.
    pub fn with_common_prefixes(mut self, include: bool) -> Self {
        self.return_common_prefixes = include;
        self
    }
}

/// Request to create a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBucketRequest {
    /// Bucket name.
    pub bucket: String,
    /// Canned ACL.
    pub acl: CannedAcl,
    /// Location constraint (e.g. `EU`). `None` uses the default region.
    pub location: Option<String>,
}

impl CreateBucketRequest {
    /// Create a private bucket in the default region.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            acl: CannedAcl::Private,
            location: None,
        }
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Set the location constraint.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Payload of an upload. Exactly one source per request.
pub enum ObjectSource {
    /// In-memory data.
    Bytes(Bytes),
    /// Local file, opened and streamed when the request is sent.
    File(PathBuf),
    /// Caller-supplied reader producing exactly `length` bytes.
    Reader {
        /// Payload reader.
        reader: BodyReader,
        /// Declared length.
        length: u64,
    },
}

impl fmt::Debug for ObjectSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectSource::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            ObjectSource::File(path) => f.debug_tuple("File").field(path).finish(),
            ObjectSource::Reader { length, .. } => f
                .debug_struct("Reader")
                .field("length", length)
                .finish_non_exhaustive(),
        }
    }
}

/// How the `Content-MD5` header of an upload is obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Md5Policy {
    /// Compute it from in-memory data or a file. Reader sources are sent without it.
    #[default]
    Compute,
    /// Send no `Content-MD5`.
    Skip,
    /// Use the given base64 digest.
    Provided(String),
}

/// Request to upload an object.
#[derive(Debug)]
pub struct PutObjectRequest {
    /// Target bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Payload source.
    pub source: ObjectSource,
    /// Canned ACL.
    pub acl: CannedAcl,
    /// Content type. Falls back to a `Content-Type` entry in `headers`, then a
    /// lookup by file extension, then `application/octet-stream`.
    pub content_type: Option<String>,
    /// `Content-MD5` handling.
    pub md5: Md5Policy,
    /// Extra request headers (`Content-Disposition`, `Cache-Control`, ...).
    pub headers: Vec<(String, String)>,
    /// User metadata, sent as `x-amz-meta-{name}`.
    pub metadata: Vec<(String, String)>,
}

impl PutObjectRequest {
    /// Create a request with an explicit source.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, source: ObjectSource) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            source,
            acl: CannedAcl::Private,
            content_type: None,
            md5: Md5Policy::Compute,
            headers: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Upload in-memory data.
    pub fn from_bytes(
        bucket: impl Into<String>,
        key: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self::new(bucket, key, ObjectSource::Bytes(data.into()))
    }

    /// Upload a local file.
    pub fn from_file(
        bucket: impl Into<String>,
        key: impl Into<String>,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self::new(bucket, key, ObjectSource::File(path.into()))
    }

    /// Upload from a reader of known length.
    pub fn from_reader(
        bucket: impl Into<String>,
        key: impl Into<String>,
        reader: BodyReader,
        length: u64,
    ) -> Self {
        Self::new(bucket, key, ObjectSource::Reader { reader, length })
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Set the MD5 policy.
    pub fn with_md5(mut self, md5: Md5Policy) -> Self {
        self.md5 = md5;
        self
    }

    /// Add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((name.into(), value.into()));
        self
    }
}

/// Request to copy an object server-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyObjectRequest {
    /// Source bucket.
    pub source_bucket: String,
    /// Source key.
    pub source_key: String,
    /// Destination bucket.
    pub bucket: String,
    /// Destination key.
    pub key: String,
    /// Canned ACL of the copy.
    pub acl: CannedAcl,
    /// Replacement request headers.
    pub headers: Vec<(String, String)>,
    /// Replacement metadata.
    pub metadata: Vec<(String, String)>,
}

impl CopyObjectRequest {
    /// Create a copy request keeping the source metadata.
    pub fn new(
        source_bucket: impl Into<String>,
        source_key: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            source_bucket: source_bucket.into(),
            source_key: source_key.into(),
            bucket: bucket.into(),
            key: key.into(),
            acl: CannedAcl::Private,
            headers: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Add a replacement header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a replacement metadata entry.
    pub fn with_metadata(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push((name.into(), value.into()));
        self
    }

    /// Whether the copy replaces the source metadata.
    pub fn replaces_metadata(&self) -> bool {
        !self.headers.is_empty() || !self.metadata.is_empty()
    }
}

/// Request for a query-string authenticated GET URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignGetRequest {
    /// Bucket name.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// URL lifetime.
    pub expires_in: Duration,
    /// Use the bucket name itself as the host name (CNAME buckets).
    pub host_bucket: bool,
    /// Use HTTPS.
    pub https: bool,
}

impl PresignGetRequest {
    /// Create a request for an HTTP URL on the bucket's virtual host.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            expires_in,
            host_bucket: false,
            https: false,
        }
    }

    /// Use the bucket name as the host name.
    pub fn with_host_bucket(mut self, host_bucket: bool) -> Self {
        self.host_bucket = host_bucket;
        self
    }

    /// Use HTTPS.
    pub fn with_https(mut self, https: bool) -> Self {
        self.https = https;
        self
    }
}

/// What the service does after a successful browser upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuccessAction {
    /// Answer with this status (200 or 201).
    Status(u16),
    /// Redirect to this URL.
    Redirect(String),
}

impl Default for SuccessAction {
    fn default() -> Self {
        SuccessAction::Status(201)
    }
}

/// Request for browser form-upload parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostPolicyRequest {
    /// Bucket name.
    pub bucket: String,
    /// Required key prefix of uploaded objects.
    pub key_prefix: String,
    /// Canned ACL of uploaded objects.
    pub acl: CannedAcl,
    /// Policy lifetime.
    pub lifetime: Duration,
    /// Maximum upload size in bytes.
    pub max_file_size: u64,
    /// Post-upload behaviour.
    pub success_action: SuccessAction,
    /// `x-amz-*` fields fixed by the policy.
    pub amz_headers: Vec<(String, String)>,
    /// Request header fields the form may set.
    pub headers: Vec<(String, String)>,
    /// Allow the extra `Filename` field some upload widgets post. The policy
    /// condition is on `$Filename`, so the form field must use that exact case.
    pub filename_condition: bool,
}

impl PostPolicyRequest {
    /// Create a request with a one hour lifetime and a 5 MiB limit.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key_prefix: String::new(),
            acl: CannedAcl::Private,
            lifetime: Duration::from_secs(3600),
            max_file_size: DEFAULT_POST_MAX_FILE_SIZE,
            success_action: SuccessAction::default(),
            amz_headers: Vec::new(),
            headers: Vec::new(),
            filename_condition: false,
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the canned ACL.
    pub fn with_acl(mut self, acl: CannedAcl) -> Self {
        self.acl = acl;
        self
    }

    /// Set the policy lifetime.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// Set the maximum upload size.
    pub fn with_max_file_size(mut self, max: u64) -> Self {
        self.max_file_size = max;
        self
    }

    /// Set the success behaviour.
    pub fn with_success_action(mut self, action: SuccessAction) -> Self {
        self.success_action = action;
        self
    }

    /// Add a fixed `x-amz-*` field.
    pub fn with_amz_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.amz_headers.push((name.into(), value.into()));
        self
    }

    /// Add a header field.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Allow the `Filename` form field (matched as `$Filename` in the policy).
    pub fn with_filename_condition(mut self, allow: bool) -> Self {
        self.filename_condition = allow;
        self
    }
}

/// Request to create a CDN distribution for a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDistributionRequest {
    /// Origin bucket.
    pub bucket: String,
    /// Serve requests once deployed.
    pub enabled: bool,
    /// Alternate domain names.
    pub cnames: Vec<String>,
    /// Comment.
    pub comment: String,
}

impl CreateDistributionRequest {
    /// Create an enabled distribution without aliases.
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            enabled: true,
            cnames: Vec::new(),
            comment: String::new(),
        }
    }

    /// Set whether the distribution is enabled.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add an alternate domain name.
    pub fn with_cname(mut self, cname: impl Into<String>) -> Self {
        self.cnames.push(cname.into());
        self
    }

    /// Set the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_objects_request_builder() {
        let request = ListObjectsRequest::new("bucket")
            .with_prefix("logs/")
            .with_delimiter("/")
            .with_common_prefixes(true);

        assert_eq!(request.bucket, "bucket");
        assert_eq!(request.prefix.as_deref(), Some("logs/"));
        assert_eq!(request.max_keys, None);
        assert!(request.return_common_prefixes);
    }

    #[test]
    fn test_put_object_request_defaults() {
        let request = PutObjectRequest::from_bytes("bucket", "key", "hello");

        assert_eq!(request.acl, CannedAcl::Private);
        assert_eq!(request.md5, Md5Policy::Compute);
        assert!(format!("{:?}", request.source).contains("Bytes(5)"));
    }

    #[test]
    fn test_copy_replaces_metadata_only_when_overridden() {
        let plain = CopyObjectRequest::new("src", "a.txt", "dst", "b.txt");
        assert!(!plain.replaces_metadata());
        assert!(plain.clone().with_metadata("owner", "me").replaces_metadata());
        assert!(plain.with_header("Content-Type", "text/plain").replaces_metadata());
    }

    #[test]
    fn test_post_policy_defaults() {
        let request = PostPolicyRequest::new("bucket");
        assert_eq!(request.max_file_size, 5_242_880);
        assert_eq!(request.success_action, SuccessAction::Status(201));
        assert_eq!(request.lifetime, Duration::from_secs(3600));
    }
}
