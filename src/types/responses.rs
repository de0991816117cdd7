//! Response types for storage and CDN operations.

use super::common::*;
use crate::error::S3Error;
use crate::response::ResponseHeaders;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Output of listing all buckets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListBucketsOutput {
    /// Account owner.
    pub owner: Option<Owner>,
    /// Buckets.
    pub buckets: Vec<Bucket>,
}

impl ListBucketsOutput {
    /// Bucket names only.
    pub fn names(&self) -> Vec<&str> {
        self.buckets.iter().map(|b| b.name.as_str()).collect()
    }
}

/// Accumulated result of a (possibly multi-page) object listing.
#[derive(Debug, Default)]
pub struct ObjectListing {
    /// Entries keyed by object key or common prefix.
    pub entries: BTreeMap<String, ListingEntry>,
    /// Whether the last page fetched was truncated.
    pub is_truncated: bool,
    /// Marker to continue from.
    pub next_marker: Option<String>,
    /// Number of pages fetched.
    pub pages: u32,
    /// Error that stopped pagination early, if any. The entries gathered
    /// before the failure are kept.
    pub interrupted: Option<S3Error>,
}

impl ObjectListing {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the listing has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether pagination ran to the end without being interrupted.
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }

    /// Object summaries in key order.
    pub fn objects(&self) -> impl Iterator<Item = &ObjectInfo> {
        self.entries.values().filter_map(ListingEntry::as_object)
    }

    /// Common prefixes in order.
    pub fn common_prefixes(&self) -> impl Iterator<Item = &str> {
        self.entries.values().filter_map(|entry| match entry {
            ListingEntry::Prefix(prefix) => Some(prefix.as_str()),
            ListingEntry::Object(_) => None,
        })
    }
}

/// One parsed page of an object listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Objects on this page, in document order.
    pub objects: Vec<ObjectInfo>,
    /// Common prefixes on this page.
    pub common_prefixes: Vec<String>,
    /// `IsTruncated` flag.
    pub is_truncated: bool,
    /// Explicit `NextMarker`, when present.
    pub next_marker: Option<String>,
}

/// Output of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObjectOutput {
    /// ETag of the stored object.
    pub hash: Option<String>,
}

/// Object fetched into memory.
#[derive(Debug, Clone)]
pub struct GetObjectOutput {
    /// Captured response headers.
    pub headers: ResponseHeaders,
    /// Object data.
    pub body: Bytes,
}

/// Object streamed to a sink.
#[derive(Debug, Clone)]
pub struct DownloadOutput {
    /// Captured response headers.
    pub headers: ResponseHeaders,
    /// Bytes written to the sink.
    pub bytes_written: u64,
}

/// Output of a server-side copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyObjectOutput {
    /// Modification time of the copy.
    pub last_modified: Option<DateTime<Utc>>,
    /// ETag of the copy, without quotes.
    pub hash: String,
}

/// Query-string authenticated URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    /// The URL.
    pub url: String,
    /// Expiration time.
    pub expires: DateTime<Utc>,
}

impl PresignedUrl {
    /// Whether the URL has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires
    }
}

/// Form fields for a browser upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostUploadParams {
    /// Form fields, the `file` field excluded.
    pub fields: BTreeMap<String, String>,
    /// Policy expiration.
    pub expires: DateTime<Utc>,
}

impl PostUploadParams {
    /// Value of a form field.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}
