//! Bucket operations: listing, creation, deletion, location and access logging.

use super::AclService;
use crate::config::S3Config;
use crate::error::{ResponseError, S3Error};
use crate::request::{S3Request, Verb};
use crate::response::ResponseBody;
use crate::signing::AwsSigner;
use crate::transport::{HttpTransport, RequestBody};
use crate::types::*;
use crate::xml;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Service for bucket operations.
pub struct BucketsService {
    config: Arc<S3Config>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
}

impl BucketsService {
    /// Create a new buckets service.
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

    async fn send(&self, request: S3Request) -> Result<crate::response::S3Response, S3Error> {
        request
            .send(self.transport.as_ref(), self.signer.as_ref(), None)
            .await
    }

    /// List all buckets owned by the caller.
    pub async fn list(&self) -> Result<ListBucketsOutput, S3Error> {
        let request = S3Request::new(&self.config, Verb::Get, "", "");
        let response = self.send(request).await?.ensure_status(&[200])?;

        match &response.body {
            ResponseBody::Xml(root) => xml::parse_list_buckets(root),
            _ => Ok(ListBucketsOutput::default()),
        }
    }

    /// List a bucket's objects.
    ///
    /// Without `max_keys`, truncated listings are followed page by page until
    /// the service reports the listing complete. A failure on the first page
    /// is returned as an error; a failure on a later page ends the listing
    /// and is reported in [`ObjectListing::interrupted`], as is a truncated
    /// page whose marker does not move the listing forward.
    pub async fn list_objects(&self, request: ListObjectsRequest) -> Result<ObjectListing, S3Error> {
        let mut listing = ObjectListing::default();

        let page = self.fetch_page(&request, request.marker.as_deref()).await?;
        let mut marker = absorb_page(
            &mut listing,
            page,
            request.return_common_prefixes,
            request.marker.clone(),
        );

        if request.max_keys.is_some() {
            return Ok(listing);
        }

        while listing.is_truncated {
            let Some(next) = marker.clone() else {
                warn!(bucket = %request.bucket, "Truncated listing carried no marker");
                listing.interrupted = Some(listing_stalled("truncated listing carried no marker"));
                break;
            };

            match self.fetch_page(&request, Some(&next)).await {
                Ok(page) => {
                    marker = absorb_page(
                        &mut listing,
                        page,
                        request.return_common_prefixes,
                        Some(next.clone()),
                    );
                    if marker.as_deref() == Some(next.as_str()) && listing.is_truncated {
                        warn!(bucket = %request.bucket, marker = %next, "Listing marker did not advance");
                        listing.interrupted = Some(listing_stalled("listing marker did not advance"));
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        bucket = %request.bucket,
                        page = listing.pages + 1,
                        error = %e,
                        "Listing interrupted; returning entries gathered so far"
                    );
                    listing.interrupted = Some(e);
                    break;
                }
            }
        }

        Ok(listing)
    }

    async fn fetch_page(
        &self,
        request: &ListObjectsRequest,
        marker: Option<&str>,
    ) -> Result<ListingPage, S3Error> {
        let mut http = S3Request::new(&self.config, Verb::Get, &request.bucket, "");
        if let Some(prefix) = request.prefix.as_deref().filter(|p| !p.is_empty()) {
            http.set_parameter("prefix", prefix);
        }
        if let Some(marker) = marker.filter(|m| !m.is_empty()) {
            http.set_parameter("marker", marker);
        }
        if let Some(max_keys) = request.max_keys {
            http.set_parameter("max-keys", max_keys.to_string());
        }
        if let Some(delimiter) = request.delimiter.as_deref().filter(|d| !d.is_empty()) {
            http.set_parameter("delimiter", delimiter);
        }

        let response = self.send(http).await?.ensure_status(&[200])?;
        xml::parse_listing_page(response.xml()?)
    }

    /// Create a bucket.
    pub async fn create(&self, request: CreateBucketRequest) -> Result<(), S3Error> {
        let mut http = S3Request::new(&self.config, Verb::Put, &request.bucket, "");
        http.set_amz_header("x-amz-acl", request.acl.as_str());

        if let Some(location) = &request.location {
            http.set_header("Content-Type", "application/xml");
            http.set_body(RequestBody::Bytes(Bytes::from(
                xml::build_create_bucket_config(location),
            )));
        }

        self.send(http).await?.ensure_status(&[200])?;
        debug!(bucket = %request.bucket, "Created bucket");
        Ok(())
    }

    /// Delete an empty bucket.
    pub async fn delete(&self, bucket: &str) -> Result<(), S3Error> {
        let request = S3Request::new(&self.config, Verb::Delete, bucket, "");
        self.send(request).await?.ensure_status(&[204])?;
        Ok(())
    }

    /// Get a bucket's location constraint. Buckets without one report `US`.
    pub async fn location(&self, bucket: &str) -> Result<String, S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Get, bucket, "");
        request.set_flag("location");
        let response = self.send(request).await?.ensure_status(&[200])?;

        match &response.body {
            ResponseBody::Xml(root) => Ok(xml::parse_location(root)),
            _ => Ok("US".to_string()),
        }
    }

    /// Get the access logging configuration. `None` when logging is disabled.
    pub async fn logging(&self, bucket: &str) -> Result<Option<LoggingStatus>, S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Get, bucket, "");
        request.set_flag("logging");
        let response = self.send(request).await?.ensure_status(&[200])?;

        match &response.body {
            ResponseBody::Xml(root) => Ok(xml::parse_logging_status(root)),
            _ => Ok(None),
        }
    }

    /// Enable access logging into `target`, or disable it with `None`.
    ///
    /// The log delivery group is granted WRITE and READ_ACP on the target
    /// bucket first; the target ACL is only rewritten when a grant is missing.
    pub async fn set_logging(&self, bucket: &str, target: Option<LoggingTarget>) -> Result<(), S3Error> {
        let target = target.map(|t| {
            let prefix = t.prefix.unwrap_or_else(|| format!("{}-", bucket));
            (t.bucket, prefix)
        });

        if let Some((target_bucket, _)) = &target {
            self.grant_log_delivery(target_bucket).await?;
        }

        let document = xml::build_logging_status(
            target
                .as_ref()
                .map(|(b, p)| (b.as_str(), p.as_str())),
        );

        let mut request = S3Request::new(&self.config, Verb::Put, bucket, "");
        request.set_flag("logging");
        request.set_header("Content-Type", "application/xml");
        request.set_body(RequestBody::Bytes(Bytes::from(document)));
        self.send(request).await?.ensure_status(&[200])?;
        Ok(())
    }

    /// Disable access logging.
    pub async fn disable_logging(&self, bucket: &str) -> Result<(), S3Error> {
        self.set_logging(bucket, None).await
    }

    async fn grant_log_delivery(&self, target_bucket: &str) -> Result<(), S3Error> {
        let acl = AclService::new(
            self.config.clone(),
            self.transport.clone(),
            self.signer.clone(),
        );
        let mut policy = acl.get(target_bucket, "").await?;

        let grantee = Grantee::log_delivery();
        let mut changed = false;
        for permission in [Permission::Write, Permission::ReadAcp] {
            if !policy.has_grant(&grantee, permission) {
                policy.grants.push(Grant {
                    grantee: grantee.clone(),
                    permission,
                });
                changed = true;
            }
        }

        if changed {
            debug!(bucket = %target_bucket, "Granting log delivery access");
            acl.set(target_bucket, "", &policy).await?;
        }
        Ok(())
    }
}

fn listing_stalled(message: &str) -> S3Error {
    S3Error::Response(ResponseError::InvalidResponse {
        message: message.to_string(),
    })
}

/// Merge a page into the listing and return the marker to continue from.
/// A page without keys or `NextMarker` keeps `previous`.
fn absorb_page(
    listing: &mut ObjectListing,
    page: ListingPage,
    with_prefixes: bool,
    previous: Option<String>,
) -> Option<String> {
    let mut marker = previous;
    for object in page.objects {
        marker = Some(object.name.clone());
        listing
            .entries
            .insert(object.name.clone(), ListingEntry::Object(object));
    }
    if with_prefixes {
        for prefix in page.common_prefixes {
            listing
                .entries
                .insert(prefix.clone(), ListingEntry::Prefix(prefix));
        }
    }

    listing.pages += 1;
    listing.is_truncated = page.is_truncated;
    if page.next_marker.is_some() {
        marker = page.next_marker;
    }
    listing.next_marker = if listing.is_truncated { marker.clone() } else { None };
    marker
}

impl std::fmt::Debug for BucketsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str) -> ObjectInfo {
        ObjectInfo {
            name: name.into(),
            time: None,
            size: 1,
            hash: "h".into(),
        }
    }

    #[test]
    fn test_absorb_page_tracks_last_key() {
        let mut listing = ObjectListing::default();
        let marker = absorb_page(
            &mut listing,
            ListingPage {
                objects: vec![object("a"), object("b")],
                common_prefixes: vec!["dir/".into()],
                is_truncated: true,
                next_marker: None,
            },
            false,
            None,
        );

        assert_eq!(marker.as_deref(), Some("b"));
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.next_marker.as_deref(), Some("b"));
        assert_eq!(listing.pages, 1);
    }

    #[test]
    fn test_absorb_page_next_marker_overrides() {
        let mut listing = ObjectListing::default();
        let marker = absorb_page(
            &mut listing,
            ListingPage {
                objects: vec![object("a")],
                common_prefixes: vec!["dir/".into()],
                is_truncated: true,
                next_marker: Some("dir/".into()),
            },
            true,
            None,
        );

        assert_eq!(marker.as_deref(), Some("dir/"));
        assert_eq!(listing.common_prefixes().count(), 1);
    }

    #[test]
    fn test_absorb_page_complete_clears_marker() {
        let mut listing = ObjectListing::default();
        absorb_page(
            &mut listing,
            ListingPage {
                objects: vec![object("a")],
                ..ListingPage::default()
            },
            false,
            None,
        );
        assert!(!listing.is_truncated);
        assert_eq!(listing.next_marker, None);
    }

    #[test]
    fn test_absorb_empty_truncated_page_keeps_previous_marker() {
        let mut listing = ObjectListing::default();
        let marker = absorb_page(
            &mut listing,
            ListingPage {
                is_truncated: true,
                ..ListingPage::default()
            },
            false,
            Some("key-00999".into()),
        );

        assert_eq!(marker.as_deref(), Some("key-00999"));
        assert_eq!(listing.next_marker.as_deref(), Some("key-00999"));
    }
}
