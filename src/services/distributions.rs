//! CDN distribution management.
//!
//! All calls go to the CDN control API over HTTPS and are signed over the
//! `Date` header only. Updates and deletes are conditional on the ETag
//! captured when the distribution was last read.

use crate::config::{S3Config, DEFAULT_HOST};
use crate::error::{RequestError, S3Error};
use crate::request::{S3Request, Verb};
use crate::response::S3Response;
use crate::signing::AwsSigner;
use crate::transport::{HttpTransport, RequestBody};
use crate::types::*;
use crate::xml;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// CDN API version path segment.
pub const CDN_API_VERSION: &str = "2008-06-30";

/// Service for CDN distributions.
pub struct DistributionsService {
    config: Arc<S3Config>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
}

impl DistributionsService {
    /// Create a new distributions service.
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

    fn request(&self, verb: Verb, path: &str) -> S3Request {
        S3Request::cdn(
            &self.config,
            verb,
            &format!("{}/distribution{}", CDN_API_VERSION, path),
        )
    }

    async fn send(&self, request: S3Request) -> Result<S3Response, S3Error> {
        request
            .send(self.transport.as_ref(), self.signer.as_ref(), None)
            .await
    }

    fn read_distribution(response: &S3Response) -> Result<Distribution, S3Error> {
        let mut distribution = xml::parse_distribution(response.xml()?)?;
        distribution.hash = response.headers.hash.clone();
        Ok(distribution)
    }

    fn if_match(distribution: &Distribution) -> Result<&str, S3Error> {
        distribution.hash.as_deref().ok_or_else(|| {
            S3Error::Request(RequestError::MissingInput {
                message: format!("distribution {} has no ETag; fetch it first", distribution.id),
            })
        })
    }

    /// Create a distribution serving `request.bucket`.
    pub async fn create(&self, request: CreateDistributionRequest) -> Result<Distribution, S3Error> {
        let config = DistributionConfig {
            origin: format!("{}.{}", request.bucket, DEFAULT_HOST),
            caller_reference: uuid::Uuid::new_v4().to_string(),
            cnames: request.cnames,
            comment: request.comment,
            enabled: request.enabled,
        };

        let mut http = self.request(Verb::Post, "");
        http.set_header("Content-Type", "application/xml");
        http.set_body(RequestBody::Bytes(Bytes::from(
            xml::build_distribution_config(&config),
        )));

        let response = self.send(http).await?.ensure_status(&[201])?;
        let distribution = Self::read_distribution(&response)?;
        debug!(id = %distribution.id, origin = %config.origin, "Created distribution");
        Ok(distribution)
    }

    /// Get a distribution, including the ETag needed to change it.
    pub async fn get(&self, id: &str) -> Result<Distribution, S3Error> {
        let request = self.request(Verb::Get, &format!("/{}", id));
        let response = self.send(request).await?.ensure_status(&[200])?;
        Self::read_distribution(&response)
    }

    /// Replace a distribution's configuration with `distribution.config`.
    pub async fn update(&self, distribution: &Distribution) -> Result<Distribution, S3Error> {
        let etag = Self::if_match(distribution)?;

        let mut http = self.request(Verb::Put, &format!("/{}/config", distribution.id));
        http.set_header("If-Match", etag);
        http.set_header("Content-Type", "application/xml");
        http.set_body(RequestBody::Bytes(Bytes::from(
            xml::build_distribution_config(&distribution.config),
        )));

        let response = self.send(http).await?.ensure_status(&[200])?;
        let root = response.xml()?;
        let mut updated = if root.name == "DistributionConfig" {
            Distribution {
                config: xml::parse_distribution_config(root),
                ..distribution.clone()
            }
        } else {
            xml::parse_distribution(root)?
        };
        updated.hash = response.headers.hash.clone();
        Ok(updated)
    }

    /// Delete a disabled distribution.
    pub async fn delete(&self, distribution: &Distribution) -> Result<(), S3Error> {
        let etag = Self::if_match(distribution)?;

        let mut http = self.request(Verb::Delete, &format!("/{}", distribution.id));
        http.set_header("If-Match", etag);
        self.send(http).await?.ensure_status(&[204])?;
        Ok(())
    }

    /// List distributions keyed by ID.
    pub async fn list(&self) -> Result<BTreeMap<String, Distribution>, S3Error> {
        let request = self.request(Verb::Get, "");
        let response = self.send(request).await?.ensure_status(&[200])?;

        Ok(xml::parse_distribution_list(response.xml()?)?
            .into_iter()
            .map(|d| (d.id.clone(), d))
            .collect())
    }
}

impl std::fmt::Debug for DistributionsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionsService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
