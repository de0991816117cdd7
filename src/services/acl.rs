//! Access control policies of buckets and objects.

use crate::config::S3Config;
use crate::error::S3Error;
use crate::request::{S3Request, Verb};
use crate::signing::AwsSigner;
use crate::transport::{HttpTransport, RequestBody};
use crate::types::AccessControlPolicy;
use crate::xml;
use bytes::Bytes;
use std::sync::Arc;

/// Service for reading and writing access control policies.
///
/// An empty `key` addresses the bucket itself.
pub struct AclService {
    config: Arc<S3Config>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,
}

impl AclService {
    /// Create a new ACL service.
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

    /// Get the access control policy of a bucket or object.
    pub async fn get(&self, bucket: &str, key: &str) -> Result<AccessControlPolicy, S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Get, bucket, key);
        request.set_flag("acl");

        let response = request
            .send(self.transport.as_ref(), self.signer.as_ref(), None)
            .await?
            .ensure_status(&[200])?;
        xml::parse_access_control_policy(response.xml()?)
    }

    /// Replace the access control policy of a bucket or object.
    pub async fn set(
        &self,
        bucket: &str,
        key: &str,
        policy: &AccessControlPolicy,
    ) -> Result<(), S3Error> {
        let mut request = S3Request::new(&self.config, Verb::Put, bucket, key);
        request.set_flag("acl");
        request.set_header("Content-Type", "application/xml");
        request.set_body(RequestBody::Bytes(Bytes::from(
            xml::build_access_control_policy(policy),
        )));

        request
            .send(self.transport.as_ref(), self.signer.as_ref(), None)
            .await?
            .ensure_status(&[200])?;
        Ok(())
    }
}

impl std::fmt::Debug for AclService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AclService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
