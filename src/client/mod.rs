//! Client entry point.
//!
//! [`S3ClientImpl`] owns the shared configuration, transport and signer and
//! hands out lazily constructed services.

use crate::config::S3Config;
use crate::error::S3Error;
use crate::services::{
    AclService, BucketsService, DistributionsService, ObjectsService, PresignService,
};
use crate::signing::{AwsSigner, AwsSignerV2};
use crate::transport::{HttpTransport, ReqwestTransport};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Client trait.
pub trait S3Client: Send + Sync {
    /// Get the objects service.
    fn objects(&self) -> &ObjectsService;

    /// Get the buckets service.
    fn buckets(&self) -> &BucketsService;

    /// Get the access control service.
    fn acl(&self) -> &AclService;

    /// Get the presign service.
    fn presign(&self) -> &PresignService;

    /// Get the CDN distributions service.
    fn distributions(&self) -> &DistributionsService;

    /// Get the client configuration.
    fn config(&self) -> &S3Config;
}

/// Client implementation.
pub struct S3ClientImpl {
    config: Arc<S3Config>,
    transport: Arc<dyn HttpTransport>,
    signer: Arc<dyn AwsSigner>,

    objects: OnceCell<ObjectsService>,
    buckets: OnceCell<BucketsService>,
    acl: OnceCell<AclService>,
    presign: OnceCell<PresignService>,
    distributions: OnceCell<DistributionsService>,
}

impl S3ClientImpl {
    /// Create a client signing with the configured credentials provider.
    pub fn new(config: S3Config, transport: Arc<dyn HttpTransport>) -> Self {
        let signer = Arc::new(AwsSignerV2::new(config.credentials_provider.clone()));
        Self::with_signer(config, transport, signer)
    }

    /// Create a client with an explicit signer.
    pub fn with_signer(
        config: S3Config,
        transport: Arc<dyn HttpTransport>,
        signer: Arc<dyn AwsSigner>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            signer,
            objects: OnceCell::new(),
            buckets: OnceCell::new(),
            acl: OnceCell::new(),
            presign: OnceCell::new(),
            distributions: OnceCell::new(),
        }
    }
}

impl S3Client for S3ClientImpl {
    fn objects(&self) -> &ObjectsService {
        self.objects.get_or_init(|| {
            ObjectsService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            )
        })
    }

    fn buckets(&self) -> &BucketsService {
        self.buckets.get_or_init(|| {
            BucketsService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            )
        })
    }

    fn acl(&self) -> &AclService {
        self.acl.get_or_init(|| {
            AclService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            )
        })
    }

    fn presign(&self) -> &PresignService {
        self.presign
            .get_or_init(|| PresignService::new(self.config.clone(), self.signer.clone()))
    }

    fn distributions(&self) -> &DistributionsService {
        self.distributions.get_or_init(|| {
            DistributionsService::new(
                self.config.clone(),
                self.transport.clone(),
                self.signer.clone(),
            )
        })
    }

    fn config(&self) -> &S3Config {
        &self.config
    }
}

impl std::fmt::Debug for S3ClientImpl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3ClientImpl")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for the client.
pub struct S3ClientBuilder {
    config: Option<S3Config>,
    from_env: bool,
    transport: Option<Arc<dyn HttpTransport>>,
    signer: Option<Arc<dyn AwsSigner>>,
}

impl S3ClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            config: None,
            from_env: false,
            transport: None,
            signer: None,
        }
    }

    /// Use the provided configuration.
    pub fn config(mut self, config: S3Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Use a custom HTTP transport.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom signer.
    pub fn signer(mut self, signer: Arc<dyn AwsSigner>) -> Self {
        self.signer = Some(signer);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<S3ClientImpl, S3Error> {
        let config = if let Some(config) = self.config {
            config
        } else if self.from_env {
            S3Config::builder().from_env().build()?
        } else {
            S3Config::default()
        };

        let transport = if let Some(transport) = self.transport {
            transport
        } else {
            let builder = ReqwestTransport::builder()
                .connect_timeout(config.connect_timeout)
                .read_timeout(config.read_timeout)
                .pool_max_idle_per_host(config.max_connections as usize)
                .pool_idle_timeout(Some(config.idle_timeout))
                .verify_ssl(config.verify_ssl)
                .user_agent(config.user_agent.clone())
                .upload_chunk_size(config.upload_chunk_size);

            Arc::new(builder.build()?)
        };

        Ok(match self.signer {
            Some(signer) => S3ClientImpl::with_signer(config, transport, signer),
            None => S3ClientImpl::new(config, transport),
        })
    }
}

impl Default for S3ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
