//! Configuration types for the client.
//!
//! [`S3Config`] is constructed once and shared by `Arc` with every service;
//! it replaces process-wide credential and TLS state.

use crate::credentials::{
    AwsCredentials, CredentialsProvider, EnvCredentialsProvider, StaticCredentialsProvider,
};
use crate::error::{ConfigurationError, S3Error};
use std::sync::Arc;
use std::time::Duration;

/// Default storage endpoint host.
pub const DEFAULT_HOST: &str = "s3.amazonaws.com";

/// Default CDN control API host.
pub const DEFAULT_CDN_HOST: &str = "cloudfront.amazonaws.com";

/// Default size of chunks read from upload sources.
pub const DEFAULT_UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

const MAX_UPLOAD_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Configuration for the client.
#[derive(Clone)]
pub struct S3Config {
    /// Credentials provider.
    pub credentials_provider: Arc<dyn CredentialsProvider>,

    /// Use HTTPS for storage requests. CDN requests always use HTTPS.
    pub use_ssl: bool,

    /// Storage endpoint host (e.g. `s3.amazonaws.com` or `localhost:9000`).
    pub host: String,

    /// CDN control API host.
    pub cdn_host: String,

    /// Use path-style addressing instead of virtual-hosted style.
    ///
    /// Path-style: `https://s3.amazonaws.com/bucket/key`
    /// Virtual-hosted: `https://bucket.s3.amazonaws.com/key`
    pub path_style: bool,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// Timeout for a whole request, body included.
    pub read_timeout: Duration,

    /// Maximum idle connections kept per host.
    pub max_connections: u32,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Verify SSL certificates.
    pub verify_ssl: bool,

    /// User-Agent header value.
    pub user_agent: String,

    /// Size of chunks read from upload sources.
    pub upload_chunk_size: usize,
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("use_ssl", &self.use_ssl)
            .field("host", &self.host)
            .field("cdn_host", &self.cdn_host)
            .field("path_style", &self.path_style)
            .field("connect_timeout", &self.connect_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("max_connections", &self.max_connections)
            .field("verify_ssl", &self.verify_ssl)
            .field("user_agent", &self.user_agent)
            .field("upload_chunk_size", &self.upload_chunk_size)
            // Intentionally omit credentials_provider for security
            .finish_non_exhaustive()
    }
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            credentials_provider: Arc::new(EnvCredentialsProvider::new()),
            use_ssl: true,
            host: DEFAULT_HOST.to_string(),
            cdn_host: DEFAULT_CDN_HOST.to_string(),
            path_style: false,
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(300),
            max_connections: 32,
            idle_timeout: Duration::from_secs(90),
            verify_ssl: true,
            user_agent: format!("s3-cdn/{}", env!("CARGO_PKG_VERSION")),
            upload_chunk_size: DEFAULT_UPLOAD_CHUNK_SIZE,
        }
    }
}

impl S3Config {
    /// Create a new configuration builder.
    pub fn builder() -> S3ConfigBuilder {
        S3ConfigBuilder::default()
    }

    /// URL scheme for storage requests.
    pub fn scheme(&self) -> &'static str {
        if self.use_ssl {
            "https"
        } else {
            "http"
        }
    }

    /// Host addressing `bucket`, honouring path-style addressing.
    pub fn bucket_host(&self, bucket: &str) -> String {
        if bucket.is_empty() || self.path_style {
            self.host.clone()
        } else {
            format!("{}.{}", bucket, self.host)
        }
    }
}

/// Builder for client configuration.
#[derive(Default)]
pub struct S3ConfigBuilder {
    credentials_provider: Option<Arc<dyn CredentialsProvider>>,
    use_ssl: Option<bool>,
    host: Option<String>,
    cdn_host: Option<String>,
    path_style: Option<bool>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    max_connections: Option<u32>,
    idle_timeout: Option<Duration>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
    upload_chunk_size: Option<usize>,
}

impl S3ConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the credentials provider.
    pub fn credentials_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.credentials_provider = Some(provider);
        self
    }

    /// Use fixed credentials.
    pub fn credentials(self, credentials: AwsCredentials) -> Self {
        self.credentials_provider(Arc::new(StaticCredentialsProvider::new(credentials)))
    }

    /// Enable or disable HTTPS for storage requests.
    pub fn use_ssl(mut self, enabled: bool) -> Self {
        self.use_ssl = Some(enabled);
        self
    }

    /// Set the storage endpoint host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the CDN control API host.
    pub fn cdn_host(mut self, host: impl Into<String>) -> Self {
        self.cdn_host = Some(host.into());
        self
    }

    /// Enable path-style addressing.
    pub fn path_style(mut self, enabled: bool) -> Self {
        self.path_style = Some(enabled);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the request timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the maximum idle connections per host.
    pub fn max_connections(mut self, connections: u32) -> Self {
        self.max_connections = Some(connections);
        self
    }

    /// Set the idle connection timeout.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Enable or disable SSL verification.
    pub fn verify_ssl(mut self, verify: bool) -> Self {
        self.verify_ssl = Some(verify);
        self
    }

    /// Set the User-Agent header value.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set the size of chunks read from upload sources.
    pub fn upload_chunk_size(mut self, size: usize) -> Self {
        self.upload_chunk_size = Some(size);
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Self {
        if let Ok(host) = std::env::var("S3_INTEGRATION_HOST") {
            if !host.is_empty() {
                self.host = Some(host);
            }
        }
        if let Ok(host) = std::env::var("S3_INTEGRATION_CDN_HOST") {
            if !host.is_empty() {
                self.cdn_host = Some(host);
            }
        }
        if let Ok(val) = std::env::var("S3_INTEGRATION_USE_SSL") {
            self.use_ssl = Some(val.to_lowercase() != "false");
        }
        if let Ok(val) = std::env::var("S3_INTEGRATION_PATH_STYLE") {
            self.path_style = Some(val.to_lowercase() == "true");
        }
        if let Ok(val) = std::env::var("S3_INTEGRATION_TIMEOUT_MS") {
            if let Ok(ms) = val.parse() {
                self.read_timeout = Some(Duration::from_millis(ms));
            }
        }
        if let Ok(val) = std::env::var("S3_INTEGRATION_UPLOAD_CHUNK_SIZE") {
            if let Ok(size) = val.parse() {
                self.upload_chunk_size = Some(size);
            }
        }

        self
    }

    /// Build the configuration.
    pub fn build(self) -> Result<S3Config, S3Error> {
        let defaults = S3Config::default();

        let host = self.host.unwrap_or(defaults.host);
        validate_host(&host)?;
        let cdn_host = self.cdn_host.unwrap_or(defaults.cdn_host);
        validate_host(&cdn_host)?;

        let upload_chunk_size = self.upload_chunk_size.unwrap_or(defaults.upload_chunk_size);
        if upload_chunk_size == 0 || upload_chunk_size > MAX_UPLOAD_CHUNK_SIZE {
            return Err(S3Error::Configuration(
                ConfigurationError::InvalidConfiguration {
                    field: "upload_chunk_size".to_string(),
                    message: format!(
                        "Chunk size must be between 1 and {} bytes",
                        MAX_UPLOAD_CHUNK_SIZE
                    ),
                },
            ));
        }

        Ok(S3Config {
            credentials_provider: self
                .credentials_provider
                .unwrap_or(defaults.credentials_provider),
            use_ssl: self.use_ssl.unwrap_or(defaults.use_ssl),
            host,
            cdn_host,
            path_style: self.path_style.unwrap_or(defaults.path_style),
            connect_timeout: self.connect_timeout.unwrap_or(defaults.connect_timeout),
            read_timeout: self.read_timeout.unwrap_or(defaults.read_timeout),
            max_connections: self.max_connections.unwrap_or(defaults.max_connections),
            idle_timeout: self.idle_timeout.unwrap_or(defaults.idle_timeout),
            verify_ssl: self.verify_ssl.unwrap_or(defaults.verify_ssl),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            upload_chunk_size,
        })
    }
}

fn validate_host(host: &str) -> Result<(), S3Error> {
    let invalid = |details: &str| {
        Err(S3Error::Configuration(ConfigurationError::InvalidHost {
            host: host.to_string(),
            details: details.to_string(),
        }))
    };

    if host.is_empty() {
        return invalid("host must not be empty");
    }
    if host.contains("://") {
        return invalid("host must not include a scheme; use use_ssl instead");
    }
    if host.contains('/') || host.contains('?') {
        return invalid("host must not include a path or query");
    }
    Ok(())
}
