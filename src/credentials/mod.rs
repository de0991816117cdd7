//! Access credentials for request signing.
//!
//! Signature V2 needs only an access key ID and a secret key; the secret is
//! held in a [`SecretString`] and never printed.

mod env;

pub use env::EnvCredentialsProvider;

use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Access key pair.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
}

impl AwsCredentials {
    /// Create new credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
        }
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    ///
    /// Note: This exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Reject empty key material.
    pub fn validate(&self) -> Result<(), S3Error> {
        if self.access_key_id.is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: "access key ID is empty".to_string(),
            }));
        }
        if self.secret_access_key().is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: "secret access key is empty".to_string(),
            }));
        }
        Ok(())
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .finish()
    }
}

/// Trait for credential providers.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials from this provider.
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error>;

    /// Provider name for logging/debugging.
    fn name(&self) -> &'static str;
}

/// Credentials fixed at construction time.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        self.credentials.validate()?;
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}
