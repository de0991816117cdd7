//! Environment variable credentials provider.

use super::{AwsCredentials, CredentialsProvider};
use crate::error::{CredentialsError, S3Error};
use async_trait::async_trait;
use std::env;

/// Default variable holding the access key ID.
pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
/// Default variable holding the secret access key.
pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";

/// Credentials provider that reads from environment variables.
///
/// Variables are read on every call, so rotating them takes effect on the
/// next signed request.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialsProvider {
    access_key_var: Option<String>,
    secret_key_var: Option<String>,
}

impl EnvCredentialsProvider {
    /// Create a provider reading `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with custom variable names.
    pub fn with_vars(access_key_var: impl Into<String>, secret_key_var: impl Into<String>) -> Self {
        Self {
            access_key_var: Some(access_key_var.into()),
            secret_key_var: Some(secret_key_var.into()),
        }
    }

    fn access_key_var(&self) -> &str {
        self.access_key_var.as_deref().unwrap_or(AWS_ACCESS_KEY_ID)
    }

    fn secret_key_var(&self) -> &str {
        self.secret_key_var.as_deref().unwrap_or(AWS_SECRET_ACCESS_KEY)
    }

    fn read(var: &str) -> Result<String, S3Error> {
        let value = env::var(var).map_err(|_| S3Error::Credentials(CredentialsError::NotFound))?;
        if value.is_empty() {
            return Err(S3Error::Credentials(CredentialsError::Invalid {
                message: format!("{} is empty", var),
            }));
        }
        Ok(value)
    }
}

#[async_trait]
impl CredentialsProvider for EnvCredentialsProvider {
    async fn get_credentials(&self) -> Result<AwsCredentials, S3Error> {
        let access_key_id = Self::read(self.access_key_var())?;
        let secret_access_key = Self::read(self.secret_key_var())?;
        Ok(AwsCredentials::new(access_key_id, secret_access_key))
    }

    fn name(&self) -> &'static str {
        "environment"
    }
}
