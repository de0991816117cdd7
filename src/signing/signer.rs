//! Signature V2 signer implementation.

use super::sign_base64;
use crate::credentials::CredentialsProvider;
use crate::error::S3Error;
use async_trait::async_trait;
use std::sync::Arc;

/// A computed signature together with the key ID that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Access key ID the signature belongs to.
    pub access_key_id: String,
    /// Base64-encoded HMAC-SHA1 value.
    pub value: String,
}

impl Signature {
    /// `Authorization` header value: `AWS {access_key}:{signature}`.
    pub fn authorization(&self) -> String {
        format!("AWS {}:{}", self.access_key_id, self.value)
    }
}

/// Trait for request signers.
#[async_trait]
pub trait AwsSigner: Send + Sync {
    /// Sign a canonical string.
    async fn sign(&self, string_to_sign: &str) -> Result<Signature, S3Error>;
}

/// Signature V2 signer backed by a credentials provider.
pub struct AwsSignerV2 {
    credentials_provider: Arc<dyn CredentialsProvider>,
}

impl AwsSignerV2 {
    /// Create a new signer.
    pub fn new(credentials_provider: Arc<dyn CredentialsProvider>) -> Self {
        Self {
            credentials_provider,
        }
    }
}

#[async_trait]
impl AwsSigner for AwsSignerV2 {
    async fn sign(&self, string_to_sign: &str) -> Result<Signature, S3Error> {
        let credentials = self.credentials_provider.get_credentials().await?;
        let value = sign_base64(credentials.secret_access_key(), string_to_sign)?;
        Ok(Signature {
            access_key_id: credentials.access_key_id().to_string(),
            value,
        })
    }
}

impl std::fmt::Debug for AwsSignerV2 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsSignerV2")
            .field("credentials_provider", &self.credentials_provider.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{AwsCredentials, StaticCredentialsProvider};

    fn signer(access: &str, secret: &str) -> AwsSignerV2 {
        AwsSignerV2::new(Arc::new(StaticCredentialsProvider::new(AwsCredentials::new(
            access, secret,
        ))))
    }

    #[tokio::test]
    async fn test_sign_reference_request() {
        let signer = signer("AKID", "s3cr3t");
        let signature = signer
            .sign("GET\n\n\nTue, 01 Jan 2019 00:00:00 GMT\n/mybucket/key.txt")
            .await
            .unwrap();

        assert_eq!(signature.access_key_id, "AKID");
        assert_eq!(signature.value, "1fv+XVL+P0w7/0EnKNffpDZsQn8=");
        assert_eq!(
            signature.authorization(),
            "AWS AKID:1fv+XVL+P0w7/0EnKNffpDZsQn8="
        );
    }

    #[tokio::test]
    async fn test_sign_is_deterministic() {
        let signer = signer("AKID", "secret");
        let a = signer.sign("PUT\n\n\ndate\n/b/k").await.unwrap();
        let b = signer.sign("PUT\n\n\ndate\n/b/k").await.unwrap();
        let c = signer.sign("PUT\n\n\ndate\n/b/other").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[tokio::test]
    async fn test_sign_propagates_credential_errors() {
        let signer = signer("", "secret");
        assert!(matches!(
            signer.sign("GET").await,
            Err(S3Error::Credentials(_))
        ));
    }
}
