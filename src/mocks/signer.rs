//! Mock signer for testing.

use crate::error::S3Error;
use crate::signing::{AwsSigner, Signature};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Access key ID reported by [`MockSigner`].
pub const MOCK_ACCESS_KEY_ID: &str = "AKIDMOCK";

/// Signature value returned by [`MockSigner`].
pub const MOCK_SIGNATURE: &str = "mock-signature";

/// Mock signer for testing.
///
/// Records every string it is asked to sign and answers with a fixed
/// signature, or with a one-shot error.
pub struct MockSigner {
    error: Mutex<Option<S3Error>>,
    sign_count: AtomicUsize,
    signed: Mutex<Vec<String>>,
}

impl MockSigner {
    /// Create a new mock signer.
    pub fn new() -> Self {
        Self {
            error: Mutex::new(None),
            sign_count: AtomicUsize::new(0),
            signed: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock signer whose next call fails with `error`.
    pub fn with_error(error: S3Error) -> Self {
        let signer = Self::new();
        *signer.error.lock() = Some(error);
        signer
    }

    /// Set an error to return from the next call.
    pub fn set_error(&self, error: Option<S3Error>) {
        *self.error.lock() = error;
    }

    /// Get the number of sign calls.
    pub fn sign_count(&self) -> usize {
        self.sign_count.load(Ordering::Relaxed)
    }

    /// Get the recorded strings-to-sign.
    pub fn signed_strings(&self) -> Vec<String> {
        self.signed.lock().clone()
    }

    /// Get the last string-to-sign.
    pub fn last_signed(&self) -> Option<String> {
        self.signed.lock().last().cloned()
    }

    /// Clear recorded calls.
    pub fn clear(&self) {
        self.signed.lock().clear();
        self.sign_count.store(0, Ordering::Relaxed);
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AwsSigner for MockSigner {
    async fn sign(&self, string_to_sign: &str) -> Result<Signature, S3Error> {
        self.sign_count.fetch_add(1, Ordering::Relaxed);
        self.signed.lock().push(string_to_sign.to_string());

        if let Some(error) = self.error.lock().take() {
            return Err(error);
        }

        Ok(Signature {
            access_key_id: MOCK_ACCESS_KEY_ID.to_string(),
            value: MOCK_SIGNATURE.to_string(),
        })
    }
}

impl std::fmt::Debug for MockSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSigner")
            .field("sign_count", &self.sign_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CredentialsError;

    #[tokio::test]
    async fn test_mock_signer_sign() {
        let signer = MockSigner::new();

        let signature = signer.sign("GET\n\n\ndate\n/bucket/key").await.unwrap();

        assert_eq!(signature.authorization(), "AWS AKIDMOCK:mock-signature");
        assert_eq!(signer.sign_count(), 1);
        assert_eq!(
            signer.last_signed().as_deref(),
            Some("GET\n\n\ndate\n/bucket/key")
        );
    }

    #[tokio::test]
    async fn test_mock_signer_error_is_one_shot() {
        let signer = MockSigner::with_error(S3Error::Credentials(CredentialsError::NotFound));

        assert!(signer.sign("first").await.is_err());
        assert!(signer.sign("second").await.is_ok());
        assert_eq!(signer.signed_strings(), vec!["first", "second"]);
    }
}
