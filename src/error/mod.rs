//! Error types for the S3/CDN client.
//!
//! Failures fall into four families: transport failures (the HTTP exchange
//! never completed), protocol failures (an unexpected status or an unreadable
//! body), provider failures (the service answered with an XML error document)
//! and precondition failures (raised before any network activity).

mod mapping;

pub use mapping::{map_error_document, ErrorDocument, ProviderErrorKind};

use thiserror::Error;

/// Top-level error type for the client.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Credential-related errors.
    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    /// Signature computation errors.
    #[error("Signing error: {0}")]
    Signing(#[from] SigningError),

    /// Precondition failures detected before the request was sent.
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Transport failures.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Error document returned by the service.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Unexpected status or unparseable response.
    #[error("Response error: {0}")]
    Response(#[from] ResponseError),

    /// Failures while moving payload bytes to or from local I/O.
    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),
}

impl S3Error {
    /// Returns the HTTP status code if the service answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            S3Error::Provider(e) => Some(e.status),
            S3Error::Response(ResponseError::UnexpectedStatus { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Returns the error code: the provider code or the transport failure code.
    pub fn code(&self) -> Option<&str> {
        match self {
            S3Error::Provider(e) => Some(e.code.as_str()),
            S3Error::Network(e) => Some(e.code()),
            _ => None,
        }
    }

    /// Returns the canonical resource the failing request addressed.
    pub fn resource(&self) -> Option<&str> {
        match self {
            S3Error::Provider(e) => e.resource.as_deref(),
            S3Error::Network(e) => e.resource(),
            S3Error::Response(ResponseError::UnexpectedStatus { resource, .. }) => {
                Some(resource.as_str())
            }
            _ => None,
        }
    }

    /// Returns the provider error classification, if this is a provider error.
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            S3Error::Provider(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Returns true when the addressed bucket, key or distribution does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            S3Error::Provider(e) => e.kind() == ProviderErrorKind::NotFound,
            S3Error::Response(ResponseError::UnexpectedStatus { status, .. }) => *status == 404,
            _ => false,
        }
    }

    /// Returns true when the error was raised before any network activity.
    pub fn is_precondition(&self) -> bool {
        matches!(self, S3Error::Request(_) | S3Error::Configuration(_))
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Invalid configuration value.
    #[error("Invalid configuration: {field} - {message}")]
    InvalidConfiguration {
        /// The configuration field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Host name that cannot be used to address the service.
    #[error("Invalid host '{host}': {details}")]
    InvalidHost {
        /// The offending host.
        host: String,
        /// Details about the validation error.
        details: String,
    },
}

/// Credential-related errors.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No credentials could be found.
    #[error("Credentials not found: no credentials could be loaded from any source")]
    NotFound,

    /// Credentials are invalid.
    #[error("Invalid credentials: {message}")]
    Invalid {
        /// Details about why credentials are invalid.
        message: String,
    },
}

/// Signature computation errors.
#[derive(Debug, Error)]
pub enum SigningError {
    /// The secret key could not be used as an HMAC key.
    #[error("Invalid signing key: {message}")]
    InvalidKey {
        /// Details about the key error.
        message: String,
    },

    /// Policy document could not be serialized for signing.
    #[error("Policy serialization failed: {message}")]
    PolicySerialization {
        /// Details about the serialization error.
        message: String,
    },
}

/// Precondition failures.
#[derive(Debug, Error)]
pub enum RequestError {
    /// General validation error.
    #[error("Validation error: {message}")]
    Validation {
        /// Details about the validation error.
        message: String,
    },

    /// No payload source or no usable length was supplied.
    #[error("Missing input parameters: {message}")]
    MissingInput {
        /// What was missing.
        message: String,
    },

    /// Input file could not be opened for reading.
    #[error("Unable to open input file '{path}': {message}")]
    SourceUnreadable {
        /// The input path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },

    /// Destination file could not be opened for writing.
    #[error("Unable to open save file for writing '{path}': {message}")]
    DestinationUnwritable {
        /// The destination path.
        path: String,
        /// Underlying I/O error.
        message: String,
    },
}

/// Transport failures. Each carries the canonical resource of the request.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection could not be established or was dropped.
    #[error("Connection failed for {resource}: {message}")]
    ConnectionFailed {
        /// Error message.
        message: String,
        /// Canonical resource of the request.
        resource: String,
    },

    /// Request timed out.
    #[error("Request timed out for {resource}: {message}")]
    Timeout {
        /// Error message.
        message: String,
        /// Canonical resource of the request.
        resource: String,
    },

    /// Request body could not be sent or response body could not be received.
    #[error("Body transfer failed for {resource}: {message}")]
    BodyFailed {
        /// Error message.
        message: String,
        /// Canonical resource of the request.
        resource: String,
    },

    /// The request could not be built by the HTTP client.
    #[error("Invalid request for {resource}: {message}")]
    InvalidRequest {
        /// Error message.
        message: String,
        /// Canonical resource of the request.
        resource: String,
    },

    /// TLS/SSL setup error.
    #[error("TLS error: {message}")]
    TlsError {
        /// Error message.
        message: String,
    },
}

impl NetworkError {
    /// Short failure code.
    pub fn code(&self) -> &str {
        match self {
            NetworkError::ConnectionFailed { .. } => "ConnectionFailed",
            NetworkError::Timeout { .. } => "Timeout",
            NetworkError::BodyFailed { .. } => "BodyFailed",
            NetworkError::InvalidRequest { .. } => "InvalidRequest",
            NetworkError::TlsError { .. } => "TlsError",
        }
    }

    /// Canonical resource of the failed request, when known.
    pub fn resource(&self) -> Option<&str> {
        match self {
            NetworkError::ConnectionFailed { resource, .. }
            | NetworkError::Timeout { resource, .. }
            | NetworkError::BodyFailed { resource, .. }
            | NetworkError::InvalidRequest { resource, .. } => Some(resource.as_str()),
            NetworkError::TlsError { .. } => None,
        }
    }
}

/// Error document returned by the storage or CDN service.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct ProviderError {
    /// Service error code (e.g. `NoSuchKey`).
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Resource named in the error document, or the request's canonical resource.
    pub resource: Option<String>,
    /// HTTP status of the response.
    pub status: u16,
    /// Service request ID, if reported.
    pub request_id: Option<String>,
}

impl ProviderError {
    /// Classify this error by its code.
    pub fn kind(&self) -> ProviderErrorKind {
        ProviderErrorKind::from_code(&self.code, self.status)
    }
}

/// Protocol-level response errors.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// The service answered with a status the operation does not accept.
    #[error("Unexpected HTTP status {status} for {resource}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Canonical resource of the request.
        resource: String,
    },

    /// XML parse error.
    #[error("XML parse error: {message}")]
    XmlParseError {
        /// Error message.
        message: String,
    },

    /// Invalid response format.
    #[error("Invalid response: {message}")]
    InvalidResponse {
        /// Error message.
        message: String,
    },

    /// Missing required field.
    #[error("Missing required field '{field}' in response")]
    MissingField {
        /// The missing field name.
        field: String,
    },
}

/// Local I/O failures while streaming a payload.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Reading the upload source failed.
    #[error("Failed to read upload source: {message}")]
    SourceRead {
        /// Error message.
        message: String,
    },

    /// Writing to the download sink failed.
    #[error("Failed to write to sink after {bytes_written} bytes: {message}")]
    SinkWrite {
        /// Bytes written before the failure.
        bytes_written: u64,
        /// Error message.
        message: String,
    },

    /// Upload source did not yield the declared number of bytes.
    #[error("Length mismatch: declared {declared} bytes, source produced {actual} bytes")]
    LengthMismatch {
        /// Declared payload length.
        declared: u64,
        /// Bytes actually produced.
        actual: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(code: &str, status: u16) -> S3Error {
        S3Error::Provider(ProviderError {
            code: code.to_string(),
            message: "message".to_string(),
            resource: Some("/bucket/key".to_string()),
            status,
            request_id: None,
        })
    }

    #[test]
    fn test_provider_error_accessors() {
        let err = provider("NoSuchKey", 404);
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.code(), Some("NoSuchKey"));
        assert_eq!(err.resource(), Some("/bucket/key"));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Provider error: [NoSuchKey] message");
    }

    #[test]
    fn test_network_error_accessors() {
        let err = S3Error::Network(NetworkError::Timeout {
            message: "deadline elapsed".into(),
            resource: "/bucket/key".into(),
        });
        assert_eq!(err.code(), Some("Timeout"));
        assert_eq!(err.resource(), Some("/bucket/key"));
        assert_eq!(err.status_code(), None);
        assert!(!err.is_precondition());
    }

    #[test]
    fn test_unexpected_status() {
        let err = S3Error::Response(ResponseError::UnexpectedStatus {
            status: 404,
            resource: "/bucket/".into(),
        });
        assert_eq!(err.status_code(), Some(404));
        assert!(err.is_not_found());
        assert!(err.code().is_none());
    }

    #[test]
    fn test_precondition_errors() {
        let err = S3Error::Request(RequestError::MissingInput {
            message: "no payload".into(),
        });
        assert!(err.is_precondition());
        assert!(err.to_string().contains("Missing input parameters"));
    }
}
