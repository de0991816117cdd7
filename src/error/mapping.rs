//! Mapping from service error documents to typed errors.

use super::*;

/// Parsed error document (`<Error>` for storage, `<ErrorResponse><Error>` for the CDN).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDocument {
    /// Service error code (e.g., "NoSuchKey").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Resource reported by the service, if any.
    pub resource: Option<String>,
    /// Service request ID.
    pub request_id: Option<String>,
}

/// Coarse classification of provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// The bucket, key, or distribution does not exist.
    NotFound,
    /// Credentials were rejected or the caller lacks permission.
    AccessDenied,
    /// The resource exists in a conflicting state.
    Conflict,
    /// A conditional request failed (e.g. a stale `If-Match`).
    PreconditionFailed,
    /// The request was malformed.
    InvalidRequest,
    /// The service failed internally.
    ServerError,
    /// Code not recognised.
    Other,
}

impl ProviderErrorKind {
    /// Classify a provider error code, falling back to the HTTP status.
    pub fn from_code(code: &str, status: u16) -> Self {
        match code {
            "NoSuchBucket" | "NoSuchKey" | "NoSuchDistribution" | "NoSuchCloudFrontOriginAccessIdentity" => {
                ProviderErrorKind::NotFound
            }

            "AccessDenied" | "InvalidAccessKeyId" | "SignatureDoesNotMatch" | "AccountProblem"
            | "RequestTimeTooSkewed" | "MissingSecurityHeader" => ProviderErrorKind::AccessDenied,

            "BucketAlreadyExists" | "BucketAlreadyOwnedByYou" | "BucketNotEmpty"
            | "CNAMEAlreadyExists" | "DistributionAlreadyExists" | "DistributionNotDisabled"
            | "OperationAborted" => ProviderErrorKind::Conflict,

            "PreconditionFailed" | "InvalidIfMatchVersion" => ProviderErrorKind::PreconditionFailed,

            "InvalidBucketName" | "InvalidArgument" | "InvalidRequest" | "MalformedXML"
            | "MalformedACLError" | "InvalidDigest" | "BadDigest" | "EntityTooLarge"
            | "MissingContentLength" | "InvalidLocationConstraint" | "InvalidTargetBucketForLogging"
            | "InvalidOrigin" | "MalformedInput" => ProviderErrorKind::InvalidRequest,

            "InternalError" | "ServiceUnavailable" | "SlowDown" => ProviderErrorKind::ServerError,

            _ => match status {
                404 => ProviderErrorKind::NotFound,
                401 | 403 => ProviderErrorKind::AccessDenied,
                409 => ProviderErrorKind::Conflict,
                412 => ProviderErrorKind::PreconditionFailed,
                400 => ProviderErrorKind::InvalidRequest,
                500..=599 => ProviderErrorKind::ServerError,
                _ => ProviderErrorKind::Other,
            },
        }
    }
}

/// Map an error document to a provider error.
///
/// The document's `Resource` wins over the request's canonical resource.
pub fn map_error_document(document: ErrorDocument, status: u16, request_resource: &str) -> S3Error {
    S3Error::Provider(ProviderError {
        code: document.code,
        message: document.message,
        resource: document
            .resource
            .or_else(|| Some(request_resource.to_string())),
        status,
        request_id: document.request_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn document(code: &str, resource: Option<&str>) -> ErrorDocument {
        ErrorDocument {
            code: code.into(),
            message: "The specified key does not exist.".into(),
            resource: resource.map(String::from),
            request_id: Some("ABC123".into()),
        }
    }

    #[test]
    fn test_map_keeps_code_and_message() {
        let error = map_error_document(document("NoSuchKey", None), 404, "/bucket/key.txt");

        match error {
            S3Error::Provider(e) => {
                assert_eq!(e.code, "NoSuchKey");
                assert_eq!(e.message, "The specified key does not exist.");
                assert_eq!(e.resource.as_deref(), Some("/bucket/key.txt"));
                assert_eq!(e.request_id.as_deref(), Some("ABC123"));
                assert_eq!(e.status, 404);
            }
            _ => panic!("Expected S3Error::Provider"),
        }
    }

    #[test]
    fn test_map_prefers_document_resource() {
        let error = map_error_document(document("NoSuchKey", Some("/other")), 404, "/bucket/key");
        assert_eq!(error.resource(), Some("/other"));
    }

    #[test_case("NoSuchBucket", 404 => ProviderErrorKind::NotFound)]
    #[test_case("NoSuchDistribution", 404 => ProviderErrorKind::NotFound)]
    #[test_case("SignatureDoesNotMatch", 403 => ProviderErrorKind::AccessDenied)]
    #[test_case("BucketNotEmpty", 409 => ProviderErrorKind::Conflict)]
    #[test_case("PreconditionFailed", 412 => ProviderErrorKind::PreconditionFailed)]
    #[test_case("MalformedXML", 400 => ProviderErrorKind::InvalidRequest)]
    #[test_case("SlowDown", 503 => ProviderErrorKind::ServerError)]
    #[test_case("SomethingNew", 404 => ProviderErrorKind::NotFound)]
    #[test_case("SomethingNew", 418 => ProviderErrorKind::Other)]
    fn test_classification(code: &str, status: u16) -> ProviderErrorKind {
        ProviderErrorKind::from_code(code, status)
    }
}
