//! S3 and CDN REST client.
//!
//! Type-safe access to an S3-compatible storage service and its CDN
//! distribution API, signed with the HMAC-SHA1 (signature V2) scheme.
//!
//! # Features
//!
//! - **Buckets**: list, create, delete, location, access logging
//! - **Objects**: put from memory, file or stream; get to memory, writer or file; head, copy, delete
//! - **Listings**: transparent pagination with partial results on interruption
//! - **Access control**: read and write grant lists
//! - **Pre-signed access**: expiring GET URLs and browser form-upload policies
//! - **CDN**: create, read, update, delete and list distributions
//! - **Streaming**: bounded-memory uploads and downloads
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use s3_cdn::{S3Client, PutObjectRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), s3_cdn::S3Error> {
//!     let client = s3_cdn::create_client_from_env()?;
//!
//!     let output = client
//!         .objects()
//!         .put(PutObjectRequest::from_bytes("my-bucket", "hello.txt", b"Hello, S3!".to_vec()))
//!         .await?;
//!
//!     println!("Uploaded with ETag: {:?}", output.hash);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod mocks;
pub mod request;
pub mod response;
pub mod services;
pub mod signing;
pub mod transfer;
pub mod transport;
pub mod types;
pub mod xml;

// Re-export main types at crate root
pub use client::{S3Client, S3ClientBuilder, S3ClientImpl};
pub use config::S3Config;
pub use credentials::{
    AwsCredentials, CredentialsProvider, EnvCredentialsProvider, StaticCredentialsProvider,
};
pub use error::{
    ConfigurationError, CredentialsError, NetworkError, ProviderError, ProviderErrorKind,
    RequestError, ResponseError, S3Error, SigningError, TransferError,
};
pub use request::{S3Request, Verb};
pub use response::{MetaValue, ResponseBody, ResponseHeaders, S3Response};
pub use services::{
    AclService, BucketsService, DistributionsService, ObjectsService, PresignService,
};
pub use signing::{AwsSigner, AwsSignerV2};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, RequestBody};
pub use types::{
    // Request types
    CopyObjectRequest,
    CreateBucketRequest,
    CreateDistributionRequest,
    ListObjectsRequest,
    Md5Policy,
    ObjectSource,
    PostPolicyRequest,
    PresignGetRequest,
    PutObjectRequest,
    SuccessAction,
    // Response types
    CopyObjectOutput,
    DownloadOutput,
    GetObjectOutput,
    ListBucketsOutput,
    ObjectListing,
    PostUploadParams,
    PresignedUrl,
    PutObjectOutput,
    // Common types
    AccessControlPolicy,
    Bucket,
    CannedAcl,
    Distribution,
    DistributionConfig,
    Grant,
    Grantee,
    ListingEntry,
    LoggingStatus,
    LoggingTarget,
    ObjectInfo,
    Owner,
    Permission,
};

/// Create a new client from environment variables.
///
/// Reads:
/// - `AWS_ACCESS_KEY_ID` and `AWS_SECRET_ACCESS_KEY` for credentials
/// - `S3_INTEGRATION_HOST` / `S3_INTEGRATION_CDN_HOST` for custom endpoints
/// - `S3_INTEGRATION_USE_SSL` and `S3_INTEGRATION_PATH_STYLE` for addressing
///
/// # Example
///
/// ```rust,no_run
/// let client = s3_cdn::create_client_from_env()?;
/// # Ok::<(), s3_cdn::S3Error>(())
/// ```
pub fn create_client_from_env() -> Result<impl S3Client> {
    S3ClientBuilder::new().from_env().build()
}

/// Create a new client with explicit configuration.
///
/// # Example
///
/// ```rust,no_run
/// use s3_cdn::{S3Config, AwsCredentials};
///
/// let config = S3Config::builder()
///     .host("s3.amazonaws.com")
///     .credentials(AwsCredentials::new("AKID", "SECRET"))
///     .build()?;
///
/// let client = s3_cdn::create_client(config)?;
/// # Ok::<(), s3_cdn::S3Error>(())
/// ```
pub fn create_client(config: S3Config) -> Result<impl S3Client> {
    S3ClientBuilder::new().config(config).build()
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, S3Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        let _ = std::any::type_name::<S3Error>();
        let _ = std::any::type_name::<S3Config>();
        let _ = std::any::type_name::<AwsCredentials>();
        let _ = std::any::type_name::<PutObjectRequest>();
        let _ = std::any::type_name::<ObjectListing>();
        let _ = std::any::type_name::<Distribution>();
    }
}
