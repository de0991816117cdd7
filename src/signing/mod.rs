//! AWS Signature V2 signing primitives.
//!
//! Storage requests sign
//! `VERB\nContent-MD5\nContent-Type\nDate[\namz-headers]\nresource`; CDN
//! requests sign the Date header alone. Both use base64(HMAC-SHA1(secret, sts)).

mod canonical;
mod signer;

pub use canonical::{
    build_query_string, canonical_amz_headers, encode_object_key, encode_query_value,
    is_sub_resource, string_to_sign, SUB_RESOURCES,
};
pub use signer::{AwsSigner, AwsSignerV2, Signature};

use crate::error::{S3Error, SigningError, TransferError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;
use std::path::Path;
use tokio::io::AsyncReadExt;

type HmacSha1 = Hmac<Sha1>;

/// `Date` header format (RFC 2822, always GMT).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

const MD5_READ_BUFFER: usize = 64 * 1024;

/// Calculate HMAC-SHA1.
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Result<Vec<u8>, S3Error> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| {
        S3Error::Signing(SigningError::InvalidKey {
            message: e.to_string(),
        })
    })?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Sign a string with a secret key: base64(HMAC-SHA1(secret, string_to_sign)).
pub fn sign_base64(secret_key: &str, string_to_sign: &str) -> Result<String, S3Error> {
    let mac = hmac_sha1(secret_key.as_bytes(), string_to_sign.as_bytes())?;
    Ok(STANDARD.encode(mac))
}

/// Standard base64 encoding.
pub fn base64_encode(data: impl AsRef<[u8]>) -> String {
    STANDARD.encode(data)
}

/// Format a timestamp for the `Date` header.
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format(HTTP_DATE_FORMAT).to_string()
}

/// Parse an RFC 2822 date such as a `Last-Modified` header.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse an ISO 8601 timestamp as found in listing documents.
pub fn parse_iso8601(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Base64-encoded MD5 digest, the `Content-MD5` header value.
pub fn content_md5(data: &[u8]) -> String {
    STANDARD.encode(Md5::digest(data))
}

/// `Content-MD5` of a file, computed by reading it incrementally.
pub async fn file_content_md5(path: &Path) -> Result<String, S3Error> {
    let mut file = tokio::fs::File::open(path).await.map_err(|e| {
        S3Error::Transfer(TransferError::SourceRead {
            message: format!("{}: {}", path.display(), e),
        })
    })?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; MD5_READ_BUFFER];
    loop {
        let n = file.read(&mut buffer).await.map_err(|e| {
            S3Error::Transfer(TransferError::SourceRead {
                message: format!("{}: {}", path.display(), e),
            })
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(STANDARD.encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    #[test]
    fn test_sign_base64_known_vector() {
        // RFC 2202 test case 2 for HMAC-SHA1.
        let mac = hmac_sha1(b"Jefe", b"what do ya want for nothing?").unwrap();
        assert_eq!(
            mac,
            vec![
                0xef, 0xfc, 0xdf, 0x6a, 0xe5, 0xeb, 0x2f, 0xa2, 0xd2, 0x74, 0x16, 0xd5, 0xf1,
                0x84, 0xdf, 0x9c, 0x25, 0x9a, 0x7c, 0x79
            ]
        );
        assert_eq!(
            sign_base64("Jefe", "what do ya want for nothing?").unwrap(),
            "7/zfauXrL6LSdBbV8YTfnCWafHk="
        );
    }

    #[test]
    fn test_format_http_date() {
        let dt = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_http_date(&dt), "Tue, 01 Jan 2019 00:00:00 GMT");
    }

    #[test]
    fn test_parse_http_date_round_trip() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_http_date("Mon, 15 Jan 2024 10:30:00 GMT"), Some(dt));
        assert_eq!(parse_http_date("not a date"), None);
    }

    #[test]
    fn test_parse_iso8601() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        assert_eq!(parse_iso8601("2024-01-15T10:30:00.000Z"), Some(dt));
    }

    #[test]
    fn test_content_md5() {
        // md5("hello") = 5d41402abc4b2a76b9719d911017c592
        assert_eq!(content_md5(b"hello"), "XUFAKrxLKna5cZ2REBfFkg==");
        assert_eq!(content_md5(b""), "1B2M2Y8AsgTpgAmY7PhCfg==");
    }

    #[tokio::test]
    async fn test_file_content_md5_matches_in_memory() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data = vec![7u8; 200 * 1024];
        file.write_all(&data).unwrap();

        let from_file = file_content_md5(file.path()).await.unwrap();
        assert_eq!(from_file, content_md5(&data));
    }

    #[tokio::test]
    async fn test_file_content_md5_missing_file() {
        let result = file_content_md5(Path::new("/definitely/not/here.bin")).await;
        assert!(matches!(
            result,
            Err(S3Error::Transfer(TransferError::SourceRead { .. }))
        ));
    }
}
