//! End-to-end signing tests against known signatures.

use bytes::Bytes;
use chrono::{DateTime, TimeZone, Utc};
use proptest::prelude::*;
use s3_cdn::credentials::{AwsCredentials, StaticCredentialsProvider};
use s3_cdn::mocks::{MockResponse, MockTransport, TestFixtures};
use s3_cdn::request::{S3Request, Verb};
use s3_cdn::signing::{canonical_amz_headers, content_md5, encode_object_key, AwsSignerV2};
use s3_cdn::transport::RequestBody;
use std::sync::Arc;
use test_case::test_case;

fn signer() -> AwsSignerV2 {
    AwsSignerV2::new(Arc::new(StaticCredentialsProvider::new(AwsCredentials::new(
        "AKID", "s3cr3t",
    ))))
}

fn reference_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap()
}

async fn send_and_record(request: S3Request) -> s3_cdn::mocks::RecordedRequest {
    let transport = MockTransport::with_default(MockResponse::ok());
    request.send(&transport, &signer(), None).await.unwrap();
    transport.last_request().unwrap()
}

#[tokio::test]
async fn test_reference_get_signature() {
    let config = TestFixtures::config();
    let request = S3Request::new(&config, Verb::Get, "mybucket", "key.txt").with_date(reference_date());

    let recorded = send_and_record(request).await;

    assert_eq!(
        recorded.header("Authorization"),
        Some("AWS AKID:1fv+XVL+P0w7/0EnKNffpDZsQn8=")
    );
    assert_eq!(recorded.header("Date"), Some("Tue, 01 Jan 2019 00:00:00 GMT"));
}

#[tokio::test]
async fn test_put_signature_covers_md5_type_and_meta() {
    let config = TestFixtures::config();
    let mut request =
        S3Request::new(&config, Verb::Put, "mybucket", "hello.txt").with_date(reference_date());
    request.set_header("Content-Type", "text/plain");
    request.set_header("Content-MD5", content_md5(b"hello"));
    request.set_amz_header("x-amz-meta-author", "alice");
    request.set_amz_header("x-amz-acl", "public-read");
    request.set_amz_header("x-amz-meta-empty", "");
    request.set_body(RequestBody::Bytes(Bytes::from("hello")));

    let recorded = send_and_record(request).await;

    assert_eq!(
        recorded.header("Authorization"),
        Some("AWS AKID:phGo8PPqPw8uVTbtPmNIXAU7dlE=")
    );
    assert_eq!(recorded.header("x-amz-meta-empty"), None);
}

#[tokio::test]
async fn test_sub_resource_signature() {
    let config = TestFixtures::config();
    let mut request = S3Request::new(&config, Verb::Get, "mybucket", "").with_date(reference_date());
    request.set_flag("acl");

    let recorded = send_and_record(request).await;

    assert_eq!(recorded.url, "https://mybucket.s3.amazonaws.com/?acl");
    assert_eq!(
        recorded.header("Authorization"),
        Some("AWS AKID:MIUrl4DrWOYCTvaN1TFAq9Z0QD8=")
    );
}

#[tokio::test]
async fn test_cdn_signature_covers_date_only() {
    let config = TestFixtures::config();
    let request = S3Request::cdn(&config, Verb::Get, "2008-06-30/distribution").with_date(reference_date());

    let recorded = send_and_record(request).await;

    assert_eq!(
        recorded.header("Authorization"),
        Some("AWS AKID:qXsZNNvEt6Zqv4ltJqQuFIRtN2U=")
    );
}

#[test_case("key.txt", "key.txt" ; "plain")]
#[test_case("dir/sub/key.txt", "dir/sub/key.txt" ; "separators kept")]
#[test_case("a b+c.txt", "a%20b%2Bc.txt" ; "space and plus")]
#[test_case("na\u{ef}ve.txt", "na%C3%AFve.txt" ; "utf8")]
#[test_case("~user/file_1-2.txt", "~user/file_1-2.txt" ; "unreserved")]
fn test_encode_object_key(key: &str, expected: &str) {
    assert_eq!(encode_object_key(key), expected);
}

proptest! {
    #[test]
    fn prop_encoded_key_keeps_separators(segments in prop::collection::vec("[^/]{0,12}", 1..5)) {
        let key = segments.join("/");
        let encoded = encode_object_key(&key);

        prop_assert!(!encoded.contains("%2F"));
        prop_assert_eq!(encoded.matches('/').count(), key.matches('/').count());
        prop_assert!(encoded.bytes().all(|b| b.is_ascii_graphic()));
    }

    #[test]
    fn prop_amz_block_is_sorted_and_lowercase(
        headers in prop::collection::vec(("x-amz-meta-[A-Za-z]{1,8}", "[a-z0-9]{0,6}"), 0..8)
    ) {
        let block = canonical_amz_headers(&headers);
        let lines: Vec<&str> = if block.is_empty() { Vec::new() } else { block.split('\n').collect() };

        let mut sorted = lines.clone();
        sorted.sort();
        prop_assert_eq!(&lines, &sorted);
        prop_assert_eq!(lines.len(), headers.iter().filter(|(_, v)| !v.is_empty()).count());
        for line in &lines {
            let (name, value) = line.split_once(':').unwrap();
            prop_assert_eq!(name, name.to_lowercase());
            prop_assert!(!value.is_empty());
        }
    }
}
