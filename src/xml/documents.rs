//! Typed readers and builders for service XML documents.

use super::{escape_xml, XmlElement};
use crate::error::{ErrorDocument, ResponseError, S3Error};
use crate::signing::parse_iso8601;
use crate::types::{
    AccessControlPolicy, Bucket, Distribution, DistributionConfig, Grant, Grantee,
    ListBucketsOutput, ListingPage, LoggingStatus, ObjectInfo, Owner, Permission,
};
use chrono::{DateTime, Utc};

/// Storage API namespace.
pub const S3_NAMESPACE: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// CDN API namespace.
pub const CDN_NAMESPACE: &str = "http://cloudfront.amazonaws.com/doc/2008-06-30/";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";

fn missing(field: &str) -> S3Error {
    S3Error::Response(ResponseError::MissingField {
        field: field.to_string(),
    })
}

fn required<'a>(el: &'a XmlElement, name: &str) -> Result<&'a str, S3Error> {
    el.child_text(name).ok_or_else(|| missing(name))
}

fn optional_text(el: &XmlElement, name: &str) -> Option<String> {
    el.child_text(name)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp(el: &XmlElement, name: &str) -> Option<DateTime<Utc>> {
    el.child_text(name).and_then(parse_iso8601)
}

/// Strip the quotes the service puts around ETags.
pub fn strip_quotes(value: &str) -> &str {
    value.trim().trim_matches('"')
}

/// Extract an error document.
///
/// Storage errors are `<Error>` roots; CDN errors wrap the same fields in
/// `<ErrorResponse><Error>`. Both `Code` and `Message` must be present.
pub fn parse_error_document(root: &XmlElement) -> Option<ErrorDocument> {
    let error = if root.name == "Error" {
        root
    } else {
        root.child("Error")?
    };

    let code = error.child_text("Code")?;
    let message = error.child_text("Message")?;
    Some(ErrorDocument {
        code: code.to_string(),
        message: message.to_string(),
        resource: optional_text(error, "Resource"),
        request_id: optional_text(error, "RequestId").or_else(|| optional_text(root, "RequestId")),
    })
}

/// Read a `ListBucketResult` page.
pub fn parse_listing_page(root: &XmlElement) -> Result<ListingPage, S3Error> {
    let mut page = ListingPage {
        is_truncated: root.child_text("IsTruncated") == Some("true"),
        next_marker: optional_text(root, "NextMarker"),
        ..ListingPage::default()
    };

    for contents in root.children_named("Contents") {
        let name = required(contents, "Key")?;
        let size = contents
            .child_text("Size")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0);
        page.objects.push(ObjectInfo {
            name: name.to_string(),
            time: timestamp(contents, "LastModified"),
            size,
            hash: contents
                .child_text("ETag")
                .map(strip_quotes)
                .unwrap_or_default()
                .to_string(),
        });
    }

    for common in root.children_named("CommonPrefixes") {
        if let Some(prefix) = common.child_text("Prefix") {
            page.common_prefixes.push(prefix.to_string());
        }
    }

    Ok(page)
}

/// Read a `ListAllMyBucketsResult` document.
pub fn parse_list_buckets(root: &XmlElement) -> Result<ListBucketsOutput, S3Error> {
    let owner = root.child("Owner").and_then(parse_owner);

    let buckets = match root.child("Buckets") {
        Some(buckets) => buckets
            .children_named("Bucket")
            .map(|bucket| {
                Ok(Bucket {
                    name: required(bucket, "Name")?.to_string(),
                    creation_date: timestamp(bucket, "CreationDate"),
                })
            })
            .collect::<Result<Vec<_>, S3Error>>()?,
        None => Vec::new(),
    };

    Ok(ListBucketsOutput { owner, buckets })
}

fn parse_owner(el: &XmlElement) -> Option<Owner> {
    Some(Owner {
        id: el.child_text("ID")?.to_string(),
        display_name: optional_text(el, "DisplayName"),
    })
}

fn parse_grantee(el: &XmlElement) -> Option<Grantee> {
    if let Some(id) = el.child_text("ID") {
        Some(Grantee::CanonicalUser {
            id: id.to_string(),
            display_name: optional_text(el, "DisplayName"),
        })
    } else if let Some(email) = el.child_text("EmailAddress") {
        Some(Grantee::Email {
            email_address: email.to_string(),
        })
    } else {
        el.child_text("URI").map(|uri| Grantee::Group {
            uri: uri.to_string(),
        })
    }
}

/// Read an `AccessControlPolicy` document.
///
/// Grants with an unrecognised grantee or permission are skipped.
pub fn parse_access_control_policy(root: &XmlElement) -> Result<AccessControlPolicy, S3Error> {
    let owner = root
        .child("Owner")
        .and_then(parse_owner)
        .ok_or_else(|| missing("Owner"))?;

    let grants = root
        .child("AccessControlList")
        .map(|acl| {
            acl.children_named("Grant")
                .filter_map(|grant| {
                    let grantee = parse_grantee(grant.child("Grantee")?)?;
                    let permission = grant.child_text("Permission")?.parse::<Permission>().ok()?;
                    Some(Grant {
                        grantee,
                        permission,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(AccessControlPolicy { owner, grants })
}

/// Read a `BucketLoggingStatus` document. `None` when logging is disabled.
pub fn parse_logging_status(root: &XmlElement) -> Option<LoggingStatus> {
    let enabled = root.child("LoggingEnabled")?;
    Some(LoggingStatus {
        target_bucket: enabled.child_text("TargetBucket").unwrap_or_default().to_string(),
        target_prefix: enabled.child_text("TargetPrefix").unwrap_or_default().to_string(),
    })
}

/// Read a `LocationConstraint` document. An empty constraint is `US`.
pub fn parse_location(root: &XmlElement) -> String {
    if root.text.is_empty() {
        "US".to_string()
    } else {
        root.text.clone()
    }
}

/// Read a `CopyObjectResult` document.
pub fn parse_copy_result(root: &XmlElement) -> Result<(Option<DateTime<Utc>>, String), S3Error> {
    let last_modified = required(root, "LastModified")?;
    let e_tag = required(root, "ETag")?;
    Ok((parse_iso8601(last_modified), strip_quotes(e_tag).to_string()))
}

/// Read a `DistributionConfig` element, or a `DistributionSummary` carrying
/// the same fields inline.
pub fn parse_distribution_config(el: &XmlElement) -> DistributionConfig {
    DistributionConfig {
        origin: el.child_text("Origin").unwrap_or_default().to_string(),
        caller_reference: el.child_text("CallerReference").unwrap_or_default().to_string(),
        cnames: el
            .children_named("CNAME")
            .map(|c| c.text.clone())
            .collect(),
        comment: el.child_text("Comment").unwrap_or_default().to_string(),
        enabled: el.child_text("Enabled") == Some("true"),
    }
}

/// Read a `Distribution` or `DistributionSummary` element.
pub fn parse_distribution(el: &XmlElement) -> Result<Distribution, S3Error> {
    let config = match el.child("DistributionConfig") {
        Some(config) => parse_distribution_config(config),
        None => parse_distribution_config(el),
    };

    Ok(Distribution {
        id: required(el, "Id")?.to_string(),
        status: el.child_text("Status").unwrap_or_default().to_string(),
        last_modified: timestamp(el, "LastModifiedTime"),
        domain_name: el.child_text("DomainName").unwrap_or_default().to_string(),
        config,
        hash: None,
    })
}

/// Read a `DistributionList` document.
pub fn parse_distribution_list(root: &XmlElement) -> Result<Vec<Distribution>, S3Error> {
    root.children_named("DistributionSummary")
        .map(parse_distribution)
        .collect()
}

/// Build a `CreateBucketConfiguration` body.
pub fn build_create_bucket_config(location: &str) -> String {
    format!(
        "{}<CreateBucketConfiguration xmlns=\"{}\"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>",
        XML_DECLARATION,
        S3_NAMESPACE,
        escape_xml(location)
    )
}

/// Build an `AccessControlPolicy` body.
pub fn build_access_control_policy(policy: &AccessControlPolicy) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str("<AccessControlPolicy>");

    xml.push_str("<Owner>");
    xml.push_str(&format!("<ID>{}</ID>", escape_xml(&policy.owner.id)));
    if let Some(name) = &policy.owner.display_name {
        xml.push_str(&format!("<DisplayName>{}</DisplayName>", escape_xml(name)));
    }
    xml.push_str("</Owner>");

    xml.push_str("<AccessControlList>");
    for grant in &policy.grants {
        xml.push_str("<Grant>");
        xml.push_str(&format!(
            "<Grantee xmlns:xsi=\"{}\" xsi:type=\"{}\">",
            XSI_NAMESPACE,
            grant.grantee.xsi_type()
        ));
        match &grant.grantee {
            // DisplayName is not accepted in requests.
            Grantee::CanonicalUser { id, .. } => {
                xml.push_str(&format!("<ID>{}</ID>", escape_xml(id)));
            }
            Grantee::Email { email_address } => {
                xml.push_str(&format!(
                    "<EmailAddress>{}</EmailAddress>",
                    escape_xml(email_address)
                ));
            }
            Grantee::Group { uri } => {
                xml.push_str(&format!("<URI>{}</URI>", escape_xml(uri)));
            }
        }
        xml.push_str("</Grantee>");
        xml.push_str(&format!(
            "<Permission>{}</Permission>",
            grant.permission.as_str()
        ));
        xml.push_str("</Grant>");
    }
    xml.push_str("</AccessControlList>");

    xml.push_str("</AccessControlPolicy>");
    xml
}

/// Build a `BucketLoggingStatus` body. `None` disables logging.
pub fn build_logging_status(target: Option<(&str, &str)>) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!("<BucketLoggingStatus xmlns=\"{}\">", S3_NAMESPACE));
    if let Some((bucket, prefix)) = target {
        xml.push_str("<LoggingEnabled>");
        xml.push_str(&format!("<TargetBucket>{}</TargetBucket>", escape_xml(bucket)));
        xml.push_str(&format!("<TargetPrefix>{}</TargetPrefix>", escape_xml(prefix)));
        xml.push_str("</LoggingEnabled>");
    }
    xml.push_str("</BucketLoggingStatus>");
    xml
}

/// Build a `DistributionConfig` body.
pub fn build_distribution_config(config: &DistributionConfig) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!("<DistributionConfig xmlns=\"{}\">", CDN_NAMESPACE));
    xml.push_str(&format!("<Origin>{}</Origin>", escape_xml(&config.origin)));
    xml.push_str(&format!(
        "<CallerReference>{}</CallerReference>",
        escape_xml(&config.caller_reference)
    ));
    for cname in &config.cnames {
        xml.push_str(&format!("<CNAME>{}</CNAME>", escape_xml(cname)));
    }
    if !config.comment.is_empty() {
        xml.push_str(&format!("<Comment>{}</Comment>", escape_xml(&config.comment)));
    }
    xml.push_str(&format!(
        "<Enabled>{}</Enabled>",
        if config.enabled { "true" } else { "false" }
    ));
    xml.push_str("</DistributionConfig>");
    xml
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse;

    #[test]
    fn test_parse_storage_error() {
        let root = parse(
            br#"<?xml version="1.0" encoding="UTF-8"?>
            <Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message>
            <Resource>/mybucket/missing.txt</Resource><RequestId>4442587FB7D0A2F9</RequestId></Error>"#,
        )
        .unwrap();

        let doc = parse_error_document(&root).unwrap();
        assert_eq!(doc.code, "NoSuchKey");
        assert_eq!(doc.message, "The specified key does not exist.");
        assert_eq!(doc.resource.as_deref(), Some("/mybucket/missing.txt"));
        assert_eq!(doc.request_id.as_deref(), Some("4442587FB7D0A2F9"));
    }

    #[test]
    fn test_parse_cdn_error() {
        let root = parse(
            br#"<ErrorResponse xmlns="http://cloudfront.amazonaws.com/doc/2008-06-30/">
            <Error><Type>Sender</Type><Code>NoSuchDistribution</Code><Message>The specified distribution does not exist.</Message></Error>
            <RequestId>abc-123</RequestId></ErrorResponse>"#,
        )
        .unwrap();

        let doc = parse_error_document(&root).unwrap();
        assert_eq!(doc.code, "NoSuchDistribution");
        assert_eq!(doc.resource, None);
        assert_eq!(doc.request_id.as_deref(), Some("abc-123"));
    }

    #[test]
    fn test_error_document_requires_code_and_message() {
        let root = parse(b"<Error><Code>Oops</Code></Error>").unwrap();
        assert!(parse_error_document(&root).is_none());

        let root = parse(b"<ListBucketResult><Name>b</Name></ListBucketResult>").unwrap();
        assert!(parse_error_document(&root).is_none());
    }

    #[test]
    fn test_parse_listing_page() {
        let root = parse(
            br#"<ListBucketResult>
                <IsTruncated>true</IsTruncated>
                <NextMarker>photos/b.jpg</NextMarker>
                <Contents><Key>photos/a.jpg</Key><LastModified>2024-01-15T10:30:00.000Z</LastModified>
                    <ETag>"d41d8cd98f00b204e9800998ecf8427e"</ETag><Size>1024</Size></Contents>
                <CommonPrefixes><Prefix>photos/2023/</Prefix></CommonPrefixes>
            </ListBucketResult>"#,
        )
        .unwrap();

        let page = parse_listing_page(&root).unwrap();
        assert!(page.is_truncated);
        assert_eq!(page.next_marker.as_deref(), Some("photos/b.jpg"));
        assert_eq!(page.objects.len(), 1);
        assert_eq!(page.objects[0].hash, "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(page.objects[0].size, 1024);
        assert!(page.objects[0].time.is_some());
        assert_eq!(page.common_prefixes, vec!["photos/2023/".to_string()]);
    }

    #[test]
    fn test_parse_list_buckets() {
        let root = parse(
            br#"<ListAllMyBucketsResult>
                <Owner><ID>owner-id</ID><DisplayName>owner</DisplayName></Owner>
                <Buckets>
                    <Bucket><Name>alpha</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
                    <Bucket><Name>beta</Name><CreationDate>2024-02-01T00:00:00.000Z</CreationDate></Bucket>
                </Buckets>
            </ListAllMyBucketsResult>"#,
        )
        .unwrap();

        let output = parse_list_buckets(&root).unwrap();
        assert_eq!(output.names(), vec!["alpha", "beta"]);
        assert_eq!(output.owner.unwrap().display_name.as_deref(), Some("owner"));
    }

    #[test]
    fn test_parse_access_control_policy() {
        let root = parse(
            br#"<AccessControlPolicy>
                <Owner><ID>owner-id</ID><DisplayName>owner</DisplayName></Owner>
                <AccessControlList>
                    <Grant><Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="CanonicalUser">
                        <ID>owner-id</ID><DisplayName>owner</DisplayName></Grantee>
                        <Permission>FULL_CONTROL</Permission></Grant>
                    <Grant><Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group">
                        <URI>http://acs.amazonaws.com/groups/s3/LogDelivery</URI></Grantee>
                        <Permission>WRITE</Permission></Grant>
                    <Grant><Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="AmazonCustomerByEmail">
                        <EmailAddress>user@example.com</EmailAddress></Grantee>
                        <Permission>READ</Permission></Grant>
                </AccessControlList>
            </AccessControlPolicy>"#,
        )
        .unwrap();

        let policy = parse_access_control_policy(&root).unwrap();
        assert_eq!(policy.owner.id, "owner-id");
        assert_eq!(policy.grants.len(), 3);
        assert!(policy.has_grant(&Grantee::log_delivery(), Permission::Write));
        assert_eq!(
            policy.grants[2].grantee,
            Grantee::Email {
                email_address: "user@example.com".into()
            }
        );
    }

    #[test]
    fn test_access_control_policy_document_reparses() {
        let policy = AccessControlPolicy {
            owner: Owner {
                id: "owner-id".into(),
                display_name: Some("owner".into()),
            },
            grants: vec![Grant {
                grantee: Grantee::log_delivery(),
                permission: Permission::ReadAcp,
            }],
        };

        let xml = build_access_control_policy(&policy);
        assert!(xml.contains("xsi:type=\"Group\""));
        let reparsed = parse_access_control_policy(&parse(xml.as_bytes()).unwrap()).unwrap();
        assert_eq!(reparsed, policy);
    }

    #[test]
    fn test_logging_status() {
        let enabled = build_logging_status(Some(("logs", "site-")));
        let status = parse_logging_status(&parse(enabled.as_bytes()).unwrap()).unwrap();
        assert_eq!(status.target_bucket, "logs");
        assert_eq!(status.target_prefix, "site-");

        let disabled = build_logging_status(None);
        assert!(parse_logging_status(&parse(disabled.as_bytes()).unwrap()).is_none());
    }

    #[test]
    fn test_parse_location() {
        let eu = parse(br#"<LocationConstraint xmlns="http://s3.amazonaws.com/doc/2006-03-01/">EU</LocationConstraint>"#).unwrap();
        assert_eq!(parse_location(&eu), "EU");
        let us = parse(br#"<LocationConstraint xmlns="http://s3.amazonaws.com/doc/2006-03-01/"/>"#).unwrap();
        assert_eq!(parse_location(&us), "US");
    }

    #[test]
    fn test_parse_copy_result() {
        let root = parse(
            br#"<CopyObjectResult><LastModified>2024-01-15T10:30:00.000Z</LastModified><ETag>"abc123"</ETag></CopyObjectResult>"#,
        )
        .unwrap();
        let (time, hash) = parse_copy_result(&root).unwrap();
        assert!(time.is_some());
        assert_eq!(hash, "abc123");

        let partial = parse(b"<CopyObjectResult><ETag>x</ETag></CopyObjectResult>").unwrap();
        assert!(matches!(
            parse_copy_result(&partial),
            Err(S3Error::Response(ResponseError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_parse_distribution_and_summary() {
        let root = parse(
            br#"<Distribution xmlns="http://cloudfront.amazonaws.com/doc/2008-06-30/">
                <Id>EDFDVBD632BHDS5</Id><Status>InProgress</Status>
                <LastModifiedTime>2009-11-19T19:37:58Z</LastModifiedTime>
                <DomainName>d111111abcdef8.cloudfront.net</DomainName>
                <DistributionConfig><Origin>mybucket.s3.amazonaws.com</Origin>
                    <CallerReference>ref-1</CallerReference><CNAME>cdn.example.com</CNAME>
                    <Comment>site</Comment><Enabled>true</Enabled></DistributionConfig>
            </Distribution>"#,
        )
        .unwrap();
        let dist = parse_distribution(&root).unwrap();
        assert_eq!(dist.id, "EDFDVBD632BHDS5");
        assert_eq!(dist.config.caller_reference, "ref-1");
        assert_eq!(dist.config.cnames, vec!["cdn.example.com".to_string()]);
        assert!(dist.config.enabled);

        let list = parse(
            br#"<DistributionList><Marker/><MaxItems>100</MaxItems><IsTruncated>false</IsTruncated>
                <DistributionSummary><Id>A1</Id><Status>Deployed</Status><DomainName>a.cloudfront.net</DomainName>
                    <Origin>a.s3.amazonaws.com</Origin><Enabled>false</Enabled></DistributionSummary>
                <DistributionSummary><Id>B2</Id><Status>Deployed</Status><DomainName>b.cloudfront.net</DomainName>
                    <Origin>b.s3.amazonaws.com</Origin><Enabled>true</Enabled></DistributionSummary>
            </DistributionList>"#,
        )
        .unwrap();
        let dists = parse_distribution_list(&list).unwrap();
        assert_eq!(dists.len(), 2);
        assert_eq!(dists[0].config.origin, "a.s3.amazonaws.com");
        assert!(!dists[0].config.enabled);
    }

    #[test]
    fn test_build_distribution_config() {
        let config = DistributionConfig {
            origin: "mybucket.s3.amazonaws.com".into(),
            caller_reference: "ref".into(),
            cnames: vec!["a.example.com".into(), "b.example.com".into()],
            comment: String::new(),
            enabled: false,
        };
        let xml = build_distribution_config(&config);
        assert!(xml.contains(CDN_NAMESPACE));
        assert!(!xml.contains("<Comment>"));
        assert!(xml.contains("<Enabled>false</Enabled>"));

        let reparsed = parse_distribution_config(&parse(xml.as_bytes()).unwrap());
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_build_create_bucket_config() {
        let xml = build_create_bucket_config("EU");
        assert!(xml.contains("<LocationConstraint>EU</LocationConstraint>"));
    }
}
