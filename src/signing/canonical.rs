//! Canonical string building for Signature V2.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unencoded: the RFC 3986 unreserved set.
const UNRESERVED_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Query parameters that address a sub-resource and therefore become part of
/// the canonical resource.
pub const SUB_RESOURCES: [&str; 4] = ["acl", "location", "logging", "torrent"];

/// Percent-encode an object key, keeping `/` separators readable.
pub fn encode_object_key(key: &str) -> String {
    utf8_percent_encode(key, UNRESERVED_SET)
        .to_string()
        .replace("%2F", "/")
}

/// Percent-encode a query parameter value.
pub fn encode_query_value(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED_SET).to_string()
}

/// Whether `key` names a signed sub-resource.
pub fn is_sub_resource(key: &str) -> bool {
    SUB_RESOURCES.contains(&key)
}

/// Build a query string in insertion order.
///
/// Empty values are emitted as a bare flag (`acl`, not `acl=`). Keys are
/// emitted verbatim.
pub fn build_query_string(parameters: &[(String, String)]) -> String {
    parameters
        .iter()
        .map(|(key, value)| {
            if value.is_empty() {
                key.clone()
            } else {
                format!("{}={}", key, encode_query_value(value))
            }
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the provider meta header block.
///
/// Headers with empty values are skipped; the rest become `lower(key):value`
/// lines sorted ascending and joined with `\n`.
pub fn canonical_amz_headers(headers: &[(String, String)]) -> String {
    let mut lines: Vec<String> = headers
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| format!("{}:{}", key.to_lowercase(), value))
        .collect();
    lines.sort();
    lines.join("\n")
}

/// Build the storage API string to sign.
pub fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    amz_headers: &str,
    resource: &str,
) -> String {
    let mut sts = format!("{}\n{}\n{}\n{}", verb, content_md5, content_type, date);
    if !amz_headers.is_empty() {
        sts.push('\n');
        sts.push_str(amz_headers);
    }
    sts.push('\n');
    sts.push_str(resource);
    sts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_object_key() {
        assert_eq!(encode_object_key("a b/c+d.txt"), "a%20b/c%2Bd.txt");
        assert_eq!(encode_object_key("dir/sub/file~1_-.bin"), "dir/sub/file~1_-.bin");
        assert_eq!(encode_object_key("caf\u{e9}"), "caf%C3%A9");
    }

    #[test]
    fn test_build_query_string_flags_and_values() {
        let query = build_query_string(&pairs(&[("acl", ""), ("prefix", "a b/c")]));
        assert_eq!(query, "acl&prefix=a%20b%2Fc");
    }

    #[test]
    fn test_sub_resources() {
        for key in SUB_RESOURCES {
            assert!(is_sub_resource(key));
        }
        assert!(!is_sub_resource("prefix"));
        assert!(!is_sub_resource("max-keys"));
    }

    #[test]
    fn test_canonical_amz_headers_sorted_and_filtered() {
        let block = canonical_amz_headers(&pairs(&[
            ("x-amz-meta-Zeta", "last"),
            ("x-amz-acl", "public-read"),
            ("x-amz-meta-empty", ""),
            ("X-Amz-Meta-Alpha", "first"),
        ]));
        assert_eq!(
            block,
            "x-amz-acl:public-read\nx-amz-meta-alpha:first\nx-amz-meta-zeta:last"
        );
    }

    #[test]
    fn test_canonical_amz_headers_empty() {
        assert_eq!(canonical_amz_headers(&[]), "");
        assert_eq!(canonical_amz_headers(&pairs(&[("x-amz-acl", "")])), "");
    }

    #[test]
    fn test_string_to_sign_without_amz_headers() {
        let sts = string_to_sign(
            "GET",
            "",
            "",
            "Tue, 01 Jan 2019 00:00:00 GMT",
            "",
            "/mybucket/key.txt",
        );
        assert_eq!(sts, "GET\n\n\nTue, 01 Jan 2019 00:00:00 GMT\n/mybucket/key.txt");
    }

    #[test]
    fn test_string_to_sign_with_amz_headers() {
        let sts = string_to_sign(
            "PUT",
            "XUFAKrxLKna5cZ2REBfFkg==",
            "text/plain",
            "Tue, 01 Jan 2019 00:00:00 GMT",
            "x-amz-acl:private",
            "/mybucket/hello.txt",
        );
        assert_eq!(
            sts,
            "PUT\nXUFAKrxLKna5cZ2REBfFkg==\ntext/plain\nTue, 01 Jan 2019 00:00:00 GMT\nx-amz-acl:private\n/mybucket/hello.txt"
        );
    }
}
