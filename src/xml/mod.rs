//! XML handling for service documents.
//!
//! Response bodies are read once into an [`XmlElement`] tree; the typed
//! readers and request document builders live in [`documents`].

pub mod documents;

pub use documents::*;

use crate::error::{ResponseError, S3Error};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A parsed XML element. Names are stored without namespace prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local element name.
    pub name: String,
    /// Attributes as `(qualified name, value)` pairs.
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed text content.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Follow a path of child names.
    pub fn path(&self, names: &[&str]) -> Option<&XmlElement> {
        names.iter().try_fold(self, |el, name| el.child(name))
    }

    /// Attribute value, matched on its local name (`type` matches `xsi:type`).
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name || k.rsplit(':').next() == Some(name))
            .map(|(_, v)| v.as_str())
    }
}

fn xml_error(message: impl Into<String>) -> S3Error {
    S3Error::Response(ResponseError::XmlParseError {
        message: message.into(),
    })
}

fn start_element(e: &BytesStart<'_>) -> Result<XmlElement, S3Error> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
    let mut element = XmlElement::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| xml_error(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| xml_error(e.to_string()))?
            .to_string();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// Parse a document into its root element.
pub fn parse(body: &[u8]) -> Result<XmlElement, S3Error> {
    let text = std::str::from_utf8(body).map_err(|e| xml_error(e.to_string()))?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(start_element(&e)?),
            Ok(Event::Empty(e)) => {
                let element = start_element(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_err(|e| xml_error(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| xml_error("unbalanced closing tag"))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(element),
                    None => root = Some(element),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e.to_string())),
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(xml_error("unexpected end of document"));
    }
    root.ok_or_else(|| xml_error("document has no root element"))
}

/// Escape special characters for XML.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
        <ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
            <Name>mybucket</Name>
            <IsTruncated>false</IsTruncated>
            <Contents><Key>a &amp; b.txt</Key><Size>3</Size></Contents>
            <Contents><Key>c.txt</Key><Size>4</Size></Contents>
            <Marker/>
        </ListBucketResult>"#;

        let root = parse(xml).unwrap();
        assert_eq!(root.name, "ListBucketResult");
        assert_eq!(root.child_text("Name"), Some("mybucket"));
        assert_eq!(root.children_named("Contents").count(), 2);
        assert_eq!(root.path(&["Contents", "Key"]).map(|k| k.text.as_str()), Some("a & b.txt"));
        assert_eq!(root.child_text("Marker"), Some(""));
    }

    #[test]
    fn test_parse_attributes_and_prefixes() {
        let xml = br#"<Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="Group"><URI>http://acs.amazonaws.com/groups/global/AllUsers</URI></Grantee>"#;

        let root = parse(xml).unwrap();
        assert_eq!(root.attribute("type"), Some("Group"));
        assert_eq!(root.attribute("xsi:type"), Some("Group"));
        assert!(root.child("URI").is_some());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse(b"<Error><Code>Oops</Error>").is_err());
        assert!(parse(b"<Error><Code>Oops</Code>").is_err());
        assert!(parse(b"").is_err());
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a&b"), "a&amp;b");
        assert_eq!(escape_xml("a<b"), "a&lt;b");
        assert_eq!(escape_xml("a>b"), "a&gt;b");
        assert_eq!(escape_xml("a\"b"), "a&quot;b");
    }
}
