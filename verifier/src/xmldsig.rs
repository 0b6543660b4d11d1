// Copyright (c) 2023 The NemID Verifier Developers

//! Extraction of the signed parts of an OpenOCES XML signature.
//!
//! The NemID client answers with a document of the following shape:
//!
//! ```xml
//! <openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#">
//!   <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
//!     <ds:SignedInfo>
//!       <ds:Reference URI="#ToBeSigned">
//!         <ds:DigestValue>...</ds:DigestValue>
//!       </ds:Reference>
//!     </ds:SignedInfo>
//!     <ds:SignatureValue>...</ds:SignatureValue>
//!     <ds:KeyInfo>
//!       <ds:X509Data>
//!         <ds:X509Certificate>...</ds:X509Certificate>
//!       </ds:X509Data>
//!     </ds:KeyInfo>
//!     <ds:Object Id="ToBeSigned">...</ds:Object>
//!   </ds:Signature>
//! </openoces:signature>
//! ```
//!
//! Only the pieces needed to check the signature are pulled out. They are
//! returned as text and are not interpreted here.

use roxmltree::{Document, Node};
use std::collections::BTreeMap;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace of the OpenOCES signature envelope.
pub const OPENOCES_NAMESPACE: &str = "http://www.openoces.org/2006/07/signature#";
/// Namespace of XML digital signatures.
pub const XMLDSIG_NAMESPACE: &str = "http://www.w3.org/2000/09/xmldsig#";

/// Result of extracting the signature parts.
pub type Result<T> = core::result::Result<T, Error>;

/// Error extracting the signature parts from a response
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum Error {
    /// The response is not well formed XML: {0}
    MalformedXml(String),
    /// The root element is not an OpenOCES signature
    UnexpectedRootElement,
    /// The signature does not contain a single SignedInfo element
    MissingSignedInfo,
    /// The signature does not contain a single SignatureValue element
    MissingSignatureValue,
    /// The SignedInfo does not contain a single reference DigestValue element
    MissingDigestValue,
    /// The signature does not contain an Object with the Id ToBeSigned
    MissingToBeSignedObject,
    /// The signature does not contain any X509Certificate elements
    MissingCertificates,
}

/// The parts of an XML signature needed to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedXmlDsigResponse {
    /// The `<SignedInfo>` element as XML
    pub signed_info: Vec<u8>,
    /// The base64 text of `<SignatureValue>`
    pub signature_value: String,
    /// The base64 text of the reference `<DigestValue>`
    pub reference_digest_value: String,
    /// The `<Object Id="ToBeSigned">` element as XML
    pub object_to_be_signed: Vec<u8>,
    /// The base64 text of each `<X509Certificate>` in document order
    pub x509_certificates: Vec<String>,
}

/// Extracts the parts of an XML signature.
pub trait XmlDsigParser {
    /// Extract the signature parts from the document `xml`.
    fn parse(&self, xml: &[u8]) -> Result<ParsedXmlDsigResponse>;
}

/// [`XmlDsigParser`] locating the parts by their path below the OpenOCES
/// envelope.
///
/// Element fragments are returned as written in the document, with the
/// namespace declarations and `xml:*` attributes they inherit added to their
/// start tag.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DefaultXmlDsigParser;

impl XmlDsigParser for DefaultXmlDsigParser {
    fn parse(&self, xml: &[u8]) -> Result<ParsedXmlDsigResponse> {
        let text = core::str::from_utf8(xml).map_err(|e| Error::MalformedXml(e.to_string()))?;
        let document = Document::parse(text).map_err(|e| Error::MalformedXml(e.to_string()))?;

        let envelope = document.root_element();
        if !envelope.has_tag_name((OPENOCES_NAMESPACE, "signature")) {
            return Err(Error::UnexpectedRootElement);
        }
        let signature = single_child(envelope, "Signature").ok_or(Error::MissingSignedInfo)?;

        let signed_info = single_child(signature, "SignedInfo").ok_or(Error::MissingSignedInfo)?;
        let signature_value =
            single_child(signature, "SignatureValue").ok_or(Error::MissingSignatureValue)?;
        let digest_value = single_child(signed_info, "Reference")
            .and_then(|reference| single_child(reference, "DigestValue"))
            .ok_or(Error::MissingDigestValue)?;
        let object_to_be_signed = children(signature, "Object")
            .find(|object| object.attribute("Id") == Some("ToBeSigned"))
            .ok_or(Error::MissingToBeSignedObject)?;
        let x509_certificates = children(signature, "KeyInfo")
            .flat_map(|key_info| children(key_info, "X509Data"))
            .flat_map(|data| children(data, "X509Certificate"))
            .map(text_content)
            .collect::<Vec<_>>();
        if x509_certificates.is_empty() {
            return Err(Error::MissingCertificates);
        }

        Ok(ParsedXmlDsigResponse {
            signed_info: fragment(signed_info).into_bytes(),
            signature_value: text_content(signature_value),
            reference_digest_value: text_content(digest_value),
            object_to_be_signed: fragment(object_to_be_signed).into_bytes(),
            x509_certificates,
        })
    }
}

/// The child elements of `node` named `name` in the signature namespace.
fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |child| child.has_tag_name((XMLDSIG_NAMESPACE, name)))
}

/// The child element named `name`, only when there is exactly one.
fn single_child<'a, 'input: 'a>(node: Node<'a, 'input>, name: &'a str) -> Option<Node<'a, 'input>> {
    let mut matches = children(node, name);
    let first = matches.next()?;
    match matches.next() {
        Some(_) => None,
        None => Some(first),
    }
}

fn text_content(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|descendant| descendant.is_text())
        .filter_map(|descendant| descendant.text())
        .collect()
}

/// The source text of `element` with every namespace and `xml:*` attribute
/// it inherits declared on its start tag.
fn fragment(element: Node<'_, '_>) -> String {
    let source = element.document().input_text();
    let text = source.get(element.range()).unwrap_or_default();
    let name_end = text
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(text.len());
    let (name, rest) = text.split_at(name_end);

    let declared = start_tag_attribute_names(rest);
    let inherited = element
        .namespaces()
        .filter_map(|namespace| {
            let attribute = match namespace.name() {
                Some("xml") => return None,
                Some(prefix) => format!("xmlns:{prefix}"),
                None if namespace.uri().is_empty() => return None,
                None => "xmlns".to_owned(),
            };
            (!declared.contains(&attribute.as_str())).then(|| (attribute, namespace.uri()))
        })
        .collect::<BTreeMap<_, _>>();

    // The nearest ancestor wins.
    let mut xml_attributes = BTreeMap::new();
    for ancestor in element.ancestors().skip(1) {
        for attribute in ancestor.attributes() {
            if attribute.namespace() != Some(XML_NAMESPACE) {
                continue;
            }
            let name = format!("xml:{}", attribute.name());
            if !declared.contains(&name.as_str()) {
                xml_attributes.entry(name).or_insert(attribute.value());
            }
        }
    }

    let mut fragment = String::with_capacity(text.len() + inherited.len() * 64);
    fragment.push_str(name);
    for (attribute, value) in inherited.iter().chain(&xml_attributes) {
        fragment.push(' ');
        fragment.push_str(attribute);
        fragment.push_str("=\"");
        for c in value.chars() {
            match c {
                '&' => fragment.push_str("&amp;"),
                '<' => fragment.push_str("&lt;"),
                '"' => fragment.push_str("&quot;"),
                '\t' => fragment.push_str("&#x9;"),
                '\n' => fragment.push_str("&#xA;"),
                '\r' => fragment.push_str("&#xD;"),
                c => fragment.push(c),
            }
        }
        fragment.push('"');
    }
    fragment.push_str(rest);
    fragment
}

/// The attribute names of a start tag, given the text following the element
/// name.
fn start_tag_attribute_names(tag: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = tag;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() || rest.starts_with('>') || rest.starts_with('/') {
            break;
        }
        let name_end = rest
            .find(|c: char| c.is_ascii_whitespace() || c == '=')
            .unwrap_or(rest.len());
        names.push(&rest[..name_end]);
        rest = rest[name_end..].trim_start();
        rest = rest.strip_prefix('=').unwrap_or(rest).trim_start();
        let Some(quote) = rest.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            break;
        };
        let value = &rest[1..];
        match value.find(quote) {
            Some(end) => rest = &value[end + 1..],
            None => break,
        }
    }
    names
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_matches::assert_matches;
    use yare::parameterized;

    fn example_structure() -> String {
        textwrap::dedent(
            r##"
            <openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#">
            <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
            <ds:SignedInfo>
            <ds:Reference>
            <ds:DigestValue>digest-value</ds:DigestValue>
            </ds:Reference>
            </ds:SignedInfo>
            <ds:SignatureValue>signature-value</ds:SignatureValue>
            <ds:KeyInfo id="bidKeyInfo">
            <ds:X509Data>
            <ds:X509Certificate>cert1</ds:X509Certificate>
            </ds:X509Data>
            </ds:KeyInfo>
            <ds:Object Id="ToBeSigned">
            <element>object</element>
            </ds:Object>
            </ds:Signature>
            </openoces:signature>
            "##,
        )
    }

    fn example_response() -> String {
        textwrap::dedent(
            r##"
            <openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#">
            <ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
               <ds:SignedInfo>
                  <ds:CanonicalizationMethod Algorithm="http://www.w3.org/TR/2001/REC-xml-c14n-20010315"/>
                  <ds:SignatureMethod Algorithm="http://www.w3.org/2001/04/xmldsig-more#rsa-sha256"/>
                  <ds:Reference URI="#ToBeSigned">
                     <ds:DigestMethod Algorithm="http://www.w3.org/2001/04/xmlenc#sha256"/>
                     <ds:DigestValue>digest-value</ds:DigestValue>
                  </ds:Reference>
               </ds:SignedInfo>
               <ds:SignatureValue>signature-value</ds:SignatureValue>
               <ds:KeyInfo>
                  <ds:X509Data>
                     <ds:X509Certificate>cert1</ds:X509Certificate>
                     <ds:X509Certificate>cert2</ds:X509Certificate>
                     <ds:X509Certificate>cert3</ds:X509Certificate>
                  </ds:X509Data>
               </ds:KeyInfo>
               <ds:Object Id="ToBeSigned">
                  <ds:SignatureProperties>
                     <ds:SignatureProperty>
                        <openoces:Name>action</openoces:Name>
                        <openoces:Value>logon</openoces:Value>
                     </ds:SignatureProperty>
                  </ds:SignatureProperties>
               </ds:Object>
            </ds:Signature>
            </openoces:signature>
            "##,
        )
    }

    fn parse(xml: &str) -> Result<ParsedXmlDsigResponse> {
        DefaultXmlDsigParser.parse(xml.trim().as_bytes())
    }

    #[test]
    fn signature_value() {
        let parsed = parse(&example_response()).expect("Failed to parse response");
        assert_eq!(parsed.signature_value, "signature-value");
    }

    #[test]
    fn reference_digest_value() {
        let parsed = parse(&example_response()).expect("Failed to parse response");
        assert_eq!(parsed.reference_digest_value, "digest-value");
    }

    #[test]
    fn certificates_in_document_order() {
        let parsed = parse(&example_response()).expect("Failed to parse response");
        assert_eq!(parsed.x509_certificates, ["cert1", "cert2", "cert3"]);
    }

    #[test]
    fn object_to_be_signed_declares_inherited_namespaces() {
        let parsed = parse(&example_structure()).expect("Failed to parse response");

        let expected = textwrap::dedent(
            r##"
            <ds:Object xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" Id="ToBeSigned">
            <element>object</element>
            </ds:Object>"##,
        );
        assert_eq!(
            String::from_utf8(parsed.object_to_be_signed).expect("Not UTF-8"),
            expected.trim_start()
        );
    }

    #[test]
    fn signed_info_declares_inherited_namespaces() {
        let parsed = parse(&example_structure()).expect("Failed to parse response");

        let expected = textwrap::dedent(
            r##"
            <ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#">
            <ds:Reference>
            <ds:DigestValue>digest-value</ds:DigestValue>
            </ds:Reference>
            </ds:SignedInfo>"##,
        );
        assert_eq!(
            String::from_utf8(parsed.signed_info).expect("Not UTF-8"),
            expected.trim_start()
        );
    }

    #[test]
    fn fragment_keeps_its_own_declarations() {
        let xml = r##"<openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns="urn:default"><ds:Reference><ds:DigestValue>d</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>s</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>c</ds:X509Certificate></ds:X509Data></ds:KeyInfo><ds:Object Id='ToBeSigned'/></ds:Signature></openoces:signature>"##;
        let parsed = parse(xml).expect("Failed to parse response");

        assert_eq!(
            String::from_utf8(parsed.signed_info).expect("Not UTF-8"),
            r##"<ds:SignedInfo xmlns:openoces="http://www.openoces.org/2006/07/signature#" xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns="urn:default"><ds:Reference><ds:DigestValue>d</ds:DigestValue></ds:Reference></ds:SignedInfo>"##
        );
        assert_eq!(
            String::from_utf8(parsed.object_to_be_signed).expect("Not UTF-8"),
            r##"<ds:Object xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" Id='ToBeSigned'/>"##
        );
    }

    #[test]
    fn fragment_inherits_xml_attributes() {
        let xml = r##"<openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#" xml:space="preserve" xml:lang="en"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xml:lang="da"><ds:SignedInfo><ds:Reference><ds:DigestValue>d</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>s</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>c</ds:X509Certificate></ds:X509Data></ds:KeyInfo><ds:Object Id="ToBeSigned" xml:space="default"/></ds:Signature></openoces:signature>"##;
        let parsed = parse(xml).expect("Failed to parse response");

        assert_eq!(
            String::from_utf8(parsed.signed_info).expect("Not UTF-8"),
            r##"<ds:SignedInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" xml:lang="da" xml:space="preserve"><ds:Reference><ds:DigestValue>d</ds:DigestValue></ds:Reference></ds:SignedInfo>"##
        );
        assert_eq!(
            String::from_utf8(parsed.object_to_be_signed).expect("Not UTF-8"),
            r##"<ds:Object xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" xml:lang="da" Id="ToBeSigned" xml:space="default"/>"##
        );
    }

    #[test]
    fn fragment_with_xml_attributes_canonicalizes_like_the_element_in_place() {
        let xml = r##"<openoces:signature xmlns:openoces="http://www.openoces.org/2006/07/signature#" xml:lang="da"><ds:Signature xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:SignedInfo><ds:Reference><ds:DigestValue>d</ds:DigestValue></ds:Reference></ds:SignedInfo><ds:SignatureValue>s</ds:SignatureValue><ds:KeyInfo><ds:X509Data><ds:X509Certificate>c</ds:X509Certificate></ds:X509Data></ds:KeyInfo><ds:Object Id="ToBeSigned"><v>x</v></ds:Object></ds:Signature></openoces:signature>"##;
        let parsed = parse(xml).expect("Failed to parse response");
        let canonical = crate::c14n::canonicalize(&parsed.object_to_be_signed)
            .expect("Failed to canonicalize");

        assert_eq!(
            String::from_utf8(canonical).expect("Not UTF-8"),
            r##"<ds:Object xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" Id="ToBeSigned" xml:lang="da"><v>x</v></ds:Object>"##
        );
    }

    #[test]
    fn fragment_canonicalizes_like_the_element_in_place() {
        let parsed = parse(&example_response()).expect("Failed to parse response");
        let canonical = crate::c14n::canonicalize(&parsed.object_to_be_signed)
            .expect("Failed to canonicalize");

        let canonical = String::from_utf8(canonical).expect("Not UTF-8");
        assert!(canonical.starts_with(
            r##"<ds:Object xmlns:ds="http://www.w3.org/2000/09/xmldsig#" xmlns:openoces="http://www.openoces.org/2006/07/signature#" Id="ToBeSigned">"##
        ));
        assert!(canonical.contains("<openoces:Name>action</openoces:Name>"));
    }

    #[parameterized(
        signed_info = { "<ds:SignedInfo>", "<ds:Ignored>", "</ds:SignedInfo>", "</ds:Ignored>", Error::MissingSignedInfo },
        signature_value = { "<ds:SignatureValue>", "<ds:Ignored>", "</ds:SignatureValue>", "</ds:Ignored>", Error::MissingSignatureValue },
        digest_value = { "<ds:DigestValue>", "<ds:Ignored>", "</ds:DigestValue>", "</ds:Ignored>", Error::MissingDigestValue },
        to_be_signed = { r#"Id="ToBeSigned""#, r#"Id="Other""#, "", "", Error::MissingToBeSignedObject },
        certificates = { "<ds:X509Certificate>", "<ds:Ignored>", "</ds:X509Certificate>", "</ds:Ignored>", Error::MissingCertificates },
    )]
    fn missing_part(open: &str, open_with: &str, close: &str, close_with: &str, expected: Error) {
        let mut xml = example_response().replace(open, open_with);
        if !close.is_empty() {
            xml = xml.replace(close, close_with);
        }

        assert_eq!(parse(&xml), Err(expected));
    }

    #[test]
    fn duplicate_signature_value() {
        let xml = example_response().replace(
            "<ds:SignatureValue>signature-value</ds:SignatureValue>",
            "<ds:SignatureValue>a</ds:SignatureValue><ds:SignatureValue>b</ds:SignatureValue>",
        );

        assert_eq!(parse(&xml), Err(Error::MissingSignatureValue));
    }

    #[test]
    fn wrong_signature_namespace() {
        let xml = example_response().replace(
            "http://www.w3.org/2000/09/xmldsig#",
            "http://www.w3.org/2000/09/xmldsig",
        );

        assert_eq!(parse(&xml), Err(Error::MissingSignedInfo));
    }

    #[test]
    fn unexpected_root_element() {
        let xml = r#"<signature xmlns="urn:other"><child/></signature>"#;
        assert_eq!(parse(xml), Err(Error::UnexpectedRootElement));
    }

    #[parameterized(
        not_xml = { "signature-value" },
        unclosed = { "<openoces:signature xmlns:openoces=\"http://www.openoces.org/2006/07/signature#\">" },
        empty = { "" },
    )]
    fn malformed_xml(xml: &str) {
        assert_matches!(parse(xml), Err(Error::MalformedXml(_)));
    }

    #[test]
    fn invalid_utf8() {
        assert_matches!(
            DefaultXmlDsigParser.parse(b"<a>\xFF</a>"),
            Err(Error::MalformedXml(_))
        );
    }

    #[parameterized(
        none = { ">", &[] },
        self_closing = { "/>", &[] },
        double_quotes = { r#" a="1" b:c="2">"#, &["a", "b:c"] },
        single_quotes = { " a='x>y' xmlns:d='urn:d'>", &["a", "xmlns:d"] },
        spaces_around_equals = { " a = \"1\"\n  b\t=\t'2'/>", &["a", "b"] },
    )]
    fn attribute_names_of_start_tag(tag: &str, expected: &[&str]) {
        assert_eq!(start_tag_attribute_names(tag), expected);
    }
}
