// Copyright (c) 2023 The NemID Verifier Developers

//! Inclusive [Canonical XML 1.0](https://www.w3.org/TR/2001/REC-xml-c14n-20010315)
//! without comments.
//!
//! The input is treated as a complete document. Fragments cut out of a larger
//! document need every in-scope namespace declared on their root element to
//! canonicalize the same way they would in place.

use roxmltree::{Attribute, Document, Node, NodeType, ParsingOptions};
use std::collections::BTreeMap;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace declarations in scope, keyed by prefix with `""` for the
/// default namespace.
type Namespaces<'a> = BTreeMap<&'a str, &'a str>;

/// Canonicalize the XML document `xml`.
///
/// Returns `None` when `xml` is not a well formed UTF-8 document.
pub fn canonicalize(xml: &[u8]) -> Option<Vec<u8>> {
    let text = core::str::from_utf8(xml).ok()?;
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(text, options).ok()?;

    let mut output = String::with_capacity(text.len());
    for node in document.root().children() {
        match node.node_type() {
            NodeType::Element => write_element(node, &Namespaces::new(), &mut output),
            NodeType::PI => {
                // Outside the document element PIs are separated from it by
                // a line feed.
                if node.prev_siblings().any(|sibling| sibling.is_element()) {
                    output.push('\n');
                }
                write_processing_instruction(node, &mut output);
                if node.next_siblings().any(|sibling| sibling.is_element()) {
                    output.push('\n');
                }
            }
            _ => {}
        }
    }
    Some(output.into_bytes())
}

fn write_element<'a>(
    node: Node<'a, '_>,
    parent_namespaces: &Namespaces<'a>,
    output: &mut String,
) {
    let namespaces = in_scope_namespaces(node);
    let name = qualified_name(node);

    output.push('<');
    output.push_str(name);

    if parent_namespaces.contains_key("") && !namespaces.contains_key("") {
        output.push_str(" xmlns=\"\"");
    }
    for (prefix, uri) in &namespaces {
        if parent_namespaces.get(prefix) == Some(uri) {
            continue;
        }
        if prefix.is_empty() {
            output.push_str(" xmlns=\"");
        } else {
            output.push_str(" xmlns:");
            output.push_str(prefix);
            output.push_str("=\"");
        }
        escape_attribute(uri, output);
        output.push('"');
    }

    let mut attributes = node
        .attributes()
        .map(|attribute| {
            let namespace = attribute.namespace().unwrap_or("");
            (namespace, attribute.name(), attribute)
        })
        .collect::<Vec<_>>();
    attributes.sort_by(|(a_namespace, a_name, _), (b_namespace, b_name, _)| {
        (a_namespace, a_name).cmp(&(b_namespace, b_name))
    });
    for (namespace, local_name, attribute) in attributes {
        output.push(' ');
        match source_attribute_name(node, &attribute) {
            Some(name) => output.push_str(name),
            None => {
                if !namespace.is_empty() {
                    let prefix = if namespace == XML_NAMESPACE {
                        Some("xml")
                    } else {
                        node.lookup_prefix(namespace)
                    };
                    if let Some(prefix) = prefix {
                        output.push_str(prefix);
                        output.push(':');
                    }
                }
                output.push_str(local_name);
            }
        }
        output.push_str("=\"");
        escape_attribute(attribute.value(), output);
        output.push('"');
    }
    output.push('>');

    for child in node.children() {
        match child.node_type() {
            NodeType::Element => write_element(child, &namespaces, output),
            NodeType::Text => escape_text(child.text().unwrap_or_default(), output),
            NodeType::PI => write_processing_instruction(child, output),
            _ => {}
        }
    }

    output.push_str("</");
    output.push_str(name);
    output.push('>');
}

fn in_scope_namespaces<'a>(node: Node<'a, '_>) -> Namespaces<'a> {
    node.namespaces()
        .filter(|namespace| !namespace.uri().is_empty())
        .map(|namespace| (namespace.name().unwrap_or(""), namespace.uri()))
        .filter(|(prefix, _)| *prefix != "xml")
        .collect()
}

/// The element name as written in the source, prefix included.
fn qualified_name<'input>(node: Node<'_, 'input>) -> &'input str {
    let source = node.document().input_text();
    let start_tag = source.get(node.range()).unwrap_or_default();
    let start_tag = start_tag.strip_prefix('<').unwrap_or(start_tag);
    let end = start_tag
        .find(|c: char| c.is_ascii_whitespace() || c == '/' || c == '>')
        .unwrap_or(start_tag.len());
    &start_tag[..end]
}

/// The attribute name as written in the source, prefix included.
///
/// Several prefixes may be bound to the same namespace, so the prefix can
/// not be recovered from the namespace alone.
fn source_attribute_name<'input>(
    node: Node<'_, 'input>,
    attribute: &Attribute<'_, 'input>,
) -> Option<&'input str> {
    let source = node.document().input_text();
    source
        .get(attribute.range_qname())
        .filter(|name| name.ends_with(attribute.name()))
}

fn write_processing_instruction(node: Node<'_, '_>, output: &mut String) {
    let Some(pi) = node.pi() else {
        return;
    };
    output.push_str("<?");
    output.push_str(pi.target);
    if let Some(value) = pi.value.filter(|value| !value.is_empty()) {
        output.push(' ');
        for c in value.chars() {
            match c {
                '\r' => output.push_str("&#xD;"),
                c => output.push(c),
            }
        }
    }
    output.push_str("?>");
}

fn escape_text(text: &str, output: &mut String) {
    for c in text.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '\r' => output.push_str("&#xD;"),
            c => output.push(c),
        }
    }
}

fn escape_attribute(value: &str, output: &mut String) {
    for c in value.chars() {
        match c {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '"' => output.push_str("&quot;"),
            '\t' => output.push_str("&#x9;"),
            '\n' => output.push_str("&#xA;"),
            '\r' => output.push_str("&#xD;"),
            c => output.push(c),
        }
    }
}
