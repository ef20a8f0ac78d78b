//! Markup serialization.
//!
//! The serialization hook every node exposes: [`render_node`] writes one
//! node (and its subtree) back to markup text, and [`render`] renders the
//! whole document. Character content and attribute values round-trip
//! verbatim — the parser stores them undecoded, so no entity transposition
//! happens here.
//!
//! Childless XML elements collapse to `<name/>`; HTML void elements render
//! without an end tag; other HTML elements always get an explicit end tag.

use crate::tree::{Document, ElementMode, NodeId, NodeKind};

/// Renders the whole document to markup text.
#[must_use]
pub fn render(doc: &Document) -> String {
    let mut out = String::new();
    for &child in doc.children(doc.root()) {
        render_node(doc, child, &mut out);
    }
    out
}

/// Renders one node (and its subtree) to `out`.
pub fn render_node(doc: &Document, id: NodeId, out: &mut String) {
    match &doc.node(id).kind {
        NodeKind::Root { .. } => {
            for &child in doc.children(id) {
                render_node(doc, child, out);
            }
        }
        NodeKind::Element {
            name,
            attributes,
            namespace_decls,
            mode,
            flags,
            ..
        } => {
            out.push('<');
            out.push_str(&name.qualified());
            for &ns in namespace_decls {
                out.push(' ');
                render_node(doc, ns, out);
            }
            for &attr in attributes {
                out.push(' ');
                render_node(doc, attr, out);
            }

            let children = doc.children(id);
            if children.is_empty() {
                match mode {
                    ElementMode::Xml => out.push_str("/>"),
                    ElementMode::Html => {
                        if flags.is_void {
                            out.push('>');
                        } else {
                            out.push('>');
                            out.push_str("</");
                            out.push_str(&name.qualified());
                            out.push('>');
                        }
                    }
                }
            } else {
                out.push('>');
                for &child in children {
                    render_node(doc, child, out);
                }
                out.push_str("</");
                out.push_str(&name.qualified());
                out.push('>');
            }
        }
        NodeKind::Attribute { name, value, .. } => {
            out.push_str(&name.qualified());
            out.push_str("=\"");
            out.push_str(value);
            out.push('"');
        }
        NodeKind::Namespace { prefix, uri, .. } => {
            if prefix.is_empty() {
                out.push_str("xmlns=\"");
            } else {
                out.push_str("xmlns:");
                out.push_str(prefix);
                out.push_str("=\"");
            }
            out.push_str(uri);
            out.push('"');
        }
        NodeKind::Text {
            content, is_cdata, ..
        } => {
            if *is_cdata {
                out.push_str("<![CDATA[");
                out.push_str(content);
                out.push_str("]]>");
            } else {
                out.push_str(content);
            }
        }
        NodeKind::Comment { content } => {
            out.push_str("<!--");
            out.push_str(content);
            out.push_str("-->");
        }
        NodeKind::ProcessingInstruction { target, value } => {
            out.push_str("<?");
            out.push_str(target);
            if !value.is_empty() {
                out.push(' ');
                out.push_str(value);
            }
            out.push_str("?>");
        }
        NodeKind::Doctype { value } => {
            // With structure preservation the value is the complete
            // declaration text; otherwise it is the document-type name.
            if value.starts_with("<!") {
                out.push_str(value);
            } else {
                out.push_str("<!DOCTYPE ");
                out.push_str(value);
                out.push('>');
            }
        }
        NodeKind::XmlDecl { attributes } => {
            out.push_str("<?xml");
            for &attr in attributes {
                out.push(' ');
                render_node(doc, attr, out);
            }
            out.push_str("?>");
        }
    }
}
