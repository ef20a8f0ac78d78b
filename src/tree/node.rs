//! Node type definitions.
//!
//! The `NodeKind` enum covers the nine node variants of the document tree.
//! Each variant carries its node-specific payload; tree structure (parent
//! link, child list, sibling index) is stored in `NodeData`, not here.

use super::NodeId;
use std::fmt;

/// A qualified name: an optional prefix and a local part.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Namespace prefix, if any (e.g., `"svg"` in `svg:rect`).
    pub prefix: Option<String>,
    /// The local part of the name.
    pub local: String,
}

impl QName {
    /// Creates a qualified name with a prefix.
    #[must_use]
    pub fn new(prefix: Option<String>, local: impl Into<String>) -> Self {
        Self {
            prefix,
            local: local.into(),
        }
    }

    /// Creates a qualified name with no prefix.
    #[must_use]
    pub fn local(local: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: local.into(),
        }
    }

    /// Returns the qualified form: `prefix:local`, or just `local` when
    /// there is no prefix.
    #[must_use]
    pub fn qualified(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{}", self.local),
            None => self.local.clone(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{prefix}:")?;
        }
        f.write_str(&self.local)
    }
}

/// Which parser dialect produced an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementMode {
    /// Produced by the strict XML parser.
    Xml,
    /// Produced by the tolerant HTML parser.
    Html,
}

/// Derived element booleans, computed once when the element finishes
/// parsing. Mutation through the tree API does not recompute them; callers
/// that mutate must do so themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElementFlags {
    /// The element has at least one child node.
    pub has_child: bool,
    /// The element has at least one text child.
    pub has_text: bool,
    /// The element has at least one comment child.
    pub has_comment: bool,
    /// The element has at least one attribute.
    pub has_attribute: bool,
    /// The element was written as `<name/>` (or had no content).
    pub is_self_enclosing: bool,
    /// The element is an HTML void element (`<br>`, `<img>`, …).
    pub is_void: bool,
    /// The element has a bound namespace.
    pub is_namespaced: bool,
}

/// The kind of a tree node and its associated data.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The synthetic document container — exactly one per tree. Not the
    /// document element, but its unique parent.
    Root {
        /// The root's display name (configurable, default `"Document"`).
        name: String,
    },

    /// An element node, e.g., `<div class="x">`.
    Element {
        /// The element's qualified name.
        name: QName,
        /// Attribute nodes, in source order. Qualified names are unique.
        attributes: Vec<NodeId>,
        /// Namespace declarations written on this element, in source order.
        namespace_decls: Vec<NodeId>,
        /// The namespace bound to this element, resolved through the scope
        /// chain. A back reference into a declaration on this element or an
        /// ancestor.
        namespace: Option<NodeId>,
        /// Which parser dialect produced this element.
        mode: ElementMode,
        /// Derived booleans, computed at the end of element parsing.
        flags: ElementFlags,
    },

    /// An attribute. Its parent is an element or the XML declaration.
    Attribute {
        /// The attribute's qualified name.
        name: QName,
        /// The attribute value, verbatim.
        value: String,
        /// The namespace bound to the attribute's prefix, if any.
        namespace: Option<NodeId>,
    },

    /// A namespace declaration.
    Namespace {
        /// The declared prefix; empty for a default namespace.
        prefix: String,
        /// The namespace URI.
        uri: String,
        /// Declared as `xmlns="…"` (no prefix).
        is_default: bool,
        /// One of the reserved bindings seeded at the root (`xml`, `xmlns`).
        is_global: bool,
    },

    /// A text node. Characters are stored verbatim; entity references are
    /// not decoded.
    Text {
        /// The raw character content.
        content: String,
        /// The text came from a `<![CDATA[ … ]]>` section.
        is_cdata: bool,
        /// The raw lexeme contains an entity marker (`&`).
        has_entity: bool,
    },

    /// A comment node, e.g., `<!-- … -->`.
    Comment {
        /// The comment text (without the delimiters).
        content: String,
    },

    /// A processing instruction, e.g., `<?target value?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI value (may be empty).
        value: String,
    },

    /// A document type declaration.
    Doctype {
        /// The captured value: the document-type name, or the complete
        /// declaration text when structure preservation is on.
        value: String,
    },

    /// The XML declaration, e.g., `<?xml version="1.0"?>`. Carries ordered
    /// attribute nodes and is never nested.
    XmlDecl {
        /// The declaration's attribute nodes, in source order.
        attributes: Vec<NodeId>,
    },
}

impl NodeKind {
    /// Returns `true` for element nodes.
    #[must_use]
    pub fn is_element(&self) -> bool {
        matches!(self, Self::Element { .. })
    }

    /// Returns `true` for text nodes (including CDATA).
    #[must_use]
    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text { .. })
    }

    /// Returns `true` for attribute nodes.
    #[must_use]
    pub fn is_attribute(&self) -> bool {
        matches!(self, Self::Attribute { .. })
    }

    /// Returns `true` for namespace nodes.
    #[must_use]
    pub fn is_namespace(&self) -> bool {
        matches!(self, Self::Namespace { .. })
    }
}
