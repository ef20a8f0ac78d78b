//! Arena-based document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the [`Document`]
//! and are referenced by [`NodeId`] — a newtype over `NonZeroU32`. Dropping
//! the document frees the whole tree at once.
//!
//! # Document order
//!
//! Nodes are allocated during parsing in pre-order, with an element's
//! namespace declarations and attributes allocated directly after the
//! element and before its first child. The arena index therefore *is* the
//! document-order position: comparing two `NodeId`s compares document
//! positions. Positions are never renumbered after mutation — nodes created
//! after parsing sort after every parsed node, while comparisons among
//! surviving parsed nodes stay valid.
//!
//! # Structure
//!
//! Each node stores a parent back-link, an ordered child list, and its own
//! index within that list, so `doc.children(parent)[node.index] == node`
//! holds at all times. Insertion and removal reassign the indices of the
//! affected siblings in a single pass.

mod node;

pub use node::{ElementFlags, ElementMode, NodeKind, QName};

use crate::error::ParseDiagnostic;
use std::num::NonZeroU32;

/// A typed index into the document's node arena.
///
/// `NodeId` is a newtype over `NonZeroU32`: it can never be zero, and
/// `Option<NodeId>` is the same size as `NodeId`. `Ord` on `NodeId` is
/// document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from a raw arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    /// Returns the raw index as a `usize` for indexing into the arena.
    fn as_index(self) -> usize {
        self.0.get() as usize
    }

    /// Returns the node's document-order position.
    #[must_use]
    pub fn position(self) -> u32 {
        self.0.get()
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node, if any. The root node has no parent; an attribute or
    /// namespace node's parent is its owner element (or the XML
    /// declaration).
    pub parent: Option<NodeId>,
    /// Ordered child list. Attribute and namespace nodes are *not*
    /// children; they hang off the element payload.
    pub children: Vec<NodeId>,
    /// This node's offset within its parent's child list (or attribute
    /// list, for attribute and namespace nodes).
    pub index: usize,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            index: 0,
        }
    }
}

/// A parsed document.
///
/// The `Document` owns all nodes in an arena and provides tree navigation
/// and mutation. Navigation goes through `&Document`; mutation through
/// `&mut Document`. A document is not safe for concurrent mutation;
/// concurrent read-only queries over a shared `&Document` are.
#[derive(Debug)]
pub struct Document {
    /// The node arena. Index 0 is unused (placeholder for `NonZeroU32`).
    nodes: Vec<NodeData>,
    /// The root container node.
    root: NodeId,
    /// Set when parsing finished with zero warnings and zero errors.
    pub is_well_formed: bool,
    /// Diagnostics collected during parsing.
    pub diagnostics: Vec<ParseDiagnostic>,
    /// The reserved namespace nodes (`xml`, `xmlns`) seeded at the root by
    /// the XML parser. Empty for HTML documents.
    pub(crate) global_namespaces: Vec<NodeId>,
}

impl Document {
    /// Creates a new empty document whose root carries the given display
    /// name.
    #[must_use]
    pub fn new(document_name: impl Into<String>) -> Self {
        let name = document_name.into();
        let mut nodes = Vec::with_capacity(64);
        // Index 0: placeholder (NodeId uses NonZeroU32).
        nodes.push(NodeData::new(NodeKind::Root {
            name: String::new(),
        }));
        nodes.push(NodeData::new(NodeKind::Root { name }));
        let root = NodeId::from_index(1);
        Self {
            nodes,
            root,
            is_well_formed: true,
            diagnostics: Vec::new(),
            global_namespaces: Vec::new(),
        }
    }

    /// Returns the root container node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the document element (the first element child of the root).
    #[must_use]
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&id| self.node(id).kind.is_element())
    }

    /// Returns the XML declaration node, if the document had one.
    #[must_use]
    pub fn xml_decl(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&id| matches!(self.node(id).kind, NodeKind::XmlDecl { .. }))
    }

    /// Returns the document type declaration node, if the document had one.
    #[must_use]
    pub fn doctype(&self) -> Option<NodeId> {
        self.children(self.root)
            .iter()
            .copied()
            .find(|&id| matches!(self.node(id).kind, NodeKind::Doctype { .. }))
    }

    /// Returns a reference to the `NodeData` for the given node.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not refer to a valid node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    /// Returns a mutable reference to the `NodeData` for the given node.
    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns the qualified name of a node, if it has one.
    ///
    /// Elements and attributes return their qualified name, PIs their
    /// target, namespaces their prefix. Other kinds return `None`.
    #[must_use]
    pub fn node_name(&self, id: NodeId) -> Option<String> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => {
                Some(name.qualified())
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target.clone()),
            NodeKind::Namespace { prefix, .. } => Some(prefix.clone()),
            _ => None,
        }
    }

    /// Returns the local name of an element or attribute node.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. } | NodeKind::Attribute { name, .. } => {
                Some(name.local.as_str())
            }
            NodeKind::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Returns the text of a text, comment, PI, or doctype node.
    #[must_use]
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content, .. } | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { value, .. } | NodeKind::Doctype { value } => {
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns the concatenated text content of a node and its descendants.
    ///
    /// Only text (and CDATA) nodes contribute; comments and processing
    /// instructions do not.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut result = String::new();
        self.collect_text(id, &mut result);
        result
    }

    fn collect_text(&self, id: NodeId, buf: &mut String) {
        match &self.node(id).kind {
            NodeKind::Text { content, .. } => buf.push_str(content),
            NodeKind::Attribute { value, .. } => buf.push_str(value),
            _ => {
                for &child in self.children(id) {
                    self.collect_text(child, buf);
                }
            }
        }
    }

    // --- Attributes and namespaces ---

    /// Returns the attribute nodes of an element (empty for other kinds).
    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } | NodeKind::XmlDecl { attributes } => attributes,
            _ => &[],
        }
    }

    /// Returns the attribute node with the given qualified name.
    #[must_use]
    pub fn attribute_node(&self, id: NodeId, qualified: &str) -> Option<NodeId> {
        self.attributes(id).iter().copied().find(|&attr| {
            matches!(&self.node(attr).kind, NodeKind::Attribute { name, .. }
                if name.qualified() == qualified)
        })
    }

    /// Returns the value of the attribute with the given qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, qualified: &str) -> Option<&str> {
        let attr = self.attribute_node(id, qualified)?;
        match &self.node(attr).kind {
            NodeKind::Attribute { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Returns the namespace declarations written on an element.
    #[must_use]
    pub fn namespace_decls(&self, id: NodeId) -> &[NodeId] {
        match &self.node(id).kind {
            NodeKind::Element {
                namespace_decls, ..
            } => namespace_decls,
            _ => &[],
        }
    }

    /// Returns the in-scope namespace nodes at `id`: declarations on the
    /// node and its ancestors (nearest declaration wins per prefix), then
    /// the reserved global bindings.
    #[must_use]
    pub fn in_scope_namespaces(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen: Vec<&str> = Vec::new();
        let mut result = Vec::new();
        let mut current = Some(id);
        while let Some(n) = current {
            for &decl in self.namespace_decls(n) {
                if let NodeKind::Namespace { prefix, .. } = &self.node(decl).kind {
                    if !seen.contains(&prefix.as_str()) {
                        seen.push(prefix);
                        result.push(decl);
                    }
                }
            }
            current = self.parent(n);
        }
        for &global in &self.global_namespaces {
            if let NodeKind::Namespace { prefix, .. } = &self.node(global).kind {
                if !seen.contains(&prefix.as_str()) {
                    result.push(global);
                }
            }
        }
        result
    }

    /// Resolves a namespace prefix at `id` through the in-scope
    /// declarations. The empty prefix resolves the default namespace.
    #[must_use]
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<NodeId> {
        self.in_scope_namespaces(id).into_iter().find(|&ns| {
            matches!(&self.node(ns).kind, NodeKind::Namespace { prefix: p, .. } if p == prefix)
        })
    }

    /// Returns the URI of a namespace node.
    #[must_use]
    pub fn namespace_uri(&self, ns: NodeId) -> Option<&str> {
        match &self.node(ns).kind {
            NodeKind::Namespace { uri, .. } => Some(uri),
            _ => None,
        }
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the ordered children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Returns the first child of a node.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.first().copied()
    }

    /// Returns the last child of a node.
    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).children.last().copied()
    }

    /// Returns the next sibling of a node. Attribute and namespace nodes
    /// have no siblings.
    #[must_use]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let data = self.node(id);
        let parent = data.parent?;
        let siblings = &self.node(parent).children;
        // Attribute/namespace nodes are not in the child list.
        if siblings.get(data.index) != Some(&id) {
            return None;
        }
        siblings.get(data.index + 1).copied()
    }

    /// Returns the previous sibling of a node.
    #[must_use]
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let data = self.node(id);
        let parent = data.parent?;
        let siblings = &self.node(parent).children;
        if siblings.get(data.index) != Some(&id) || data.index == 0 {
            return None;
        }
        siblings.get(data.index - 1).copied()
    }

    /// Returns an iterator over a node and its ancestors (walking to the
    /// root).
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: Some(id),
        }
    }

    /// Returns an iterator over all descendants of a node in pre-order
    /// (attributes and namespaces excluded).
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.node(id).children.iter().rev().copied().collect(),
        }
    }

    // --- Mutation ---

    /// Allocates a new node in the arena and returns its `NodeId`.
    ///
    /// Nodes created after parsing sort after every parsed node in document
    /// order.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Appends a child node to the end of a parent's child list.
    ///
    /// # Panics
    ///
    /// Panics (debug builds) if `child` already has a parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );
        let index = self.node(parent).children.len();
        self.node_mut(parent).children.push(child);
        let data = self.node_mut(child);
        data.parent = Some(parent);
        data.index = index;
    }

    /// Inserts `new_child` before `reference` in the parent's child list,
    /// reassigning the indices of the following siblings in one pass.
    ///
    /// # Panics
    ///
    /// Panics if `reference` has no parent.
    #[allow(clippy::expect_used)]
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        let parent = self.node(reference).parent.expect("reference has no parent");
        let at = self.node(reference).index;
        self.node_mut(parent).children.insert(at, new_child);
        let data = self.node_mut(new_child);
        data.parent = Some(parent);
        data.index = at;
        self.reindex_from(parent, at + 1);
    }

    /// Detaches a node from its parent. The node stays allocated in the
    /// arena but is unreachable from the root.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };
        let at = self.node(id).index;
        if self.node(parent).children.get(at) == Some(&id) {
            self.node_mut(parent).children.remove(at);
            self.reindex_from(parent, at);
        }
        let data = self.node_mut(id);
        data.parent = None;
        data.index = 0;
    }

    /// Detaches a node from the tree (alias of [`detach`](Self::detach)).
    pub fn remove_node(&mut self, id: NodeId) {
        self.detach(id);
    }

    /// Reassigns the `index` field of the children of `parent` starting at
    /// `from`.
    fn reindex_from(&mut self, parent: NodeId, from: usize) {
        let children: Vec<NodeId> = self.node(parent).children[from..].to_vec();
        for (offset, child) in children.into_iter().enumerate() {
            self.node_mut(child).index = from + offset;
        }
    }

    /// Returns the total number of nodes in the arena (excluding the
    /// placeholder).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new("Document")
    }
}

// --- Iterators ---

/// Iterator over a node and its ancestors.
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).parent;
        Some(current)
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        for &child in self.doc.node(current).children.iter().rev() {
            self.stack.push(child);
        }
        Some(current)
    }
}
