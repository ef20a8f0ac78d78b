//! Axis enumeration and node tests.
//!
//! [`enumerate`] yields the candidate nodes of an axis in the axis's
//! *natural* order: document order for forward axes, reverse document order
//! (nearest first) for the reverse axes. Predicate positions count in this
//! natural order; callers flatten and re-sort into document order when the
//! result leaves predicate scope.
//!
//! [`matches`] applies a node test to one candidate. Name tests match the
//! axis's principal node kind only — elements, except on the attribute and
//! namespace axes. An unprefixed name test matches by qualified-name
//! equality; a prefixed test resolves its prefix in the context node's
//! in-scope namespaces and matches by expanded name.

use crate::tree::{Document, NodeId, NodeKind};

use super::ast::{Axis, NodeTest};

/// The principal node kind of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Principal {
    Element,
    Attribute,
    Namespace,
}

fn principal(axis: Axis) -> Principal {
    match axis {
        Axis::Attribute => Principal::Attribute,
        Axis::Namespace => Principal::Namespace,
        _ => Principal::Element,
    }
}

/// Returns the candidate nodes along `axis` from `node`, in the axis's
/// natural order.
pub(crate) fn enumerate(doc: &Document, node: NodeId, axis: Axis) -> Vec<NodeId> {
    match axis {
        Axis::Self_ => vec![node],
        Axis::Parent => doc.parent(node).into_iter().collect(),
        Axis::Child => doc.children(node).to_vec(),
        Axis::Descendant => doc.descendants(node).collect(),
        Axis::DescendantOrSelf => {
            let mut result = vec![node];
            result.extend(doc.descendants(node));
            result
        }
        Axis::Ancestor => doc.ancestors(node).skip(1).collect(),
        Axis::AncestorOrSelf => doc.ancestors(node).collect(),
        Axis::FollowingSibling => {
            let mut result = Vec::new();
            let mut current = doc.next_sibling(node);
            while let Some(sibling) = current {
                result.push(sibling);
                current = doc.next_sibling(sibling);
            }
            result
        }
        Axis::PrecedingSibling => {
            let mut result = Vec::new();
            let mut current = doc.prev_sibling(node);
            while let Some(sibling) = current {
                result.push(sibling);
                current = doc.prev_sibling(sibling);
            }
            result
        }
        Axis::Following => following_nodes(doc, node),
        Axis::Preceding => preceding_nodes(doc, node),
        Axis::Attribute => doc.attributes(node).to_vec(),
        Axis::Namespace => doc.in_scope_namespaces(node),
    }
}

/// All nodes after `node` in document order that are not its descendants.
///
/// From an attribute or namespace node the axis starts at the first child
/// of the owner element.
fn following_nodes(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let kind = &doc.node(node).kind;
    if kind.is_attribute() || kind.is_namespace() {
        let Some(owner) = doc.parent(node) else {
            return Vec::new();
        };
        let mut result: Vec<NodeId> = doc.descendants(owner).collect();
        result.extend(following_nodes(doc, owner));
        return result;
    }

    let mut result = Vec::new();
    // Following siblings and their subtrees, then up the ancestor chain.
    let mut anchor = Some(node);
    while let Some(current) = anchor {
        let mut sibling = doc.next_sibling(current);
        while let Some(s) = sibling {
            result.push(s);
            result.extend(doc.descendants(s));
            sibling = doc.next_sibling(s);
        }
        anchor = doc.parent(current);
    }
    result
}

/// All nodes before `node` in document order that are not its ancestors, in
/// reverse document order (nearest first).
///
/// From an attribute or namespace node the axis starts at the sibling
/// immediately before the owner element.
fn preceding_nodes(doc: &Document, node: NodeId) -> Vec<NodeId> {
    let kind = &doc.node(node).kind;
    if kind.is_attribute() || kind.is_namespace() {
        return match doc.parent(node) {
            Some(owner) => preceding_nodes(doc, owner),
            None => Vec::new(),
        };
    }

    let mut result = Vec::new();
    let mut anchor = Some(node);
    while let Some(current) = anchor {
        let mut sibling = doc.prev_sibling(current);
        while let Some(s) = sibling {
            // The subtree of `s` in reverse document order: descendants
            // reversed, then `s` itself.
            let descendants: Vec<NodeId> = doc.descendants(s).collect();
            result.extend(descendants.into_iter().rev());
            result.push(s);
            sibling = doc.prev_sibling(s);
        }
        anchor = doc.parent(current);
    }
    result
}

/// Returns `true` if `candidate` passes `test` for a step along `axis`
/// whose context node is `context`.
pub(crate) fn matches(
    doc: &Document,
    candidate: NodeId,
    test: &NodeTest,
    axis: Axis,
    context: NodeId,
) -> bool {
    let kind = &doc.node(candidate).kind;
    match test {
        NodeTest::Node => true,
        NodeTest::Text => kind.is_text(),
        NodeTest::Comment => matches!(kind, NodeKind::Comment { .. }),
        NodeTest::ProcessingInstruction(target) => match kind {
            NodeKind::ProcessingInstruction { target: t, .. } => {
                target.as_ref().is_none_or(|expected| t == expected)
            }
            _ => false,
        },
        NodeTest::Wildcard => is_principal(kind, axis),
        NodeTest::Name(name) => {
            if !is_principal(kind, axis) {
                return false;
            }
            doc.node_name(candidate).as_deref() == Some(name.as_str())
        }
        NodeTest::PrefixWildcard(prefix) => {
            if !is_principal(kind, axis) {
                return false;
            }
            let Some(uri) = resolve_context_prefix(doc, context, prefix) else {
                return false;
            };
            bound_namespace_uri(doc, candidate).is_some_and(|candidate_uri| candidate_uri == uri)
        }
        NodeTest::PrefixName(prefix, local) => {
            if !is_principal(kind, axis) {
                return false;
            }
            if doc.local_name(candidate) != Some(local.as_str()) {
                return false;
            }
            let Some(uri) = resolve_context_prefix(doc, context, prefix) else {
                return false;
            };
            bound_namespace_uri(doc, candidate).is_some_and(|candidate_uri| candidate_uri == uri)
        }
    }
}

fn is_principal(kind: &NodeKind, axis: Axis) -> bool {
    match principal(axis) {
        Principal::Element => kind.is_element(),
        Principal::Attribute => kind.is_attribute(),
        Principal::Namespace => kind.is_namespace(),
    }
}

/// Resolves a name-test prefix against the context node's in-scope
/// namespaces.
fn resolve_context_prefix(doc: &Document, context: NodeId, prefix: &str) -> Option<String> {
    let ns = doc.lookup_namespace(context, prefix)?;
    doc.namespace_uri(ns).map(str::to_string)
}

/// The namespace URI bound to an element or attribute, if any.
fn bound_namespace_uri(doc: &Document, id: NodeId) -> Option<&str> {
    let ns = match &doc.node(id).kind {
        NodeKind::Element { namespace, .. } | NodeKind::Attribute { namespace, .. } => {
            (*namespace)?
        }
        _ => return None,
    };
    doc.namespace_uri(ns)
}
