//! C4 — the node record: a tagged `Node` value plus a read-only `DomRead`
//! trait surface.
//!
//! spec.md §9 flags the teacher's own design (one `NodeImpl` struct behind a
//! dozen narrow DOM traits, held in `Rc<RefCell<_>>` for interior
//! mutability) as unsuited to this crate's read-mostly, GID-addressed
//! storage model, and asks instead for "a tagged variant plus a thin trait
//! for the operations every node shares". This module is that redesign:
//! `Node` is a plain enum over the five node kinds the codec knows about
//! (spec.md §2), `DomRead` is the shared read surface, and `DomMutate` is
//! declared but never implemented — mutation requests surface
//! [`Error::NotSupported`](crate::error::Error::NotSupported) the way the
//! teacher's own `trait_impls.rs` does for operations DOM Level 2 says a
//! read-only node must reject.

use log::trace;

use crate::document::DocumentHandle;
use crate::error::{Error, Result};
use crate::gid::Gid;
use crate::qname::QName;

/// Attribute value typing, carried in the codec payload (spec.md §2.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Cdata = 0,
    Id = 1,
    IdRef = 2,
    NmToken = 3,
}

impl AttributeType {
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            0 => Some(Self::Cdata),
            1 => Some(Self::Id),
            2 => Some(Self::IdRef),
            3 => Some(Self::NmToken),
            _ => None,
        }
    }
}

/// The variant-specific payload decoded from a node record's bytes
/// (spec.md §2: "the payload layout is fixed per node type").
#[derive(Debug, Clone)]
pub enum NodeFields {
    Element {
        name_ref: u32,
        attribute_count: u8,
        child_count: u32,
    },
    Attribute {
        name_ref: u32,
        attr_type: AttributeType,
        value: String,
    },
    Text {
        value: String,
    },
    Comment {
        value: String,
    },
    ProcessingInstruction {
        target: String,
        data: String,
    },
}

/// A decoded node record, addressed by `gid` within `owner`.
///
/// `owner` is a weak back-reference (spec.md §5.4: "a node must not keep its
/// owning document alive"); resolving it after the document has dropped
/// yields [`Error::NoSuchGid`].
#[derive(Debug, Clone)]
pub struct Node {
    gid: Gid,
    owner: DocumentHandle,
    name: Option<QName>,
    fields: NodeFields,
}

impl Node {
    /// Assemble a `Node` from a codec-decoded payload. Not public API —
    /// callers go through [`crate::codec::deserialize`] or a `Document`.
    pub(crate) fn from_decoded(
        gid: Gid,
        owner: DocumentHandle,
        name: Option<QName>,
        fields: NodeFields,
    ) -> Self {
        Self {
            gid,
            owner,
            name,
            fields,
        }
    }

    pub fn gid(&self) -> Gid {
        self.gid
    }

    pub fn owner(&self) -> &DocumentHandle {
        &self.owner
    }

    pub fn fields(&self) -> &NodeFields {
        &self.fields
    }

    /// The DOM `nodeType` numeral (spec.md §5.1; matches the teacher's own
    /// `NodeType` enum discriminants for the kinds this crate models).
    pub fn node_type(&self) -> u16 {
        match &self.fields {
            NodeFields::Element { .. } => 1,
            NodeFields::Attribute { .. } => 2,
            NodeFields::Text { .. } => 3,
            NodeFields::ProcessingInstruction { .. } => 7,
            NodeFields::Comment { .. } => 8,
        }
    }
}

/// The read-only operations shared by every node kind (spec.md §5.1,
/// narrowed from the teacher's `Node` trait to what a tagged record can
/// answer without walking back into the owning document's page store).
pub trait DomRead {
    fn gid(&self) -> Gid;
    fn node_type(&self) -> u16;
    fn name(&self) -> Option<&QName>;
    fn node_value(&self) -> Option<String>;

    /// `parentNode().gid()`, or `Gid::NONE` at the document root
    /// (spec.md §4.3).
    fn parent_gid(&self) -> Result<Gid>;
}

impl DomRead for Node {
    fn gid(&self) -> Gid {
        self.gid
    }

    fn node_type(&self) -> u16 {
        Node::node_type(self)
    }

    fn name(&self) -> Option<&QName> {
        self.name.as_ref()
    }

    fn node_value(&self) -> Option<String> {
        match &self.fields {
            NodeFields::Text { value } | NodeFields::Comment { value } => Some(value.clone()),
            NodeFields::ProcessingInstruction { data, .. } => Some(data.clone()),
            NodeFields::Attribute { value, .. } => Some(value.clone()),
            NodeFields::Element { .. } => None,
        }
    }

    fn parent_gid(&self) -> Result<Gid> {
        self.owner.with_order_table(|table| table.parent(self.gid))?
    }
}

/// Mutation surface declared for DOM Level 2 API parity and left
/// unimplemented (spec.md §9 Non-goals: "mutation of a loaded document").
/// Every method's only possible return is [`Error::NotSupported`]; the
/// trait exists so callers coming from a mutable-DOM background get a
/// compile-time-visible surface rather than a missing method.
pub trait DomMutate {
    fn set_node_value(&mut self, value: &str) -> Result<()>;
    fn insert_before(&mut self, new_child: Node, ref_child: Option<&Node>) -> Result<Node>;
    fn remove_child(&mut self, old_child: &Node) -> Result<Node>;
}

/// Every call routes here; named per the teacher's `MSG_INDEX_SIZE`-style
/// message constants in `trait_impls.rs`.
pub(crate) fn reject_mutation(op: &'static str) -> Result<()> {
    trace!(target: "xml_gid_store::node", "{}: {op}", crate::MSG_NOT_SUPPORTED);
    Err(Error::NotSupported(op))
}

impl DomMutate for Node {
    fn set_node_value(&mut self, _value: &str) -> Result<()> {
        reject_mutation("setNodeValue")
    }

    fn insert_before(&mut self, _new_child: Node, _ref_child: Option<&Node>) -> Result<Node> {
        reject_mutation("insertBefore")?;
        unreachable!()
    }

    fn remove_child(&mut self, _old_child: &Node) -> Result<Node> {
        reject_mutation("removeChild")?;
        unreachable!()
    }
}

/// `getLastNode(iterator, node)` (spec.md §4.4): the rightmost, deepest
/// descendant of `node`, found by driving `nodes` — a lazy, document-order
/// sequence of the nodes that make up `node`'s subtree, one per
/// `childCount` slot at every level (spec.md §9) — depth-first. If the
/// sequence runs dry before a declared `childCount` is satisfied, the
/// subtree is short and this fails with [`Error::TruncatedSubtree`] rather
/// than returning a partial answer.
pub fn get_last_node<I>(nodes: &mut I, node: &Node) -> Result<Node>
where
    I: Iterator<Item = Result<Node>>,
{
    let child_count = match &node.fields {
        NodeFields::Element { child_count, .. } => *child_count as usize,
        _ => 0,
    };
    let mut last = node.clone();
    for yielded in 0..child_count {
        let child = nodes
            .next()
            .ok_or(Error::TruncatedSubtree {
                expected: child_count,
                yielded,
            })??;
        last = get_last_node(nodes, &child)?;
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentHandle;

    #[test]
    fn mutation_is_rejected_not_panicking() {
        let mut node = Node::from_decoded(
            Gid(1),
            DocumentHandle::dangling(),
            Some(QName::local("#text")),
            NodeFields::Text {
                value: "hi".to_string(),
            },
        );
        let err = node.set_node_value("bye").unwrap_err();
        assert!(matches!(err, Error::NotSupported("setNodeValue")));
    }

    #[test]
    fn node_type_matches_dom_level_2_numerals() {
        let text = Node::from_decoded(
            Gid(1),
            DocumentHandle::dangling(),
            None,
            NodeFields::Text {
                value: String::new(),
            },
        );
        assert_eq!(DomRead::node_type(&text), 3);
    }

    fn element(gid: u64, child_count: u32) -> Node {
        Node::from_decoded(
            Gid(gid),
            DocumentHandle::dangling(),
            Some(QName::local("e")),
            NodeFields::Element {
                name_ref: 0,
                attribute_count: 0,
                child_count,
            },
        )
    }

    #[test]
    fn get_last_node_finds_rightmost_deepest_descendant() {
        let root = element(1, 2);
        let child_a = element(2, 0);
        let child_b = element(3, 1);
        let grandchild = element(4, 0);
        let mut nodes = vec![Ok(child_a), Ok(child_b), Ok(grandchild.clone())].into_iter();

        let last = get_last_node(&mut nodes, &root).unwrap();
        assert_eq!(last.gid(), grandchild.gid());
    }

    #[test]
    fn get_last_node_reports_truncated_subtree() {
        let root = element(1, 2);
        let child_a = element(2, 0);
        let mut nodes = vec![Ok(child_a)].into_iter();

        let err = get_last_node(&mut nodes, &root).unwrap_err();
        assert!(matches!(
            err,
            Error::TruncatedSubtree {
                expected: 2,
                yielded: 1
            }
        ));
    }
}
