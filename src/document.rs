//! C5 — the document model: a document's order table, symbol table, node
//! broker, and the handful of tree-shaped queries that sit above C3/C4.
//!
//! Grounded on the teacher's `Document`/`Implementation` split in
//! `traits.rs`: there, `Implementation` is the factory that owns creation
//! policy while `Document` answers queries over an already-built tree. Here
//! `Document` plays both roles because there is no in-memory mutable tree to
//! separate a builder from — a `Document` is a handle onto a `Broker`
//! (spec.md §5.3: "a document never holds node bytes itself; it is an
//! index into a node store").

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Error, Result};
use crate::gid::{Gid, OrderTable};
use crate::node::{DomRead, Node};
use crate::qname::QName;

/// Persisted document identity and configuration (spec.md §1 ambient
/// config: "documents carry an immutable description of their own shape").
/// This is the one piece of configuration this crate loads/saves, and it
/// does so as data, not as a config-file format — `serde` only, no config
/// crate sits in front of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub id: String,
    pub collection_path: String,
    pub order: Vec<u32>,
}

/// Storage seam between a `Document` and wherever node bytes actually live
/// (spec.md §5.3's "broker"). Production code backs this with a paged
/// store; tests use [`InMemoryBroker`].
pub trait Broker: fmt::Debug {
    fn load(&self, gid: Gid) -> Result<Vec<u8>>;
    fn store(&mut self, gid: Gid, bytes: Vec<u8>) -> Result<()>;
}

/// An in-memory [`Broker`] test double, grounded on the teacher's own
/// `dom_impl` test fixtures (plain `HashMap`-backed state, no I/O).
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    records: HashMap<u64, Vec<u8>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Broker for InMemoryBroker {
    fn load(&self, gid: Gid) -> Result<Vec<u8>> {
        self.records
            .get(&gid.0)
            .cloned()
            .ok_or(Error::NoSuchGid(gid.0))
    }

    fn store(&mut self, gid: Gid, bytes: Vec<u8>) -> Result<()> {
        self.records.insert(gid.0, bytes);
        Ok(())
    }
}

/// Interned `nameRef` table, shared by every node record in a document
/// (spec.md §2.3: "`nameRef` is a document-local integer, stable for the
/// document's lifetime").
#[derive(Debug, Default)]
pub struct SymbolTable {
    by_ref: Vec<QName>,
    by_name: HashMap<(Option<String>, String), u32>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &QName) -> u32 {
        let key = (
            name.namespace_uri().map(str::to_string),
            name.local_name().to_string(),
        );
        if let Some(&existing) = self.by_name.get(&key) {
            return existing;
        }
        let id = self.by_ref.len() as u32;
        self.by_ref.push(name.clone());
        self.by_name.insert(key, id);
        id
    }

    pub fn lookup(&self, name_ref: u32) -> Option<QName> {
        self.by_ref.get(name_ref as usize).cloned()
    }
}

struct DocumentCore {
    metadata: DocumentMetadata,
    order_table: OrderTable,
    symbols: RefCell<SymbolTable>,
    broker: RefCell<Box<dyn Broker>>,
    /// Cache of `(gid -> child_gid span length)` computed while walking
    /// subtrees, so repeated `to_sax`/`get_last_node` calls over the same
    /// region don't re-decode every record (spec.md §10: concurrency model
    /// permits caching that is safe under single-writer/multi-reader).
    span_cache: RefCell<HashMap<u64, u32>>,
}

impl fmt::Debug for DocumentCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCore")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// A weak back-reference a [`Node`](crate::node::Node) carries to its
/// owning document (spec.md §5.4), so nodes never keep a document alive.
#[derive(Debug, Clone)]
pub struct DocumentHandle {
    core: Weak<DocumentCore>,
}

impl DocumentHandle {
    /// A handle with nothing behind it, for constructing standalone `Node`
    /// values in unit tests that never query the owning document.
    pub fn dangling() -> Self {
        Self { core: Weak::new() }
    }

    pub fn with_order_table<T>(&self, f: impl FnOnce(&OrderTable) -> T) -> Result<T> {
        let core = self.core.upgrade().ok_or(Error::NoSuchGid(0))?;
        Ok(f(&core.order_table))
    }
}

/// A handle onto one XML document's shape and node store.
///
/// `Document` is cheap to clone (an `Rc` bump); cloning does not clone the
/// underlying broker or symbol table (spec.md §10: readers share state,
/// they don't copy it).
#[derive(Debug, Clone)]
pub struct Document {
    core: Rc<DocumentCore>,
}

impl Document {
    pub fn new(metadata: DocumentMetadata, broker: Box<dyn Broker>) -> Result<Self> {
        let order_table = OrderTable::new(metadata.order.clone())?;
        debug!(
            target: "xml_gid_store::document",
            "opened document {} at {} (max_depth={})",
            metadata.id,
            metadata.collection_path,
            order_table.max_depth()
        );
        Ok(Self {
            core: Rc::new(DocumentCore {
                metadata,
                order_table,
                symbols: RefCell::new(SymbolTable::new()),
                broker: RefCell::new(broker),
                span_cache: RefCell::new(HashMap::new()),
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.core.metadata.id
    }

    pub fn collection_path(&self) -> &str {
        &self.core.metadata.collection_path
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.core.metadata
    }

    pub fn handle(&self) -> DocumentHandle {
        DocumentHandle {
            core: Rc::downgrade(&self.core),
        }
    }

    pub fn order_table(&self) -> &OrderTable {
        &self.core.order_table
    }

    pub fn intern(&self, name: &QName) -> u32 {
        self.core.symbols.borrow_mut().intern(name)
    }

    pub fn resolve_name(&self, name_ref: u32) -> Option<QName> {
        self.core.symbols.borrow().lookup(name_ref)
    }

    /// Write a node's encoded bytes into the broker at `gid`, interning its
    /// name first if it has one.
    pub fn put_node(&self, gid: Gid, fields: crate::node::NodeFields) -> Result<()> {
        let bytes = codec::serialize(&fields);
        self.core.span_cache.borrow_mut().remove(&gid.0);
        self.core.broker.borrow_mut().store(gid, bytes)
    }

    /// Decode the node stored at `gid`.
    pub fn get_node(&self, gid: Gid) -> Result<Node> {
        let bytes = self.core.broker.borrow().load(gid)?;
        let handle = self.handle();
        codec::deserialize(&bytes, gid, handle, |name_ref| self.resolve_name(name_ref))
    }

    pub fn get_tree_level(&self, gid: Gid) -> Result<usize> {
        self.core.order_table.tree_level(gid)
    }

    pub fn get_level_start_point(&self, level: usize) -> Result<Gid> {
        self.core.order_table.level_start(level)
    }

    pub fn get_level_order(&self, level: usize) -> Result<u32> {
        self.core.order_table.level_order(level)
    }

    pub fn get_parent(&self, gid: Gid) -> Result<Gid> {
        self.core.order_table.parent(gid)
    }

    pub fn get_previous_sibling(&self, gid: Gid) -> Result<Gid> {
        self.core.order_table.previous_sibling(gid)
    }

    pub fn get_following_sibling(&self, gid: Gid) -> Result<Gid> {
        self.core.order_table.next_sibling(gid)
    }

    /// The `/`-joined sequence of ancestor local names from the root down
    /// to `gid`, e.g. `/root/child/grandchild` (spec.md §4.4, §8 scenario
    /// 6). The root node itself reports as `/root`.
    pub fn get_path(&self, gid: Gid) -> Result<String> {
        let chain = self.ancestor_chain(gid)?;
        let mut path = String::new();
        for ancestor in chain {
            let node = self.get_node(ancestor)?;
            let name = node
                .name()
                .map(|n| n.local_name().to_string())
                .unwrap_or_else(|| "#unnamed".to_string());
            path.push('/');
            path.push_str(&name);
        }
        Ok(path)
    }

    /// Root-to-`gid` inclusive chain of ancestor GIDs.
    fn ancestor_chain(&self, gid: Gid) -> Result<Vec<Gid>> {
        let mut chain = vec![gid];
        let mut current = gid;
        loop {
            let parent = self.core.order_table.parent(current)?;
            if parent.is_none() {
                break;
            }
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        Ok(chain)
    }

    /// Document order comparison between two GIDs of this document
    /// (spec.md §8's `getPath`/document-order family): GIDs within one
    /// level's sibling block are numerically ordered by construction, so
    /// comparing root-to-node ancestor chains lexicographically (shorter
    /// chain, i.e. the ancestor, sorts first on a shared prefix) reproduces
    /// pre-order without re-walking the tree.
    pub fn document_order(&self, a: Gid, b: Gid) -> Result<std::cmp::Ordering> {
        if a == b {
            return Ok(std::cmp::Ordering::Equal);
        }
        let chain_a = self.ancestor_chain(a)?;
        let chain_b = self.ancestor_chain(b)?;
        for (x, y) in chain_a.iter().zip(chain_b.iter()) {
            if x != y {
                return Ok(x.0.cmp(&y.0));
            }
        }
        Ok(chain_a.len().cmp(&chain_b.len()))
    }

    /// Re-emit the subtree rooted at `gid` as a sequence of SAX events on
    /// `handler` (spec.md §8 supplemented feature: a document can replay
    /// itself into any `ContentHandler`, not just the trigger filter).
    pub fn to_sax(&self, gid: Gid, handler: &mut dyn crate::sax::ContentHandler) -> Result<()> {
        handler.start_document()?;
        self.emit_subtree(gid, handler)?;
        handler.end_document()?;
        Ok(())
    }

    fn emit_subtree(&self, gid: Gid, handler: &mut dyn crate::sax::ContentHandler) -> Result<()> {
        let node = self.get_node(gid)?;
        match node.fields() {
            crate::node::NodeFields::Element { child_count, .. } => {
                let name = node
                    .name()
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "#unnamed".to_string());
                // Attribute nodes are not walked here (spec.md §9
                // Non-goals); downstream handlers see every element with
                // an empty attribute list.
                let no_attrs = crate::sax::SimpleAttributes::default();
                handler.start_element(&name, &no_attrs)?;
                let first_child = self.core.order_table.first_child(gid)?;
                for offset in 0..*child_count {
                    self.emit_subtree(Gid(first_child.0 + offset as u64), handler)?;
                }
                handler.end_element(&name)?;
                Ok(())
            }
            crate::node::NodeFields::Text { value } => handler.characters(value),
            crate::node::NodeFields::Comment { .. } | crate::node::NodeFields::ProcessingInstruction { .. } => {
                warn!(
                    target: "xml_gid_store::document",
                    "to_sax: skipping node kind {} not modeled by ContentHandler",
                    node.node_type()
                );
                Ok(())
            }
            crate::node::NodeFields::Attribute { .. } => Ok(()),
        }
    }
}
