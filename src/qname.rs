//! C1 — the immutable QName value.
//!
//! Equality and hashing are defined over `(namespace_uri, local_name)` only;
//! `prefix` is carried for display purposes but never distinguishes two
//! otherwise-identical names. This mirrors the teacher's own `Name` type
//! being used as the key of `i_attributes: HashMap<Name, RefNode>` — the
//! value that participates in equality is exactly the value that must be
//! stable as a hash-map key.

use once_cell::sync::Lazy;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable `(namespace-URI, local-name, prefix)` triple.
///
/// `set_prefix` returns a new value rather than mutating in place (spec.md
/// §9: "Treat QName as immutable; `setPrefix` produces a new value").
#[derive(Debug, Clone)]
pub struct QName {
    namespace_uri: Option<String>,
    local_name: String,
    prefix: Option<String>,
}

impl QName {
    /// Construct a new QName from its three parts.
    pub fn new(
        namespace_uri: Option<impl Into<String>>,
        local_name: impl Into<String>,
        prefix: Option<impl Into<String>>,
    ) -> Self {
        Self {
            namespace_uri: namespace_uri.map(Into::into),
            local_name: local_name.into(),
            prefix: prefix.map(Into::into),
        }
    }

    /// Construct a QName with no namespace and no prefix.
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace_uri: None,
            local_name: local_name.into(),
            prefix: None,
        }
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns a new QName with the prefix replaced; see the type-level doc.
    pub fn set_prefix(&self, prefix: Option<impl Into<String>>) -> Self {
        Self {
            namespace_uri: self.namespace_uri.clone(),
            local_name: self.local_name.clone(),
            prefix: prefix.map(Into::into),
        }
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &Self) -> bool {
        self.namespace_uri == other.namespace_uri && self.local_name == other.local_name
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace_uri.hash(state);
        self.local_name.hash(state);
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local_name),
            None => write!(f, "{}", self.local_name),
        }
    }
}

/// The well-known stand-in name for text nodes, which carry no XML name.
pub static TEXT_QNAME: Lazy<QName> = Lazy::new(|| QName::local("#text"));

/// The well-known stand-in name for comment nodes, which carry no XML name.
pub static COMMENT_QNAME: Lazy<QName> = Lazy::new(|| QName::local("#comment"));
