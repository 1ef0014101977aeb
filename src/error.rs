//! Error kinds surfaced by the core node-addressing and storage model.
//!
//! Mirrors the teacher's own `error.rs` convention of one flat enum behind a
//! crate-wide `Result<T>` alias, propagated with `?` and never swallowed
//! (spec.md §7).

use thiserror::Error;

/// Crate-wide result alias, matching the teacher's `type Result<T> = ...`.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds named in spec.md §7 ("Error Handling Design").
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A mutation was attempted on an immutable core node value.
    #[error("mutation not supported on core node value: {0}")]
    NotSupported(&'static str),

    /// A node's signature byte has no known type.
    #[error("corrupt node record: unknown signature byte 0x{signature:02x}")]
    CorruptNodeRecord { signature: u8 },

    /// A declared length prefix extends past the available bytes.
    #[error("truncated node record: need {needed} bytes, have {available}")]
    TruncatedRecord { needed: usize, available: usize },

    /// The subtree iterator driving `getLastNode` ended before the expected
    /// child count was reached.
    #[error("truncated subtree: expected {expected} children, iterator yielded {yielded}")]
    TruncatedSubtree { expected: usize, yielded: usize },

    /// Trigger configuration parameters are missing or malformed.
    #[error("invalid trigger configuration: {0}")]
    InvalidTriggerConfig(String),

    /// A document's observed branching at a level exceeds the configured
    /// `order[L]`.
    #[error("level {level} overflowed: order is {order}, observed {observed}")]
    OverflowingLevel {
        level: u32,
        order: u32,
        observed: u32,
    },

    /// A GID does not address any node known to the order table (e.g. `0`
    /// passed where a concrete node is required).
    #[error("no such gid: {0}")]
    NoSuchGid(u64),

    /// The order table itself is malformed (empty, or a level's order is 0).
    #[error("invalid order table: {0}")]
    InvalidOrderTable(&'static str),
}
