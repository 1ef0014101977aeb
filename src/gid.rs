//! C3 — GID arithmetic over a document's level order table.
//!
//! spec.md §3/§4.3 define GID placement in terms of a per-document
//! `order[0..H]` table (the maximum branching factor assumed at each tree
//! level) and a derived `levelStart` table. All arithmetic here uses `u64`
//! throughout per invariant I-3 ("division and multiplication in C3 must use
//! an integer width wide enough that `order[L]` products never overflow
//! within the configured maximum depth").
//!
//! Resolution of an underspecified point (documented in `DESIGN.md`): the
//! spec's `parent`/`firstChild` formulas are stated symbolically and, taken
//! literally, use `order[L]` as the divisor in `parent(g)`; this only agrees
//! with the worked example in spec.md §8 scenario 1 when every level shares
//! the same order, which is not discriminating. This implementation instead
//! derives `parent`/`firstChild` from the unambiguous `levelStart`/`slots`
//! recurrence (`slots[L+1] = slots[L] * order[L]`), which reproduces the
//! worked example exactly and remains correct for heterogeneous order
//! tables: going from level `L` back to `L-1` divides by `order[L-1]`, the
//! same entry that was used to fan `L-1` out into `L`.

use crate::error::{Error, Result};

/// A document-scoped global identifier. `0` is reserved for "none" /
/// the root sentinel parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Gid(pub u64);

impl Gid {
    pub const NONE: Gid = Gid(0);

    pub fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for Gid {
    fn from(v: u64) -> Self {
        Gid(v)
    }
}

impl std::fmt::Display for Gid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-document level order table: `order[L]` is the maximum branching
/// factor assumed at tree level `L` (the number of children a level-`L`
/// node may have). Fixed at document creation; immutable thereafter
/// (spec.md §4.3: "it cannot be changed for an existing document").
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OrderTable {
    order: Vec<u32>,
    /// `level_start[L]` for `L` in `0..=order.len() + 1`.
    level_start: Vec<u64>,
}

impl OrderTable {
    /// Build the table from an observed or configured `order[0..H]` array.
    pub fn new(order: Vec<u32>) -> Result<Self> {
        if order.is_empty() {
            return Err(Error::InvalidOrderTable("order table must have at least one level"));
        }
        if order.iter().any(|&o| o == 0) {
            return Err(Error::InvalidOrderTable("order[L] must be nonzero"));
        }
        let mut level_start = Vec::with_capacity(order.len() + 2);
        level_start.push(1u64); // levelStart[0] = 1 (the document root)
        let mut slots: u64 = 1; // slots[0] = 1
        for &o in &order {
            level_start.push(level_start.last().unwrap() + slots);
            slots = slots
                .checked_mul(o as u64)
                .ok_or(Error::InvalidOrderTable("order table overflows u64 at configured depth"))?;
        }
        // One more boundary so the deepest configured level has an exclusive upper bound.
        level_start.push(level_start.last().unwrap() + slots);
        Ok(Self { order, level_start })
    }

    /// Maximum configured tree depth (number of levels below the root).
    pub fn max_depth(&self) -> usize {
        self.order.len()
    }

    /// `order[L]`, the branching factor fanning level `L` into level `L+1`.
    pub fn level_order(&self, level: usize) -> Result<u32> {
        self.order
            .get(level)
            .copied()
            .ok_or(Error::InvalidOrderTable("level has no configured order"))
    }

    /// `levelStart[L]`, the first GID belonging to level `L`.
    pub fn level_start(&self, level: usize) -> Result<Gid> {
        self.level_start
            .get(level)
            .copied()
            .map(Gid)
            .ok_or(Error::InvalidOrderTable("level is beyond configured depth"))
    }

    /// The tree level of a GID, found by locating the `levelStart` bracket
    /// it falls into.
    pub fn tree_level(&self, g: Gid) -> Result<usize> {
        if g.is_none() {
            return Err(Error::NoSuchGid(0));
        }
        for level in 0..=self.order.len() {
            let start = self.level_start[level];
            let end = self.level_start[level + 1];
            if g.0 >= start && g.0 < end {
                return Ok(level);
            }
        }
        Err(Error::NoSuchGid(g.0))
    }

    /// Reject a document whose observed branching at `level` exceeds the
    /// configured `order[level]` (spec.md §4.3: the SAX ingest path must
    /// reject such a document before assigning GIDs).
    pub fn check_fanout(&self, level: usize, observed: u32) -> Result<()> {
        let allowed = self.level_order(level)?;
        if observed > allowed {
            return Err(Error::OverflowingLevel {
                level: level as u32,
                order: allowed,
                observed,
            });
        }
        Ok(())
    }

    /// Parent GID of `g`. Returns `Gid::NONE` when `g` is the document root
    /// (spec.md §4.3: "If `g == levelStart[0]` the node is the document
    /// root; `parent` returns `0`").
    pub fn parent(&self, g: Gid) -> Result<Gid> {
        let level = self.tree_level(g)?;
        if level == 0 {
            return Ok(Gid::NONE);
        }
        let idx_in_level = g.0 - self.level_start[level];
        let fan = self.level_order(level - 1)? as u64;
        let parent_idx = idx_in_level / fan;
        Ok(Gid(self.level_start[level - 1] + parent_idx))
    }

    /// First child slot of `g`, defined even for leaves (spec.md §4.3:
    /// callers must check the node's `childCount` to know if the slot is
    /// actually occupied).
    pub fn first_child(&self, g: Gid) -> Result<Gid> {
        let level = self.tree_level(g)?;
        let fan = self.level_order(level)? as u64;
        let idx_in_level = g.0 - self.level_start[level];
        let child_start = self.level_start(level + 1)?;
        Ok(Gid(child_start.0 + idx_in_level * fan))
    }

    /// Start GID and slot-count of the sibling block `g` belongs to (the
    /// contiguous run of GIDs sharing `g`'s parent).
    fn sibling_block(&self, g: Gid) -> Result<(u64, u64)> {
        let level = self.tree_level(g)?;
        if level == 0 {
            return Ok((g.0, 1));
        }
        let fan = self.level_order(level - 1)? as u64;
        let idx_in_level = g.0 - self.level_start[level];
        let block_start = self.level_start[level] + (idx_in_level / fan) * fan;
        Ok((block_start, fan))
    }

    /// Next sibling of `g`, or `Gid::NONE` if `g` is the last child of its
    /// parent (spec.md §4.3).
    pub fn next_sibling(&self, g: Gid) -> Result<Gid> {
        let (block_start, block_len) = self.sibling_block(g)?;
        let next = g.0 + 1;
        if next < block_start + block_len {
            Ok(Gid(next))
        } else {
            Ok(Gid::NONE)
        }
    }

    /// Previous sibling of `g`, or `Gid::NONE` if `g` is the first child of
    /// its parent.
    pub fn previous_sibling(&self, g: Gid) -> Result<Gid> {
        let (block_start, _) = self.sibling_block(g)?;
        if g.0 > block_start {
            Ok(Gid(g.0 - 1))
        } else {
            Ok(Gid::NONE)
        }
    }
}
