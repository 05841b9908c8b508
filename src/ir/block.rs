//! Basic blocks.

use std::collections::HashSet;

use super::instr::Terminator;
use super::{BlockId, InstId, PhiId, TempId};

/// A basic block: an ordered list of phis, an ordered list of instructions,
/// and a terminator.
///
/// The `preds`/`succs`/dominator/liveness fields are filled in by the
/// analyses in [`crate::analysis`] and must be treated as stale until the
/// producing analysis has run since the block was last mutated.
#[derive(Debug, Clone)]
pub struct Block {
    /// Numeric id, unique within the owning module (assigned by the
    /// module's block-id counter).
    pub id: BlockId,
    /// Symbolic name without the leading `@`.
    pub name: String,
    pub phis: Vec<PhiId>,
    pub insts: Vec<InstId>,
    pub term: Terminator,
    /// Next block in source order (mirrors the original's linked list);
    /// `None` for the last block of the function.
    pub next: Option<BlockId>,

    // --- analysis-filled fields ---
    pub preds: Vec<BlockId>,
    pub succs: Vec<BlockId>,
    pub idom: Option<BlockId>,
    /// Direct children on the dominator tree (inverse of `idom`).
    pub doms: Vec<BlockId>,
    pub dom_frontier: Vec<BlockId>,
    pub live_in: HashSet<TempId>,
    pub live_out: HashSet<TempId>,
    /// Depth in the dominator tree (entry = 0).
    pub dom_depth: u32,
    /// Set of blocks this one dominates, direct or indirect (used by loop
    /// analyses to test "tail reachable without leaving head's region").
    pub dominates: HashSet<BlockId>,
}

impl Block {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            phis: Vec::new(),
            insts: Vec::new(),
            term: Terminator::FallThrough,
            next: None,
            preds: Vec::new(),
            succs: Vec::new(),
            idom: None,
            doms: Vec::new(),
            dom_frontier: Vec::new(),
            live_in: HashSet::new(),
            live_out: HashSet::new(),
            dom_depth: 0,
            dominates: HashSet::new(),
        }
    }

    /// Display name following the original's `get_name()`: the symbolic
    /// name, plus `.id` when `id != 0`.
    pub fn display_name(&self) -> String {
        if self.id.0 == 0 {
            self.name.clone()
        } else {
            format!("{}.{}", self.name, self.id.0)
        }
    }

    /// True once a dominator exists other than `self`.
    pub fn has_idom(&self) -> bool {
        self.idom.is_some()
    }
}
