//! Function-level analyses (§4.2): CFG edges, dominators, dominance
//! frontier, use-def chains, liveness, live intervals, and leaf/inline
//! flags. Each analysis reads the current IR and writes designated
//! derived fields on [`crate::ir::Function`]/[`crate::ir::Block`].

pub mod cfg;
pub mod dominators;
pub mod flags;
pub mod intervals;
pub mod liveness;
pub mod usedef;

pub use cfg::compute_cfg_edges;
pub use dominators::{compute_dominance_frontier, compute_dominator_tree, compute_rpo};
pub use flags::compute_leaf_and_inline_flags;
pub use intervals::{compute_live_intervals, LiveInterval};
pub use liveness::compute_liveness;
pub use usedef::fill_uses;

use crate::ir::{Context, Function};

/// Run every analysis over `func` in the dependency order each one needs:
/// CFG edges before RPO/dominators, dominators before dominance frontier,
/// use-def before liveness, liveness before live intervals.
pub fn analyze(func: &mut Function, ctx: &Context) -> Vec<LiveInterval> {
    compute_cfg_edges(func);
    compute_rpo(func);
    compute_dominator_tree(func);
    compute_dominance_frontier(func);
    compute_leaf_and_inline_flags(func, ctx);
    fill_uses(func);
    compute_liveness(func);
    compute_live_intervals(func)
}
