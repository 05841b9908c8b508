//! SSA construction (§4.3): Mem2Reg, phi insertion, and renaming.

pub mod mem2reg;
pub mod phi_insertion;
pub mod rename;

use crate::error::Fatal;
use crate::ir::Function;

/// Run the full three-stage pipeline over one function: promote
/// eligible stack slots to temporaries, insert phis at their iterated
/// dominance frontiers, then rename into single-assignment form.
///
/// Requires `compute_cfg_edges`, `compute_rpo`, and
/// `compute_dominator_tree`/`compute_dominance_frontier` to have already
/// run on `func`.
pub fn construct_ssa(func: &mut Function) -> Result<(), Fatal> {
    let promoted = mem2reg::promote(func)?;
    let mut phi_owner = std::collections::HashMap::new();
    for var in &promoted {
        for phi in phi_insertion::insert_phis(func, *var) {
            phi_owner.insert(phi, *var);
        }
    }
    rename::rename(func, &promoted, &phi_owner);
    Ok(())
}
