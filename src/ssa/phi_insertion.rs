//! Phi insertion (§4.3): the classical iterated-dominance-frontier
//! algorithm, applied to one promoted variable at a time.

use std::collections::HashSet;

use crate::ir::{BlockId, Function, Phi, PhiId, TempId, Value};

fn definition_blocks(func: &Function, var: TempId) -> Vec<BlockId> {
    let mut blocks = Vec::new();
    for block_id in func.blocks_in_order() {
        let defines = func
            .block(block_id)
            .insts
            .iter()
            .any(|id| func.inst(*id).dst == Some(var));
        if defines {
            blocks.push(block_id);
        }
    }
    blocks
}

/// Insert a phi for `var` at each block in its iterated dominance
/// frontier. Does nothing (returns an empty vector) if `var` is defined
/// in only one block. Each inserted phi has one argument per predecessor,
/// all initially pointing at `var` itself — the single pre-renaming SSA
/// name — for [`super::rename::rename`] to rewrite.
pub fn insert_phis(func: &mut Function, var: TempId) -> Vec<PhiId> {
    let def_blocks = definition_blocks(func, var);
    if def_blocks.len() <= 1 {
        return Vec::new();
    }

    let ty = func.temp_ty(var);
    let mut has_phi: HashSet<BlockId> = HashSet::new();
    let mut on_worklist: HashSet<BlockId> = def_blocks.iter().copied().collect();
    let mut worklist: Vec<BlockId> = def_blocks;
    let mut inserted = Vec::new();

    while let Some(n) = worklist.pop() {
        let frontier = func.block(n).dom_frontier.clone();
        for d in frontier {
            if has_phi.contains(&d) {
                continue;
            }
            has_phi.insert(d);
            let preds = func.block(d).preds.clone();
            let phi = Phi {
                ty,
                dst: var,
                args: preds.into_iter().map(|p| (p, Value::Temp(var))).collect(),
            };
            let phi_id = func.alloc_phi_id();
            func.phis.insert(phi_id, phi);
            func.block_mut(d).phis.push(phi_id);
            inserted.push(phi_id);
            if !on_worklist.contains(&d) {
                on_worklist.insert(d);
                worklist.push(d);
            }
        }
    }
    inserted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::compute_cfg_edges;
    use crate::analysis::dominators::{compute_dominance_frontier, compute_dominator_tree, compute_rpo};
    use crate::ir::{Block, Instruction, Opcode, PrimType, Terminator};

    fn diamond_with_var_defined_in_both_branches() -> (Function, TempId) {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let left = f.push_block(Block::new(BlockId(1), "left"));
        let right = f.push_block(Block::new(BlockId(2), "right"));
        let join = f.push_block(Block::new(BlockId(3), "join"));
        f.block_mut(entry).term = Terminator::CondJump {
            cond: Value::Temp(TempId(99)),
            if_true: left,
            if_false: right,
        };
        f.block_mut(left).term = Terminator::Jump { target: join };
        f.block_mut(right).term = Terminator::Jump { target: join };
        f.block_mut(join).term = Terminator::Return { value: None };

        let var = f.new_temp(PrimType::W);
        let zero = Value::Const(crate::ir::ConstHandle(0));
        let one = Value::Const(crate::ir::ConstHandle(1));
        let def_left = f.alloc_inst_id();
        f.insts.insert(def_left, Instruction::unary(Opcode::Copy, PrimType::W, Some(var), zero));
        f.block_mut(left).insts.push(def_left);
        let def_right = f.alloc_inst_id();
        f.insts.insert(def_right, Instruction::unary(Opcode::Copy, PrimType::W, Some(var), one));
        f.block_mut(right).insts.push(def_right);

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        compute_dominance_frontier(&mut f);
        (f, var)
    }

    #[test]
    fn phi_inserted_at_join_block() {
        let (mut f, var) = diamond_with_var_defined_in_both_branches();
        let inserted = insert_phis(&mut f, var);
        assert_eq!(inserted.len(), 1);
        let join = f.blocks_in_order()[3];
        assert_eq!(f.block(join).phis, vec![inserted[0]]);
        assert_eq!(f.phi(inserted[0]).args.len(), 2);
    }

    #[test]
    fn single_definition_block_gets_no_phi() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let var = f.new_temp(PrimType::W);
        let id = f.alloc_inst_id();
        f.insts.insert(
            id,
            Instruction::unary(Opcode::Copy, PrimType::W, Some(var), Value::Const(crate::ir::ConstHandle(0))),
        );
        let start = f.start;
        f.block_mut(start).insts.push(id);
        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        compute_dominance_frontier(&mut f);
        assert!(insert_phis(&mut f, var).is_empty());
    }
}
