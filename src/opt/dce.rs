//! Simple dead-code elimination (§4.4): two-phase mark-and-sweep.
//!
//! Invalidates use-def lists; re-run [`crate::analysis::fill_uses`]
//! afterward if a later pass depends on them.

use std::collections::{HashSet, VecDeque};

use crate::ir::{Function, InstId, Opcode, PhiId, Value};

/// Mark every reachable instruction/phi starting from the always-alive
/// set (stores, calls, `par`, `arg`, and conditional/return terminator
/// arguments), then remove everything unmarked.
///
/// Returns whether anything was removed.
pub fn run(func: &mut Function) -> bool {
    let mut alive_insts: HashSet<InstId> = HashSet::new();
    let mut alive_phis: HashSet<PhiId> = HashSet::new();
    let mut worklist: VecDeque<Value> = VecDeque::new();

    for block_id in func.blocks_in_order() {
        let block = func.block(block_id);
        for &inst_id in &block.insts {
            let inst = func.inst(inst_id);
            if inst.opcode.is_side_effecting_or_pinned() {
                alive_insts.insert(inst_id);
                for arg in inst.operands() {
                    worklist.push_back(arg);
                }
            }
        }
        match &block.term {
            crate::ir::Terminator::CondJump { cond, .. } => worklist.push_back(*cond),
            crate::ir::Terminator::Return { value: Some(v) } => worklist.push_back(*v),
            _ => {}
        }
    }

    while let Some(v) = worklist.pop_front() {
        let Value::Temp(t) = v else { continue };
        let Some(meta) = func.temps.get(&t) else { continue };
        for def in meta.defs.clone() {
            match def {
                crate::ir::value::Def::InstDef { inst } => {
                    if alive_insts.insert(inst) {
                        for arg in func.inst(inst).operands() {
                            worklist.push_back(arg);
                        }
                    }
                }
                crate::ir::value::Def::PhiDef { phi, .. } => {
                    if alive_phis.insert(phi) {
                        for (_, arg) in func.phi(phi).args.clone() {
                            worklist.push_back(arg);
                        }
                    }
                }
            }
        }
    }

    let mut changed = false;
    for block_id in func.blocks_in_order() {
        let keep_phis: Vec<_> = func
            .block(block_id)
            .phis
            .iter()
            .copied()
            .filter(|id| alive_phis.contains(id))
            .collect();
        if keep_phis.len() != func.block(block_id).phis.len() {
            changed = true;
        }
        func.block_mut(block_id).phis = keep_phis;

        let keep_insts: Vec<_> = func
            .block(block_id)
            .insts
            .iter()
            .copied()
            .filter(|id| alive_insts.contains(id))
            .collect();
        if keep_insts.len() != func.block(block_id).insts.len() {
            changed = true;
        }
        func.block_mut(block_id).insts = keep_insts;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Instruction, PrimType};

    #[test]
    fn dead_computation_is_removed_but_store_survives() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let start = f.start;
        let dead = f.new_temp(PrimType::W);
        let zero = Value::Const(crate::ir::ConstHandle(0));
        let dead_id = f.alloc_inst_id();
        f.insts
            .insert(dead_id, Instruction::unary(Opcode::Copy, PrimType::W, Some(dead), zero));
        f.block_mut(start).insts.push(dead_id);

        let ptr = f.new_temp(PrimType::L);
        let store_id = f.alloc_inst_id();
        f.insts.insert(
            store_id,
            Instruction::binary(Opcode::StoreW, PrimType::W, None, Value::Temp(ptr), zero),
        );
        f.block_mut(start).insts.push(store_id);

        crate::analysis::usedef::fill_uses(&mut f);
        let changed = run(&mut f);
        assert!(changed);
        assert_eq!(f.block(start).insts, vec![store_id]);
    }
}
