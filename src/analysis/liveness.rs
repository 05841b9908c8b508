//! Backward liveness dataflow (§4.2).
//!
//! A phi's destination is defined in the phi's block; a phi's incoming
//! value is treated as used in the phi's block too (the textbook
//! approximation named by the spec, not the edge-precise version).

use std::collections::HashSet;

use crate::ir::{TempId, Terminator, Value};
use crate::ir::Function;

fn local_use_def(func: &Function, block_id: crate::ir::BlockId) -> (HashSet<TempId>, HashSet<TempId>) {
    let mut used = HashSet::new();
    let mut defined = HashSet::new();
    let block = func.block(block_id);

    for phi_id in &block.phis {
        let phi = func.phi(*phi_id);
        defined.insert(phi.dst);
        for (_, v) in &phi.args {
            if let Value::Temp(t) = v {
                if !defined.contains(t) {
                    used.insert(*t);
                }
            }
        }
    }
    for inst_id in &block.insts {
        let inst = func.inst(*inst_id);
        for arg in inst.operands() {
            if let Value::Temp(t) = arg {
                if !defined.contains(&t) {
                    used.insert(t);
                }
            }
        }
        if let Some(dst) = inst.dst {
            defined.insert(dst);
        }
    }
    match &block.term {
        Terminator::CondJump { cond, .. } => {
            if let Value::Temp(t) = cond {
                if !defined.contains(t) {
                    used.insert(*t);
                }
            }
        }
        Terminator::Return { value: Some(Value::Temp(t)) } => {
            if !defined.contains(t) {
                used.insert(*t);
            }
        }
        _ => {}
    }
    (used, defined)
}

/// Standard backward fixpoint, iterated in reverse of `func.rpo` until no
/// `live_in`/`live_out` set changes.
pub fn compute_liveness(func: &mut Function) {
    let block_ids = func.rpo.clone();
    let use_def: Vec<_> = block_ids
        .iter()
        .map(|&id| (id, local_use_def(func, id)))
        .collect();

    for &id in &block_ids {
        func.block_mut(id).live_in.clear();
        func.block_mut(id).live_out.clear();
    }

    let mut changed = true;
    while changed {
        changed = false;
        for &(id, (ref used, ref defined)) in use_def.iter().rev() {
            let mut live_out: HashSet<TempId> = HashSet::new();
            for succ in func.block(id).succs.clone() {
                live_out.extend(func.block(succ).live_in.iter().copied());
            }
            let mut live_in = live_out.clone();
            for t in used {
                live_in.insert(*t);
            }
            for t in defined {
                live_in.remove(t);
            }
            if live_in != func.block(id).live_in || live_out != func.block(id).live_out {
                func.block_mut(id).live_in = live_in;
                func.block_mut(id).live_out = live_out;
                changed = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::compute_cfg_edges;
    use crate::analysis::dominators::compute_rpo;
    use crate::ir::{Block, BlockId, Instruction, Opcode, PrimType};

    #[test]
    fn value_defined_and_used_across_a_jump_is_live_across_it() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let exit = f.push_block(Block::new(BlockId(1), "exit"));

        let t0 = f.new_temp(PrimType::W);
        let zero = Value::Const(crate::ir::ConstHandle(0));
        let def_id = f.alloc_inst_id();
        f.insts.insert(def_id, Instruction::unary(Opcode::Copy, PrimType::W, Some(t0), zero));
        f.block_mut(entry).insts.push(def_id);
        f.block_mut(entry).term = Terminator::Jump { target: exit };

        f.block_mut(exit).term = Terminator::Return { value: Some(Value::Temp(t0)) };

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_liveness(&mut f);

        assert!(f.block(entry).live_out.contains(&t0));
        assert!(f.block(exit).live_in.contains(&t0));
    }
}
