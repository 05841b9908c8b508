//! Live interval computation (§4.2): instruction numbering in RPO, then
//! `[start, end]` per temporary extended to block boundaries whenever the
//! temporary is live-in/live-out of any block.

use std::collections::HashMap;

use crate::ir::{TempId, Value};
use crate::ir::Function;

/// A temporary's live range in the function's global instruction
/// numbering, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInterval {
    pub temp: TempId,
    pub start: u32,
    pub end: u32,
}

/// Number every instruction in RPO order (phis are numbered at their
/// block's first slot, sharing the block-entry number), then derive one
/// interval per temporary.
pub fn compute_live_intervals(func: &mut Function) -> Vec<LiveInterval> {
    let rpo = func.rpo.clone();
    let mut n: u32 = 0;
    let mut block_start: HashMap<crate::ir::BlockId, u32> = HashMap::new();
    let mut block_end: HashMap<crate::ir::BlockId, u32> = HashMap::new();

    for &id in &rpo {
        block_start.insert(id, n);
        let inst_ids = func.block(id).insts.clone();
        for inst_id in inst_ids {
            func.inst_mut(inst_id).number = Some(n);
            n += 1;
        }
        block_end.insert(id, n.saturating_sub(1));
    }

    let mut bounds: HashMap<TempId, (u32, u32)> = HashMap::new();
    let mut touch = |bounds: &mut HashMap<TempId, (u32, u32)>, t: TempId, pos: u32| {
        bounds
            .entry(t)
            .and_modify(|(s, e)| {
                *s = (*s).min(pos);
                *e = (*e).max(pos);
            })
            .or_insert((pos, pos));
    };

    for &id in &rpo {
        let start = block_start[&id];
        let end = block_end.get(&id).copied().unwrap_or(start);
        for t in func.block(id).live_in.iter().copied() {
            touch(&mut bounds, t, start);
        }
        for t in func.block(id).live_out.iter().copied() {
            touch(&mut bounds, t, end);
        }
        for phi_id in func.block(id).phis.clone() {
            let phi = func.phi(phi_id);
            touch(&mut bounds, phi.dst, start);
        }
        for inst_id in func.block(id).insts.clone() {
            let inst = func.inst(inst_id);
            let pos = inst.number.unwrap_or(start);
            if let Some(dst) = inst.dst {
                touch(&mut bounds, dst, pos);
            }
            for arg in inst.operands() {
                if let Value::Temp(t) = arg {
                    touch(&mut bounds, t, pos);
                }
            }
        }
    }

    let mut intervals: Vec<LiveInterval> = bounds
        .into_iter()
        .map(|(temp, (start, end))| LiveInterval { temp, start, end })
        .collect();
    intervals.sort_by_key(|iv| (iv.start, iv.temp.0));
    intervals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::compute_cfg_edges;
    use crate::analysis::dominators::compute_rpo;
    use crate::analysis::liveness::compute_liveness;
    use crate::ir::{Block, BlockId, Instruction, Opcode, PrimType, Terminator};

    #[test]
    fn interval_spans_def_to_last_use() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let exit = f.push_block(Block::new(BlockId(1), "exit"));

        let t0 = f.new_temp(PrimType::W);
        let zero = Value::Const(crate::ir::ConstHandle(0));
        let def_id = f.alloc_inst_id();
        f.insts
            .insert(def_id, Instruction::unary(Opcode::Copy, PrimType::W, Some(t0), zero));
        f.block_mut(entry).insts.push(def_id);
        f.block_mut(entry).term = Terminator::Jump { target: exit };
        f.block_mut(exit).term = Terminator::Return {
            value: Some(Value::Temp(t0)),
        };

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_liveness(&mut f);
        let intervals = compute_live_intervals(&mut f);

        let iv = intervals.iter().find(|iv| iv.temp == t0).unwrap();
        assert!(iv.start <= iv.end);
    }
}
