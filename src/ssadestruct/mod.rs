//! SSA destruction (§4.8): lower phis into parallel copies on incoming
//! edges, split critical edges first, serialize each parallel copy with
//! the Briggs/May algorithm, then run a small copy-coalescing cleanup.
//!
//! Requires [`crate::analysis::fill_uses`] to be current for
//! [`coalesce_copies`]; invalidates `preds`/`succs`/use-def afterward —
//! re-run [`crate::analysis::compute_cfg_edges`] and `fill_uses` before
//! any later analysis that needs them.

use std::collections::VecDeque;

use crate::ir::{Block, BlockId, Def, Function, Instruction, Module, Opcode, PrimType, TempId, Terminator, Value};

/// Sequentialize a set of simultaneous assignments `dest <- src` (all
/// `dest`s distinct) into an ordered list of copies with the same net
/// effect. Cycles are broken by saving the victim's current value into a
/// fresh temporary first.
fn serialize(func: &mut Function, pairs: Vec<(TempId, Value)>) -> Vec<(TempId, Value)> {
    let mut result = Vec::new();
    let mut todo: VecDeque<(TempId, Value)> = pairs.into();

    while !todo.is_empty() {
        let mut still_todo = VecDeque::new();
        let mut progressed = false;
        while let Some((d, s)) = todo.pop_front() {
            let read_elsewhere = todo
                .iter()
                .chain(still_todo.iter())
                .any(|(_, s2)| matches!(s2, Value::Temp(t) if *t == d));
            if read_elsewhere {
                still_todo.push_back((d, s));
            } else {
                result.push((d, s));
                progressed = true;
            }
        }
        todo = still_todo;
        if !progressed && !todo.is_empty() {
            let (d, s) = todo.pop_front().unwrap();
            let ty = func.temp_ty(d);
            let fresh = func.new_temp(ty);
            result.push((fresh, Value::Temp(d)));
            for (_, s2) in todo.iter_mut() {
                if matches!(s2, Value::Temp(t) if *t == d) {
                    *s2 = Value::Temp(fresh);
                }
            }
            todo.push_back((d, s));
        }
    }
    result
}

fn emit_copies(func: &mut Function, place: BlockId, pairs: Vec<(TempId, Value)>) {
    let serialized = serialize(func, pairs);
    for (d, s) in serialized {
        let ty = func.temp_ty(d);
        let id = func.alloc_inst_id();
        func.insts.insert(id, Instruction::unary(Opcode::Copy, ty, Some(d), s));
        func.block_mut(place).insts.push(id);
    }
}

fn destruct_block_phis(module: &mut Module, idx: usize, target: BlockId) {
    let preds = module.functions[idx].block(target).preds.clone();
    let phi_ids = module.functions[idx].block(target).phis.clone();

    for p in preds {
        let pairs: Vec<(TempId, Value, PrimType)> = phi_ids
            .iter()
            .filter_map(|&pid| {
                let phi = module.functions[idx].phi(pid);
                let v = phi.incoming(p)?;
                if v == Value::Temp(phi.dst) {
                    return None;
                }
                Some((phi.dst, v, phi.ty))
            })
            .collect();
        if pairs.is_empty() {
            continue;
        }

        let is_critical = matches!(module.functions[idx].block(p).term, Terminator::CondJump { .. });
        let place = if is_critical {
            let splitter = module.fresh_block_id();
            let func = &mut module.functions[idx];
            let term = func.block(p).term.clone();
            let new_term = match term {
                Terminator::CondJump {
                    cond,
                    if_true,
                    if_false,
                } => Terminator::CondJump {
                    cond,
                    if_true: if if_true == target { splitter } else { if_true },
                    if_false: if if_false == target { splitter } else { if_false },
                },
                other => other,
            };
            func.block_mut(p).term = new_term;
            let mut sblock = Block::new(splitter, "split");
            sblock.term = Terminator::Jump { target };
            sblock.preds = vec![p];
            func.insert_block_after(p, sblock);
            if let Some(pos) = func.block(target).preds.iter().position(|&b| b == p) {
                func.block_mut(target).preds[pos] = splitter;
            }
            splitter
        } else {
            p
        };

        let func = &mut module.functions[idx];
        let values: Vec<(TempId, Value)> = pairs.iter().map(|(d, v, _)| (*d, *v)).collect();
        emit_copies(func, place, values);
    }

    let func = &mut module.functions[idx];
    for pid in phi_ids {
        func.phis.remove(&pid);
    }
    func.block_mut(target).phis.clear();
}

/// Destroy the SSA form of `module.functions[idx]`: lower every phi to
/// parallel copies placed on its incoming edges.
pub fn destruct_ssa(module: &mut Module, idx: usize) {
    let targets: Vec<BlockId> = module.functions[idx]
        .blocks_in_order()
        .into_iter()
        .filter(|&b| !module.functions[idx].block(b).phis.is_empty())
        .collect();
    for b in targets {
        destruct_block_phis(module, idx, b);
    }
}

/// For any `copy` whose sole source is a same-block instruction with no
/// other use, rewrite the producer to write the copy's destination
/// directly and turn the copy into a `nop`.
pub fn coalesce_copies(func: &mut Function) -> bool {
    let mut changed = false;
    for b in func.blocks_in_order() {
        let insts = func.block(b).insts.clone();
        for &id in &insts {
            let inst = func.inst(id);
            if inst.opcode != Opcode::Copy {
                continue;
            }
            let Some(dst) = inst.dst else { continue };
            let Some(Value::Temp(src)) = inst.args[0] else { continue };
            let Some(meta) = func.temps.get(&src) else { continue };
            if meta.defs.len() != 1 || meta.uses.len() != 1 {
                continue;
            }
            let Def::InstDef { inst: producer } = meta.defs[0] else { continue };
            if !func.block(b).insts.contains(&producer) {
                continue;
            }
            func.inst_mut(producer).dst = Some(dst);
            let i = func.inst_mut(id);
            i.opcode = Opcode::Nop;
            i.args = [None, None];
            i.dst = None;
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Context, ConstHandle};

    #[test]
    fn phi_lowers_to_copies_on_both_incoming_edges() {
        let mut module = Module::new();
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let left = f.push_block(Block::new(BlockId(1), "left"));
        let right = f.push_block(Block::new(BlockId(2), "right"));
        let join = f.push_block(Block::new(BlockId(3), "join"));

        let cond = Value::Const(ConstHandle(0));
        f.block_mut(entry).term = Terminator::CondJump {
            cond,
            if_true: left,
            if_false: right,
        };
        f.block_mut(left).term = Terminator::Jump { target: join };
        f.block_mut(right).term = Terminator::Jump { target: join };
        f.block_mut(join).term = Terminator::Return { value: None };
        f.block_mut(left).preds = vec![entry];
        f.block_mut(right).preds = vec![entry];
        f.block_mut(join).preds = vec![left, right];

        let one = Value::Const(ConstHandle(1));
        let two = Value::Const(ConstHandle(2));
        let dst = f.new_temp(PrimType::W);
        let phi_id = f.alloc_phi_id();
        f.phis.insert(
            phi_id,
            crate::ir::Phi {
                ty: PrimType::W,
                dst,
                args: vec![(left, one), (right, two)],
            },
        );
        f.block_mut(join).phis.push(phi_id);

        let mut ctx = Context::new();
        let _ = ctx.intern_int(1);
        let _ = ctx.intern_int(2);

        module.functions.push(f);
        destruct_ssa(&mut module, 0);

        let f = &module.functions[0];
        assert!(f.block(join).phis.is_empty());
        assert_eq!(f.block(left).insts.len(), 1);
        assert_eq!(f.block(right).insts.len(), 1);
        assert_eq!(f.inst(f.block(left).insts[0]).opcode, Opcode::Copy);
    }

    #[test]
    fn two_element_swap_breaks_cycle_with_a_fresh_temp() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let a = f.new_temp(PrimType::W);
        let b = f.new_temp(PrimType::W);
        let pairs = vec![(a, Value::Temp(b)), (b, Value::Temp(a))];
        let serialized = serialize(&mut f, pairs);
        assert_eq!(serialized.len(), 3);
    }
}
