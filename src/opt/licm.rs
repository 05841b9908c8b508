//! Loop-invariant code motion (§4.5). Operates on a whole [`Module`]
//! because pre-header insertion needs a module-unique block id.

use std::collections::{HashMap, HashSet};

use crate::ir::{Block, BlockId, Def, Function, InstId, Module, Terminator, Value};

pub(crate) fn find_back_edges(func: &Function) -> Vec<(BlockId, BlockId)> {
    let mut edges = Vec::new();
    for &b in &func.rpo {
        for s in func.block(b).term.successors() {
            if func.block(s).dominates.contains(&b) {
                edges.push((b, s));
            }
        }
    }
    edges
}

/// Blocks from which `tail` is reachable without leaving `head`'s
/// dominator region, plus `head` itself.
pub(crate) fn loop_body(func: &Function, head: BlockId, tail: BlockId) -> HashSet<BlockId> {
    let mut body = HashSet::new();
    body.insert(head);
    let mut stack = vec![tail];
    while let Some(b) = stack.pop() {
        if !body.insert(b) {
            continue;
        }
        if b == head {
            continue;
        }
        for &p in &func.block(b).preds {
            if func.block(head).dominates.contains(&p) {
                stack.push(p);
            }
        }
    }
    body
}

fn find_invariants(func: &Function, body: &HashSet<BlockId>) -> Vec<InstId> {
    let body_order: Vec<BlockId> = func
        .blocks_in_order()
        .into_iter()
        .filter(|b| body.contains(b))
        .collect();
    let mut inst_in_body: HashSet<InstId> = HashSet::new();
    for &b in &body_order {
        inst_in_body.extend(func.block(b).insts.iter().copied());
    }

    let mut invariant: HashSet<InstId> = HashSet::new();
    let mut changed = true;
    while changed {
        changed = false;
        for &b in &body_order {
            for &inst_id in &func.block(b).insts {
                if invariant.contains(&inst_id) {
                    continue;
                }
                let inst = func.inst(inst_id);
                if inst.dst.is_none() {
                    continue;
                }
                if inst.opcode.is_side_effecting_or_pinned()
                    || inst.opcode.is_alloc()
                    || inst.opcode.is_compare()
                {
                    continue;
                }
                let mut ok = true;
                for arg in inst.operands() {
                    let Value::Temp(t) = arg else { continue };
                    let Some(meta) = func.temps.get(&t) else { continue };
                    let in_loop_defs: Vec<_> = meta
                        .defs
                        .iter()
                        .filter(|d| match d {
                            Def::InstDef { inst } => inst_in_body.contains(inst),
                            Def::PhiDef { block, .. } => body.contains(block),
                        })
                        .collect();
                    match in_loop_defs.as_slice() {
                        [] => {}
                        [Def::InstDef { inst: def_inst }] => {
                            if !invariant.contains(def_inst) {
                                ok = false;
                                break;
                            }
                        }
                        _ => {
                            ok = false;
                            break;
                        }
                    }
                }
                if ok {
                    invariant.insert(inst_id);
                    changed = true;
                }
            }
        }
    }

    body_order
        .iter()
        .flat_map(|&b| func.block(b).insts.clone())
        .filter(|id| invariant.contains(id))
        .collect()
}

fn redirect_to(func: &mut Function, referrer: BlockId, old: BlockId, new: BlockId) {
    let term = func.block(referrer).term.clone();
    let new_term = match term {
        Terminator::Jump { target } if target == old => Terminator::Jump { target: new },
        Terminator::CondJump {
            cond,
            if_true,
            if_false,
        } => Terminator::CondJump {
            cond,
            if_true: if if_true == old { new } else { if_true },
            if_false: if if_false == old { new } else { if_false },
        },
        other => other,
    };
    func.block_mut(referrer).term = new_term;
}

fn hoist_loop(func: &mut Function, module_fresh_id: BlockId, head: BlockId, tail: BlockId, invariants: &[InstId]) {
    let prev = func.blocks.values().find(|b| b.next == Some(head)).map(|b| b.id);
    let Some(prev) = prev else { return };

    let preheader = module_fresh_id;
    func.insert_block_after(prev, Block::new(preheader, "preheader"));
    func.block_mut(preheader).term = Terminator::Jump { target: head };

    let outside_preds: Vec<BlockId> = func
        .block(head)
        .preds
        .iter()
        .copied()
        .filter(|&p| p != tail)
        .collect();
    for p in &outside_preds {
        redirect_to(func, *p, head, preheader);
    }
    func.block_mut(preheader).preds = outside_preds.clone();

    let phi_ids = func.block(head).phis.clone();
    for phi_id in phi_ids {
        let phi = func.phi_mut(phi_id);
        for (b, _) in phi.args.iter_mut() {
            if outside_preds.contains(b) {
                *b = preheader;
            }
        }
    }
    func.block_mut(head).preds = {
        let mut v: Vec<BlockId> = func
            .block(head)
            .preds
            .iter()
            .copied()
            .filter(|&p| p != head && !outside_preds.contains(&p))
            .collect();
        v.push(preheader);
        v
    };

    for &inst_id in invariants {
        for &b in &func.blocks_in_order() {
            if let Some(pos) = func.block(b).insts.iter().position(|&i| i == inst_id) {
                func.block_mut(b).insts.remove(pos);
                break;
            }
        }
        func.block_mut(preheader).insts.push(inst_id);
    }
}

/// Run LICM over every function in `module` once. Returns whether
/// anything was hoisted.
pub fn run(module: &mut Module) -> bool {
    let mut changed = false;
    for idx in 0..module.functions.len() {
        let back_edges = find_back_edges(&module.functions[idx]);
        for (tail, head) in back_edges {
            if module.functions[idx].block(head).preds.len() > 2 {
                continue;
            }
            let body = loop_body(&module.functions[idx], head, tail);
            let invariants = find_invariants(&module.functions[idx], &body);
            if invariants.is_empty() {
                continue;
            }
            let fresh = module.fresh_block_id();
            hoist_loop(&mut module.functions[idx], fresh, head, tail, &invariants);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{compute_cfg_edges, compute_dominator_tree, compute_rpo};
    use crate::ir::{Instruction, Opcode, PrimType, Value};

    fn loop_fn() -> Function {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let head = f.push_block(Block::new(BlockId(1), "head"));
        let body = f.push_block(Block::new(BlockId(2), "body"));
        let exit = f.push_block(Block::new(BlockId(3), "exit"));

        let a = crate::ir::Context::new().intern_int(1);
        let b = Value::Const(crate::ir::ConstHandle(0));

        f.block_mut(entry).term = Terminator::Jump { target: head };
        f.block_mut(head).term = Terminator::CondJump {
            cond: b,
            if_true: body,
            if_false: exit,
        };

        let k = f.new_temp(PrimType::W);
        let id = f.alloc_inst_id();
        f.insts.insert(id, Instruction::binary(Opcode::Mul, PrimType::W, Some(k), a, b));
        f.block_mut(body).insts.push(id);
        f.block_mut(body).term = Terminator::Jump { target: head };
        f.block_mut(exit).term = Terminator::Return { value: None };

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        crate::analysis::usedef::fill_uses(&mut f);
        f
    }

    #[test]
    fn invariant_multiply_is_hoisted_to_fresh_preheader() {
        let mut module = Module::new();
        module.functions.push(loop_fn());
        let changed = run(&mut module);
        assert!(changed);
        let f = &module.functions[0];
        let head = BlockId(1);
        let prev = f.blocks.values().find(|bl| bl.next == Some(head)).map(|bl| bl.id);
        assert!(prev.is_some());
        let preheader = f.block(prev.unwrap());
        assert_eq!(preheader.insts.len(), 1);
        assert_eq!(preheader.term, Terminator::Jump { target: head });
    }
}
