//! CFG simplification (§4.4): empty-block removal, block merging, and
//! unreachable-block removal, pipelined.

use std::collections::HashSet;

use crate::ir::{BlockId, Function, Terminator};

fn redirect(func: &mut Function, referrer: BlockId, old: BlockId, new: BlockId) {
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

/// A block with no phis and no instructions ending in an unconditional
/// jump is replaced in every referrer by its target, transitively.
fn empty_block_removal(func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let mut progressed = false;
        for block_id in func.blocks_in_order() {
            if block_id == func.start {
                continue;
            }
            let block = func.block(block_id);
            let target = match (&block.term, block.phis.is_empty(), block.insts.is_empty()) {
                (Terminator::Jump { target }, true, true) if *target != block_id => Some(*target),
                _ => None,
            };
            let Some(target) = target else { continue };

            let preds = func.block(block_id).preds.clone();
            for &p in &preds {
                if p != block_id {
                    redirect(func, p, block_id, target);
                }
            }
            if !func.block(target).phis.is_empty() {
                let phi_ids = func.block(target).phis.clone();
                for phi_id in phi_ids {
                    let phi = func.phi(phi_id).clone();
                    if let Some(value) = phi.incoming(block_id) {
                        let mut new_args: Vec<_> =
                            phi.args.into_iter().filter(|(b, _)| *b != block_id).collect();
                        for &p in &preds {
                            new_args.push((p, value));
                        }
                        func.phi_mut(phi_id).args = new_args;
                    }
                }
            }
            func.remove_block(block_id);
            changed = true;
            progressed = true;
            break;
        }
        if !progressed {
            break;
        }
    }
    changed
}

/// If a block has exactly one predecessor and that predecessor's
/// terminator is an unconditional jump to it, append the block's
/// instructions to the predecessor and adopt its terminator. Blocks with
/// phis never merge.
fn block_merging(func: &mut Function) -> bool {
    let mut changed = false;
    loop {
        let mut progressed = false;
        for block_id in func.blocks_in_order() {
            if block_id == func.start {
                continue;
            }
            if !func.block(block_id).phis.is_empty() {
                continue;
            }
            let preds = func.block(block_id).preds.clone();
            if preds.len() != 1 || preds[0] == block_id {
                continue;
            }
            let pred = preds[0];
            let pred_jumps_here =
                matches!(func.block(pred).term, Terminator::Jump { target } if target == block_id);
            if !pred_jumps_here {
                continue;
            }

            let insts = func.block(block_id).insts.clone();
            let term = func.block(block_id).term.clone();
            for inst_id in insts {
                func.block_mut(pred).insts.push(inst_id);
            }
            func.block_mut(pred).term = term;
            func.remove_block(block_id);
            changed = true;
            progressed = true;
            break;
        }
        if !progressed {
            break;
        }
    }
    changed
}

/// Transitive reachability from entry, following terminators directly
/// (not the possibly-stale `succs` field); drop everything unreached.
fn unreachable_block_removal(func: &mut Function) -> bool {
    let mut reachable = HashSet::new();
    let mut stack = vec![func.start];
    while let Some(b) = stack.pop() {
        if !reachable.insert(b) {
            continue;
        }
        for s in func.block(b).term.successors() {
            stack.push(s);
        }
    }
    let mut changed = false;
    for b in func.blocks_in_order() {
        if !reachable.contains(&b) {
            func.remove_block(b);
            changed = true;
        }
    }
    changed
}

/// Run all three sub-passes, in order.
pub fn run(func: &mut Function) -> bool {
    let mut changed = false;
    changed |= empty_block_removal(func);
    changed |= block_merging(func);
    changed |= unreachable_block_removal(func);
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, PrimType, Value};

    #[test]
    fn empty_block_is_collapsed() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let empty = f.push_block(Block::new(BlockId(1), "empty"));
        let exit = f.push_block(Block::new(BlockId(2), "exit"));
        f.block_mut(entry).term = Terminator::Jump { target: empty };
        f.block_mut(empty).term = Terminator::Jump { target: exit };
        f.block_mut(exit).term = Terminator::Return { value: None };
        f.block_mut(empty).preds = vec![entry];

        let changed = run(&mut f);
        assert!(changed);
        assert_eq!(f.block(entry).term, Terminator::Jump { target: exit });
    }

    #[test]
    fn unreachable_after_return_is_removed() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let dead = f.push_block(Block::new(BlockId(1), "dead"));
        f.block_mut(entry).term = Terminator::Return {
            value: Some(Value::Const(crate::ir::ConstHandle(0))),
        };
        f.block_mut(dead).term = Terminator::Return { value: None };

        let changed = run(&mut f);
        assert!(changed);
        assert_eq!(f.blocks_in_order(), vec![entry]);
    }
}
