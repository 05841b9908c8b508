//! Global code motion (§4.6): reposition movable instructions to the
//! shallowest legal block on the path between their earliest and latest
//! legal placement. Requires dominator-tree fields (§4.2) to be current.

use std::collections::{HashMap, HashSet};

use crate::ir::{BlockId, Function, InstId};

fn is_pinned(func: &Function, inst: InstId) -> bool {
    let op = func.inst(inst).opcode;
    op.is_alloc() || op.is_load() || op.is_copy() || op == crate::ir::Opcode::Call || op == crate::ir::Opcode::Par
}

/// LCA of two blocks on the dominator tree, via depth-equalizing walk-up.
fn lca(func: &Function, mut a: BlockId, mut b: BlockId) -> BlockId {
    while func.block(a).dom_depth > func.block(b).dom_depth {
        a = func.block(a).idom.unwrap_or(a);
    }
    while func.block(b).dom_depth > func.block(a).dom_depth {
        b = func.block(b).idom.unwrap_or(b);
    }
    while a != b {
        a = func.block(a).idom.unwrap_or(a);
        b = func.block(b).idom.unwrap_or(b);
    }
    a
}

fn def_block(func: &Function, inst: InstId) -> BlockId {
    func.blocks_in_order()
        .into_iter()
        .find(|&b| func.block(b).insts.contains(&inst))
        .expect("instruction must live in some block")
}

/// Every block using `inst`'s result: instruction operand use sites (the
/// block that contains the using instruction), and phi uses (the
/// corresponding predecessor block, since that's where the value must be
/// live on exit).
fn use_blocks(func: &Function, t: crate::ir::TempId) -> Vec<BlockId> {
    let Some(meta) = func.temps.get(&t) else { return Vec::new() };
    meta.uses
        .iter()
        .map(|u| match u {
            crate::ir::Use::InstUse { inst } => def_block(func, *inst),
            crate::ir::Use::PhiUse { block, .. } => *block,
            crate::ir::Use::JmpUse { block } => *block,
        })
        .collect()
}

fn earliest(func: &Function, inst: InstId) -> BlockId {
    let home = def_block(func, inst);
    let mut best = func.start;
    for arg in func.inst(inst).operands() {
        if let crate::ir::Value::Temp(t) = arg {
            if let Some(meta) = func.temps.get(&t) {
                for def in &meta.defs {
                    let db = match def {
                        crate::ir::Def::InstDef { inst } => def_block(func, *inst),
                        crate::ir::Def::PhiDef { block, .. } => *block,
                    };
                    if func.block(db).dom_depth > func.block(best).dom_depth {
                        best = db;
                    }
                }
            }
        }
    }
    if !func.block(best).dominates.contains(&home) && best != home {
        home
    } else {
        best
    }
}

fn latest(func: &Function, inst: InstId) -> BlockId {
    let Some(dst) = func.inst(inst).dst else { return def_block(func, inst) };
    let users = use_blocks(func, dst);
    if users.is_empty() {
        return def_block(func, inst);
    }
    users.into_iter().reduce(|a, b| lca(func, a, b)).unwrap()
}

/// How many natural loops (by back edge) enclose each block, via the same
/// back-edge/loop-body discovery `licm.rs` uses for invariant hoisting.
fn loop_depths(func: &Function) -> HashMap<BlockId, usize> {
    let mut depth: HashMap<BlockId, usize> = func.blocks_in_order().into_iter().map(|b| (b, 0)).collect();
    for (tail, head) in super::licm::find_back_edges(func) {
        for b in super::licm::loop_body(func, head, tail) {
            *depth.entry(b).or_insert(0) += 1;
        }
    }
    depth
}

/// Default to `latest` (closest to the uses) and only rise toward
/// `earliest` when an ancestor on the dominator-tree path has a strictly
/// smaller loop nesting depth, i.e. when rising escapes a loop `latest`
/// sits inside of. `earliest` is never overshot.
fn choose_placement(func: &Function, earliest: BlockId, latest: BlockId, depths: &HashMap<BlockId, usize>) -> BlockId {
    let mut best = latest;
    let mut cur = latest;
    while cur != earliest {
        let Some(p) = func.block(cur).idom else { break };
        cur = p;
        if depths[&cur] < depths[&best] {
            best = cur;
        }
    }
    best
}

/// Reposition every movable instruction. Returns whether anything moved.
pub fn run(func: &mut Function) -> bool {
    let movable: Vec<InstId> = func
        .blocks_in_order()
        .into_iter()
        .flat_map(|b| func.block(b).insts.clone())
        .filter(|&id| !is_pinned(func, id) && func.inst(id).dst.is_some())
        .collect();

    let depths = loop_depths(func);
    let mut changed = false;
    let mut target: HashMap<InstId, BlockId> = HashMap::new();
    for &id in &movable {
        let e = earliest(func, id);
        let l = latest(func, id);
        let chosen = if func.block(e).dominates.contains(&l) || e == l {
            choose_placement(func, e, l, &depths)
        } else {
            def_block(func, id)
        };
        target.insert(id, chosen);
    }

    for &id in &movable {
        let home = def_block(func, id);
        let dest = target[&id];
        if dest == home {
            continue;
        }
        let pos = func.block(home).insts.iter().position(|&i| i == id).unwrap();
        func.block_mut(home).insts.remove(pos);

        let users: HashSet<InstId> = if let Some(dst) = func.inst(id).dst {
            func.temps
                .get(&dst)
                .map(|m| {
                    m.uses
                        .iter()
                        .filter_map(|u| match u {
                            crate::ir::Use::InstUse { inst } => Some(*inst),
                            _ => None,
                        })
                        .collect()
                })
                .unwrap_or_default()
        } else {
            HashSet::new()
        };
        let insert_at = func
            .block(dest)
            .insts
            .iter()
            .position(|i| users.contains(i))
            .unwrap_or(func.block(dest).insts.len());
        func.block_mut(dest).insts.insert(insert_at, id);
        changed = true;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{compute_cfg_edges, compute_dominator_tree, compute_rpo};
    use crate::ir::{Block, Instruction, Opcode, PrimType, Terminator, Value};

    #[test]
    fn instruction_sinks_to_the_block_that_uses_it() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let left = f.push_block(Block::new(BlockId(1), "left"));
        let right = f.push_block(Block::new(BlockId(2), "right"));

        let a = Value::Const(crate::ir::ConstHandle(0));
        let b = Value::Const(crate::ir::ConstHandle(0));
        let k = f.new_temp(PrimType::W);
        let id = f.alloc_inst_id();
        f.insts.insert(id, Instruction::binary(Opcode::Add, PrimType::W, Some(k), a, b));
        f.block_mut(entry).insts.push(id);
        f.block_mut(entry).term = Terminator::CondJump {
            cond: a,
            if_true: left,
            if_false: right,
        };

        let consumer = f.new_temp(PrimType::W);
        let cid = f.alloc_inst_id();
        f.insts
            .insert(cid, Instruction::unary(Opcode::Copy, PrimType::W, Some(consumer), Value::Temp(k)));
        f.block_mut(left).insts.push(cid);
        f.block_mut(left).term = Terminator::Return { value: None };
        f.block_mut(right).term = Terminator::Return { value: None };

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        crate::analysis::usedef::fill_uses(&mut f);

        let changed = run(&mut f);
        assert!(changed);
        assert!(f.block(left).insts.contains(&id));
        assert!(!f.block(entry).insts.contains(&id));
    }
}
