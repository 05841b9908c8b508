//! Reverse post order, dominator tree, and dominance frontier (§4.2).

use std::collections::{HashMap, HashSet};

use crate::ir::{BlockId, Function};

/// DFS from entry producing a post-order list, then reversed. Stored on
/// the function as `rpo`. Edges into `return` blocks do not extend
/// traversal (a `return` block has no successors by construction, so this
/// falls out of the CFG edges already computed).
pub fn compute_rpo(func: &mut Function) {
    let mut visited = HashSet::new();
    let mut postorder = Vec::new();
    let mut stack = vec![(func.start, false)];
    while let Some((id, processed)) = stack.pop() {
        if processed {
            postorder.push(id);
            continue;
        }
        if !visited.insert(id) {
            continue;
        }
        stack.push((id, true));
        for succ in func.block(id).succs.iter().rev() {
            if !visited.contains(succ) {
                stack.push((*succ, false));
            }
        }
    }
    postorder.reverse();
    func.rpo = postorder;
}

/// Immediate dominators via the iterative dataflow formulation (Cooper,
/// Harvey, Kennedy), then derive `doms` (dominator-tree children),
/// `dom_depth`, and the `dominates` reachability set on each block.
pub fn compute_dominator_tree(func: &mut Function) {
    let rpo = func.rpo.clone();
    if rpo.is_empty() {
        return;
    }
    let rpo_index: HashMap<BlockId, usize> = rpo.iter().enumerate().map(|(i, b)| (*b, i)).collect();
    let entry = rpo[0];
    let mut idom: HashMap<BlockId, BlockId> = HashMap::new();
    idom.insert(entry, entry);

    let mut changed = true;
    while changed {
        changed = false;
        for &b in rpo.iter().skip(1) {
            let preds = func.block(b).preds.clone();
            let mut new_idom = None;
            for p in preds {
                if idom.contains_key(&p) {
                    new_idom = Some(match new_idom {
                        None => p,
                        Some(cur) => intersect(cur, p, &idom, &rpo_index),
                    });
                }
            }
            if let Some(ni) = new_idom {
                if idom.get(&b) != Some(&ni) {
                    idom.insert(b, ni);
                    changed = true;
                }
            }
        }
    }

    for &b in &rpo {
        func.block_mut(b).idom = if b == entry { None } else { idom.get(&b).copied() };
        func.block_mut(b).doms.clear();
    }
    for &b in &rpo {
        if let Some(d) = func.block(b).idom {
            func.block_mut(d).doms.push(b);
        }
    }

    let mut depth: HashMap<BlockId, u32> = HashMap::new();
    depth.insert(entry, 0);
    for &b in rpo.iter().skip(1) {
        if let Some(d) = idom.get(&b) {
            let parent_depth = *depth.get(d).unwrap_or(&0);
            depth.insert(b, parent_depth + 1);
        }
    }
    for &b in &rpo {
        func.block_mut(b).dom_depth = *depth.get(&b).unwrap_or(&0);
    }

    // `dominates`: B's reachability set on the dominator tree, computed
    // bottom-up from `doms` children.
    for &b in &rpo {
        func.block_mut(b).dominates.clear();
    }
    for &b in rpo.iter().rev() {
        let mut set: HashSet<BlockId> = HashSet::new();
        set.insert(b);
        for child in func.block(b).doms.clone() {
            set.insert(child);
            set.extend(func.block(child).dominates.iter().copied());
        }
        func.block_mut(b).dominates = set;
    }
}

fn intersect(
    mut a: BlockId,
    mut b: BlockId,
    idom: &HashMap<BlockId, BlockId>,
    rpo_index: &HashMap<BlockId, usize>,
) -> BlockId {
    while a != b {
        while rpo_index[&a] > rpo_index[&b] {
            a = idom[&a];
        }
        while rpo_index[&b] > rpo_index[&a] {
            b = idom[&b];
        }
    }
    a
}

/// For each edge `(pred -> succ)` where `pred` has more than one
/// predecessor-of-the-merge (i.e. `succ`'s idom does not equal `pred`,
/// the classical runner-up test), walk up the dominator tree from `pred`
/// until reaching (but excluding) `succ`'s immediate dominator, adding
/// `succ` to each visited block's frontier.
pub fn compute_dominance_frontier(func: &mut Function) {
    let rpo = func.rpo.clone();
    for &b in &rpo {
        func.block_mut(b).dom_frontier.clear();
    }
    for &succ in &rpo {
        let preds = func.block(succ).preds.clone();
        if preds.len() < 2 {
            continue;
        }
        let succ_idom = func.block(succ).idom;
        for pred in preds {
            let mut runner = pred;
            while Some(runner) != succ_idom {
                if !func.block(runner).dom_frontier.contains(&succ) {
                    func.block_mut(runner).dom_frontier.push(succ);
                }
                match func.block(runner).idom {
                    Some(next) => runner = next,
                    None => break,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, PrimType, Terminator, Value};
    use crate::analysis::cfg::compute_cfg_edges;

    /// Diamond CFG: entry -> (left, right) -> join -> ret.
    fn diamond() -> Function {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let left = f.push_block(Block::new(BlockId(1), "left"));
        let right = f.push_block(Block::new(BlockId(2), "right"));
        let join = f.push_block(Block::new(BlockId(3), "join"));
        f.block_mut(entry).term = Terminator::CondJump {
            cond: Value::Temp(crate::ir::TempId(0)),
            if_true: left,
            if_false: right,
        };
        f.block_mut(left).term = Terminator::Jump { target: join };
        f.block_mut(right).term = Terminator::Jump { target: join };
        f.block_mut(join).term = Terminator::Return { value: None };
        compute_cfg_edges(&mut f);
        f
    }

    #[test]
    fn join_block_is_dominated_only_by_entry() {
        let mut f = diamond();
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        let entry = f.start;
        let join = f.blocks_in_order()[3];
        assert_eq!(f.block(join).idom, Some(entry));
        assert!(f.block(entry).dominates.contains(&join));
    }

    #[test]
    fn dominance_frontier_of_branches_is_join() {
        let mut f = diamond();
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        compute_dominance_frontier(&mut f);
        let left = f.blocks_in_order()[1];
        let right = f.blocks_in_order()[2];
        let join = f.blocks_in_order()[3];
        assert_eq!(f.block(left).dom_frontier, vec![join]);
        assert_eq!(f.block(right).dom_frontier, vec![join]);
    }
}
