//! Predecessor/successor computation (§4.2).

use crate::ir::Function;

/// Clear and refill `preds`/`succs` for every block in `func`, honoring
/// terminator kind: a conditional jump whose two targets are identical
/// contributes that target only once.
pub fn compute_cfg_edges(func: &mut Function) {
    let ids: Vec<_> = func.blocks.keys().copied().collect();
    for &id in &ids {
        func.block_mut(id).succs.clear();
        func.block_mut(id).preds.clear();
    }
    for &id in &ids {
        let succs = func.block(id).term.successors();
        for s in &succs {
            func.block_mut(*s).preds.push(id);
        }
        func.block_mut(id).succs = succs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Block, BlockId, PrimType, Terminator};

    fn linear_func() -> Function {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let b0 = f.start;
        let b1 = f.push_block(Block::new(BlockId(1), "b1"));
        f.block_mut(b0).term = Terminator::Jump { target: b1 };
        f.block_mut(b1).term = Terminator::Return { value: None };
        f
    }

    #[test]
    fn links_successors_and_predecessors() {
        let mut f = linear_func();
        compute_cfg_edges(&mut f);
        let b0 = f.start;
        let b1 = f.blocks_in_order()[1];
        assert_eq!(f.block(b0).succs, vec![b1]);
        assert_eq!(f.block(b1).preds, vec![b0]);
    }

    #[test]
    fn condjump_with_identical_targets_counts_once() {
        let mut f = linear_func();
        let b0 = f.start;
        let b1 = f.blocks_in_order()[1];
        f.block_mut(b0).term = Terminator::CondJump {
            cond: crate::ir::Value::Temp(crate::ir::TempId(0)),
            if_true: b1,
            if_false: b1,
        };
        compute_cfg_edges(&mut f);
        assert_eq!(f.block(b0).succs, vec![b1]);
        assert_eq!(f.block(b1).preds, vec![b0]);
    }
}
