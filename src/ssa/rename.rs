//! Renaming (§4.3): depth-first preorder walk of the dominator tree with
//! a per-variable stack, entirely local to this call — no file-scope
//! rename stack.

use std::collections::HashMap;

use crate::ir::{BlockId, Function, PhiId, TempId, Value};

struct Renamer<'a> {
    func: &'a mut Function,
    stacks: HashMap<TempId, Vec<TempId>>,
    phi_owner: &'a HashMap<PhiId, TempId>,
}

impl<'a> Renamer<'a> {
    fn top(&self, var: TempId) -> Option<TempId> {
        self.stacks.get(&var).and_then(|s| s.last().copied())
    }

    fn rewrite_value(&self, v: Value) -> Value {
        match v {
            Value::Temp(t) if self.stacks.contains_key(&t) => match self.top(t) {
                Some(cur) => Value::Temp(cur),
                None => v,
            },
            other => other,
        }
    }

    fn walk(&mut self, block: BlockId) {
        let mut pushed: Vec<TempId> = Vec::new();

        let phi_ids = self.func.block(block).phis.clone();
        for phi_id in phi_ids {
            let Some(&var) = self.phi_owner.get(&phi_id) else {
                continue;
            };
            let ty = self.func.phi(phi_id).ty;
            let fresh = self.func.new_temp(ty);
            self.func.phi_mut(phi_id).dst = fresh;
            self.stacks.entry(var).or_default().push(fresh);
            pushed.push(var);
        }

        let inst_ids = self.func.block(block).insts.clone();
        for inst_id in inst_ids {
            let mut new_args = self.func.inst(inst_id).args;
            for arg in new_args.iter_mut() {
                if let Some(v) = arg {
                    *v = self.rewrite_value(*v);
                }
            }
            self.func.inst_mut(inst_id).args = new_args;

            let dst = self.func.inst(inst_id).dst;
            if let Some(d) = dst {
                if self.stacks.contains_key(&d) {
                    let ty = self.func.temp_ty(d);
                    let fresh = self.func.new_temp(ty);
                    self.func.inst_mut(inst_id).dst = Some(fresh);
                    self.stacks.entry(d).or_default().push(fresh);
                    pushed.push(d);
                }
            }
        }

        match &self.func.block(block).term.clone() {
            crate::ir::Terminator::CondJump {
                cond,
                if_true,
                if_false,
            } => {
                let new_cond = self.rewrite_value(*cond);
                self.func.block_mut(block).term = crate::ir::Terminator::CondJump {
                    cond: new_cond,
                    if_true: *if_true,
                    if_false: *if_false,
                };
            }
            crate::ir::Terminator::Return { value: Some(v) } => {
                let new_v = self.rewrite_value(*v);
                self.func.block_mut(block).term = crate::ir::Terminator::Return { value: Some(new_v) };
            }
            _ => {}
        }

        let succs = self.func.block(block).succs.clone();
        for succ in succs {
            let phi_ids = self.func.block(succ).phis.clone();
            for phi_id in phi_ids {
                let Some(&var) = self.phi_owner.get(&phi_id) else {
                    continue;
                };
                if let Some(cur) = self.top(var) {
                    if let Some(slot) = self.func.phi_mut(phi_id).incoming_mut(block) {
                        *slot = Value::Temp(cur);
                    }
                }
            }
        }

        let children = self.func.block(block).doms.clone();
        for child in children {
            self.walk(child);
        }

        for var in pushed {
            if let Some(stack) = self.stacks.get_mut(&var) {
                stack.pop();
            }
        }
    }
}

/// Rename every promoted variable in `vars` into single-assignment form,
/// using `phi_owner` to recognize which inserted phis belong to which
/// variable. Requires dominator tree children (`Block::doms`) to already
/// be computed.
pub fn rename(func: &mut Function, vars: &[TempId], phi_owner: &HashMap<PhiId, TempId>) {
    let stacks = vars.iter().map(|v| (*v, Vec::new())).collect();
    let start = func.start;
    let mut renamer = Renamer {
        func,
        stacks,
        phi_owner,
    };
    renamer.walk(start);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::cfg::compute_cfg_edges;
    use crate::analysis::dominators::{compute_dominance_frontier, compute_dominator_tree, compute_rpo};
    use crate::ir::{Block, Instruction, Opcode, PrimType, Terminator};

    #[test]
    fn diamond_join_reads_via_phi() {
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

        let var = f.new_temp(PrimType::W);
        let zero = Value::Const(crate::ir::ConstHandle(0));
        let one = Value::Const(crate::ir::ConstHandle(1));
        let def_left = f.alloc_inst_id();
        f.insts
            .insert(def_left, Instruction::unary(Opcode::Copy, PrimType::W, Some(var), zero));
        f.block_mut(left).insts.push(def_left);
        let def_right = f.alloc_inst_id();
        f.insts
            .insert(def_right, Instruction::unary(Opcode::Copy, PrimType::W, Some(var), one));
        f.block_mut(right).insts.push(def_right);
        f.block_mut(join).term = Terminator::Return {
            value: Some(Value::Temp(var)),
        };

        compute_cfg_edges(&mut f);
        compute_rpo(&mut f);
        compute_dominator_tree(&mut f);
        compute_dominance_frontier(&mut f);

        let inserted = crate::ssa::phi_insertion::insert_phis(&mut f, var);
        assert_eq!(inserted.len(), 1);
        let phi_owner: HashMap<_, _> = inserted.iter().map(|id| (*id, var)).collect();
        rename(&mut f, &[var], &phi_owner);

        let phi_id = inserted[0];
        let phi = f.phi(phi_id);
        assert_ne!(phi.dst, var);
        assert_eq!(phi.args.len(), 2);
        assert!(phi.args.iter().all(|(_, v)| *v != Value::Temp(var)));

        match &f.block(join).term {
            Terminator::Return { value: Some(Value::Temp(t)) } => assert_eq!(*t, phi.dst),
            other => panic!("unexpected terminator: {other:?}"),
        }
    }
}
