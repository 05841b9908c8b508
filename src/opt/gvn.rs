//! Global value numbering (§4.4): structural hashing over opcode plus
//! recursively-canonicalized operands, traversing blocks in (dominator
//! tree) reverse post order so every operand's canonical number is
//! already known except across a loop back edge.

use std::collections::HashMap;

use crate::ir::{Function, Opcode, PrimType, TempId, Terminator, Value};

#[derive(PartialEq, Eq, Hash, Clone)]
enum Key {
    Inst(Opcode, PrimType, [Option<Value>; 2]),
    Phi(PrimType, Vec<(crate::ir::BlockId, Value)>),
}

/// Redirect later temporaries with an identical structural hash to the
/// first (canonical) one. A phi whose arguments differ only because one
/// argument isn't numbered yet (a loop back edge) is left un-redirected
/// — it gets a fresh number of its own, breaking the cycle arbitrarily.
pub fn run(func: &mut Function) -> bool {
    let mut changed = false;
    let mut canon: HashMap<TempId, TempId> = HashMap::new();
    let mut table: HashMap<Key, TempId> = HashMap::new();

    for block_id in func.rpo.clone() {
        for phi_id in func.block(block_id).phis.clone() {
            let phi = func.phi(phi_id).clone();
            let mut resolved_args = Vec::with_capacity(phi.args.len());
            let mut all_numbered = true;
            for (pred, v) in &phi.args {
                match v {
                    Value::Temp(t) => match canon.get(t) {
                        Some(&c) => resolved_args.push((*pred, Value::Temp(c))),
                        None => {
                            all_numbered = false;
                            resolved_args.push((*pred, *v));
                        }
                    },
                    other => resolved_args.push((*pred, *other)),
                }
            }
            if !all_numbered {
                canon.insert(phi.dst, phi.dst);
                continue;
            }
            let key = Key::Phi(phi.ty, resolved_args);
            if let Some(&existing) = table.get(&key) {
                canon.insert(phi.dst, existing);
                changed = true;
            } else {
                table.insert(key, phi.dst);
                canon.insert(phi.dst, phi.dst);
            }
        }

        for inst_id in func.block(block_id).insts.clone() {
            let mut args = func.inst(inst_id).args;
            for arg in args.iter_mut() {
                if let Some(Value::Temp(t)) = arg {
                    if let Some(&c) = canon.get(t) {
                        *arg = Some(Value::Temp(c));
                    }
                }
            }
            func.inst_mut(inst_id).args = args;

            let inst = func.inst(inst_id);
            let Some(dst) = inst.dst else { continue };
            if inst.opcode.is_side_effecting_or_pinned() || inst.opcode.is_alloc() {
                canon.insert(dst, dst);
                continue;
            }
            let key = Key::Inst(inst.opcode, inst.ty, inst.args);
            if let Some(&existing) = table.get(&key) {
                canon.insert(dst, existing);
                let i = func.inst_mut(inst_id);
                i.opcode = Opcode::Copy;
                i.args = [Some(Value::Temp(existing)), None];
                changed = true;
            } else {
                table.insert(key, dst);
                canon.insert(dst, dst);
            }
        }

        let term = func.block(block_id).term.clone();
        let new_term = match term {
            Terminator::CondJump {
                cond: Value::Temp(t),
                if_true,
                if_false,
            } => {
                let c = canon.get(&t).copied().unwrap_or(t);
                Terminator::CondJump {
                    cond: Value::Temp(c),
                    if_true,
                    if_false,
                }
            }
            Terminator::Return {
                value: Some(Value::Temp(t)),
            } => {
                let c = canon.get(&t).copied().unwrap_or(t);
                Terminator::Return {
                    value: Some(Value::Temp(c)),
                }
            }
            other => other,
        };
        func.block_mut(block_id).term = new_term;
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Context, Instruction};

    #[test]
    fn redundant_add_redirects_to_first() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let start = f.start;
        let mut ctx = Context::new();
        let a = ctx.intern_int(1);
        let b = ctx.intern_int(2);

        let d0 = f.new_temp(PrimType::W);
        let id0 = f.alloc_inst_id();
        f.insts.insert(id0, Instruction::binary(Opcode::Add, PrimType::W, Some(d0), a, b));
        f.block_mut(start).insts.push(id0);

        let d1 = f.new_temp(PrimType::W);
        let id1 = f.alloc_inst_id();
        f.insts.insert(id1, Instruction::binary(Opcode::Add, PrimType::W, Some(d1), a, b));
        f.block_mut(start).insts.push(id1);

        f.rpo = vec![start];
        let changed = run(&mut f);
        assert!(changed);
        assert_eq!(f.inst(id1).opcode, Opcode::Copy);
        assert_eq!(f.inst(id1).args[0], Some(Value::Temp(d0)));
    }
}
