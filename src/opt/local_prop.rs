//! Local constant & copy propagation (§4.4), per block.

use std::collections::HashMap;

use crate::ir::builder::Folder;
use crate::ir::{Context, Function, Opcode, PrimType, TempId, Terminator, Value};

fn chase(replace: &HashMap<TempId, Value>, mut v: Value) -> Value {
    let mut steps = 0;
    while let Value::Temp(t) = v {
        match replace.get(&t) {
            Some(next) if steps < replace.len() + 1 => {
                v = *next;
                steps += 1;
            }
            _ => break,
        }
    }
    v
}

/// Run local constant & copy propagation over every block of `func`
/// independently (the replacement map does not cross block boundaries).
/// Returns whether anything changed.
pub fn run(func: &mut Function, ctx: &mut Context) -> bool {
    let mut changed = false;
    for block_id in func.blocks_in_order() {
        let mut replace: HashMap<TempId, Value> = HashMap::new();
        let inst_ids = func.block(block_id).insts.clone();
        for inst_id in inst_ids {
            let mut args = func.inst(inst_id).args;
            for arg in args.iter_mut() {
                if let Some(v) = arg {
                    let rewritten = chase(&replace, *v);
                    if rewritten != *v {
                        changed = true;
                    }
                    *v = rewritten;
                }
            }
            func.inst_mut(inst_id).args = args;

            let folded = Folder::try_fold(ctx, func.inst(inst_id));
            if let Some(value) = folded {
                if let Some(dst) = func.inst(inst_id).dst {
                    replace.insert(dst, value);
                    let ty = func.inst(inst_id).ty;
                    let i = func.inst_mut(inst_id);
                    if i.opcode != Opcode::Copy || i.args[0] != Some(value) {
                        i.opcode = Opcode::Copy;
                        i.ty = ty;
                        i.args = [Some(value), None];
                        changed = true;
                    }
                }
            }
        }

        let term = func.block(block_id).term.clone();
        if let Terminator::CondJump {
            cond,
            if_true,
            if_false,
        } = term
        {
            let new_cond = chase(&replace, cond);
            let target = if if_true == if_false {
                Some(if_true)
            } else if let Some(v) = ctx.as_int(new_cond) {
                Some(if v != 0 { if_true } else { if_false })
            } else {
                None
            };
            match target {
                Some(t) => {
                    func.block_mut(block_id).term = Terminator::Jump { target: t };
                    changed = true;
                }
                None if new_cond != cond => {
                    func.block_mut(block_id).term = Terminator::CondJump {
                        cond: new_cond,
                        if_true,
                        if_false,
                    };
                    changed = true;
                }
                None => {}
            }
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Instruction, Terminator};

    #[test]
    fn constant_add_collapses_to_copy() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let mut ctx = Context::new();
        let two = ctx.intern_int(2);
        let three = ctx.intern_int(3);
        let dst = f.new_temp(PrimType::W);
        let id = f.alloc_inst_id();
        f.insts
            .insert(id, Instruction::binary(Opcode::Add, PrimType::W, Some(dst), two, three));
        let start = f.start;
        f.block_mut(start).insts.push(id);
        f.block_mut(start).term = Terminator::Return { value: Some(Value::Temp(dst)) };

        let changed = run(&mut f, &mut ctx);
        assert!(changed);
        assert_eq!(f.inst(id).opcode, Opcode::Copy);
        assert_eq!(ctx.as_int(f.inst(id).args[0].unwrap()), Some(5));
    }

    #[test]
    fn constant_condition_simplifies_condjump() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let mut ctx = Context::new();
        let left = f.push_block(crate::ir::Block::new(BlockId(1), "left"));
        let right = f.push_block(crate::ir::Block::new(BlockId(2), "right"));
        let one = ctx.intern_int(1);
        let start = f.start;
        f.block_mut(start).term = Terminator::CondJump {
            cond: one,
            if_true: left,
            if_false: right,
        };
        let changed = run(&mut f, &mut ctx);
        assert!(changed);
        assert_eq!(f.block(start).term, Terminator::Jump { target: left });
    }
}
