//! Mem2Reg (§4.3): promote entry-block stack allocations whose only uses
//! are matching-width loads and stores into plain temporaries.
//!
//! Per-function state only — no global rename stack (the source's
//! file-scope rename stack and file-scope temp list are refactored away;
//! see the crate's design notes).

use crate::error::Fatal;
use crate::ir::{Function, Opcode, PrimType, TempId, Value};

/// A promotable access: which instruction touches the allocation, and
/// whether it reads or writes it.
enum Access {
    Load { inst: crate::ir::InstId },
    Store { inst: crate::ir::InstId },
}

/// Decide whether `alloc_dst`'s only uses across `func` are loads/stores
/// through it as an address, returning them in encounter order, or `None`
/// if some other use disqualifies promotion.
fn collect_accesses(func: &Function, alloc_dst: TempId) -> Option<Vec<Access>> {
    let mut accesses = Vec::new();
    for block_id in func.blocks_in_order() {
        let block = func.block(block_id);
        for &inst_id in &block.insts {
            let inst = func.inst(inst_id);
            for (idx, arg) in inst.args.iter().enumerate() {
                let Some(Value::Temp(t)) = arg else { continue };
                if *t != alloc_dst {
                    continue;
                }
                let ok = match inst.opcode {
                    Opcode::LoadW | Opcode::LoadL | Opcode::LoadS if idx == 0 => {
                        accesses.push(Access::Load { inst: inst_id });
                        true
                    }
                    Opcode::StoreW | Opcode::StoreL | Opcode::StoreS if idx == 0 => {
                        accesses.push(Access::Store { inst: inst_id });
                        true
                    }
                    _ => false,
                };
                if !ok {
                    return None;
                }
            }
        }
        match &block.term {
            crate::ir::Terminator::CondJump { cond, .. } if *cond == Value::Temp(alloc_dst) => {
                return None;
            }
            crate::ir::Terminator::Return { value: Some(v) } if *v == Value::Temp(alloc_dst) => {
                return None;
            }
            _ => {}
        }
    }
    Some(accesses)
}

/// Promote every eligible entry-block allocation, returning the phantom
/// variable temp each one was promoted to (the pre-renaming SSA name
/// phi-insertion and renaming operate on).
pub fn promote(func: &mut Function) -> Result<Vec<TempId>, Fatal> {
    let entry = func.start;
    let alloc_insts: Vec<_> = func
        .block(entry)
        .insts
        .iter()
        .copied()
        .filter(|id| func.inst(*id).opcode.is_alloc())
        .collect();

    let mut promoted = Vec::new();
    for alloc_id in alloc_insts {
        let Some(alloc_dst) = func.inst(alloc_id).dst else {
            continue;
        };
        let Some(accesses) = collect_accesses(func, alloc_dst) else {
            continue;
        };

        let mut inferred_ty = None;
        for access in &accesses {
            let inst_id = match access {
                Access::Load { inst } | Access::Store { inst } => *inst,
            };
            if inferred_ty.is_none() {
                inferred_ty = Some(func.inst(inst_id).ty);
            }
        }
        let var_ty = inferred_ty.unwrap_or(PrimType::W);
        let var = func.new_temp(var_ty);

        func.inst_mut(alloc_id).opcode = Opcode::Nop;
        func.inst_mut(alloc_id).dst = None;
        func.inst_mut(alloc_id).args = [None, None];

        for access in accesses {
            match access {
                Access::Store { inst } => {
                    let value = func.inst(inst).args[1];
                    let i = func.inst_mut(inst);
                    i.opcode = Opcode::Copy;
                    i.ty = var_ty;
                    i.dst = Some(var);
                    i.args = [value, None];
                }
                Access::Load { inst } => {
                    let i = func.inst_mut(inst);
                    i.opcode = Opcode::Copy;
                    i.ty = var_ty;
                    i.args = [Some(Value::Temp(var)), None];
                }
            }
        }

        promoted.push(var);
    }
    Ok(promoted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Instruction, Value};

    #[test]
    fn store_then_load_promotes_to_copies() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let ptr = f.new_temp(PrimType::L);
        let alloc_id = f.alloc_inst_id();
        f.insts.insert(
            alloc_id,
            Instruction::unary(Opcode::Alloc4, PrimType::L, Some(ptr), Value::Const(crate::ir::ConstHandle(0))),
        );
        f.block_mut(entry).insts.push(alloc_id);

        let seven = Value::Const(crate::ir::ConstHandle(1));
        let store_id = f.alloc_inst_id();
        f.insts.insert(
            store_id,
            Instruction::binary(Opcode::StoreW, PrimType::W, None, Value::Temp(ptr), seven),
        );
        f.block_mut(entry).insts.push(store_id);

        let loaded = f.new_temp(PrimType::W);
        let load_id = f.alloc_inst_id();
        f.insts.insert(
            load_id,
            Instruction::unary(Opcode::LoadW, PrimType::W, Some(loaded), Value::Temp(ptr)),
        );
        f.block_mut(entry).insts.push(load_id);

        let promoted = promote(&mut f).unwrap();
        assert_eq!(promoted.len(), 1);
        let var = promoted[0];

        assert_eq!(f.inst(alloc_id).opcode, Opcode::Nop);
        assert_eq!(f.inst(store_id).opcode, Opcode::Copy);
        assert_eq!(f.inst(store_id).dst, Some(var));
        assert_eq!(f.inst(load_id).opcode, Opcode::Copy);
        assert_eq!(f.inst(load_id).args[0], Some(Value::Temp(var)));
    }

    #[test]
    fn escaping_pointer_is_not_promoted() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let entry = f.start;
        let ptr = f.new_temp(PrimType::L);
        let alloc_id = f.alloc_inst_id();
        f.insts.insert(
            alloc_id,
            Instruction::unary(Opcode::Alloc8, PrimType::L, Some(ptr), Value::Const(crate::ir::ConstHandle(0))),
        );
        f.block_mut(entry).insts.push(alloc_id);

        let arg_id = f.alloc_inst_id();
        f.insts.insert(
            arg_id,
            Instruction::unary(Opcode::Arg, PrimType::L, None, Value::Temp(ptr)),
        );
        f.block_mut(entry).insts.push(arg_id);

        let promoted = promote(&mut f).unwrap();
        assert!(promoted.is_empty());
        assert_eq!(f.inst(alloc_id).opcode, Opcode::Alloc8);
    }
}
