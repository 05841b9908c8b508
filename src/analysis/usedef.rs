//! Use-def chains (`FillUses`, §4.2).

use crate::ir::value::{Def, Use};
use crate::ir::Function;

/// Clear every temporary's use list and def list, then rescan every phi,
/// instruction, and terminator to repopulate them.
pub fn fill_uses(func: &mut Function) {
    for meta in func.temps.values_mut() {
        meta.uses.clear();
        meta.defs.clear();
    }

    let block_ids = func.blocks_in_order();

    for &block_id in &block_ids {
        let phi_ids = func.block(block_id).phis.clone();
        for phi_id in phi_ids {
            let phi = func.phi(phi_id).clone();
            if let Some(meta) = func.temps.get_mut(&phi.dst) {
                meta.defs.push(Def::PhiDef {
                    phi: phi_id,
                    block: block_id,
                });
            }
            for (pred, value) in &phi.args {
                if let crate::ir::Value::Temp(t) = value {
                    if let Some(meta) = func.temps.get_mut(t) {
                        meta.uses.push(Use::PhiUse {
                            phi: phi_id,
                            block: *pred,
                        });
                    }
                }
            }
        }

        let inst_ids = func.block(block_id).insts.clone();
        for inst_id in inst_ids {
            let inst = func.inst(inst_id).clone();
            if let Some(dst) = inst.dst {
                if let Some(meta) = func.temps.get_mut(&dst) {
                    meta.defs.push(Def::InstDef { inst: inst_id });
                }
            }
            for arg in inst.operands() {
                if let crate::ir::Value::Temp(t) = arg {
                    if let Some(meta) = func.temps.get_mut(&t) {
                        meta.uses.push(Use::InstUse { inst: inst_id });
                    }
                }
            }
        }

        let term = func.block(block_id).term.clone();
        match term {
            crate::ir::Terminator::CondJump { cond, .. } => {
                if let crate::ir::Value::Temp(t) = cond {
                    if let Some(meta) = func.temps.get_mut(&t) {
                        meta.uses.push(Use::JmpUse { block: block_id });
                    }
                }
            }
            crate::ir::Terminator::Return { value: Some(v) } => {
                if let crate::ir::Value::Temp(t) = v {
                    if let Some(meta) = func.temps.get_mut(&t) {
                        meta.uses.push(Use::JmpUse { block: block_id });
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Instruction, Opcode, PrimType, Terminator, Value};

    #[test]
    fn instruction_def_and_use_recorded() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let t0 = f.new_temp(PrimType::W);
        let t1 = f.new_temp(PrimType::W);
        let id = f.alloc_inst_id();
        f.insts.insert(
            id,
            Instruction::unary(Opcode::Copy, PrimType::W, Some(t1), Value::Temp(t0)),
        );
        let start = f.start;
        f.block_mut(start).insts.push(id);
        f.block_mut(start).term = Terminator::Return {
            value: Some(Value::Temp(t1)),
        };
        fill_uses(&mut f);
        assert_eq!(f.temps[&t1].defs.len(), 1);
        assert_eq!(f.temps[&t0].uses.len(), 1);
        assert_eq!(f.temps[&t1].uses.len(), 1);
    }
}
