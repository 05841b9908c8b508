//! Leaf and inlinability flags (§4.2).

use crate::ir::{Context, Function, Opcode, Value};

/// A function is leaf iff it contains no `call`. It is inlinable iff it
/// never directly calls itself — indirect recursion is structurally
/// impossible in this language.
pub fn compute_leaf_and_inline_flags(func: &mut Function, ctx: &Context) {
    let mut has_call = false;
    let mut calls_self = false;
    for inst in func.insts.values() {
        if inst.opcode != Opcode::Call {
            continue;
        }
        has_call = true;
        for arg in inst.operands() {
            if let Value::Global(h) = arg {
                if ctx.global_name(h) == func.name {
                    calls_self = true;
                }
            }
        }
    }
    func.is_leaf = !has_call;
    func.is_inlinable = !calls_self;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BlockId, Instruction, PrimType};

    #[test]
    fn function_without_call_is_leaf() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let ctx = Context::new();
        compute_leaf_and_inline_flags(&mut f, &ctx);
        assert!(f.is_leaf);
        assert!(f.is_inlinable);
    }

    #[test]
    fn direct_self_call_is_not_inlinable() {
        let mut f = Function::new(BlockId(0), false, "f", PrimType::W);
        let mut ctx = Context::new();
        let g = ctx.intern_global("f");
        let id = f.alloc_inst_id();
        f.insts.insert(id, Instruction::unary(Opcode::Call, PrimType::W, None, g));
        let start = f.start;
        f.block_mut(start).insts.push(id);
        compute_leaf_and_inline_flags(&mut f, &ctx);
        assert!(!f.is_leaf);
        assert!(!f.is_inlinable);
    }
}
