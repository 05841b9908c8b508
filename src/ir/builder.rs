//! The IR builder and its constant/algebraic folder (§4.1).

use super::block::Block;
use super::func::Function;
use super::instr::{Instruction, Opcode, Terminator};
use super::module::Module;
use super::value::{Context, PrimType, Value};
use super::BlockId;

/// Folds a binary/unary op over two (or one) operands when doing so is
/// sound without emitting an instruction: constant folding, plus the
/// algebraic identities listed in spec.md §4.1.
///
/// One method per opcode, mirroring the original `ir::Folder`'s
/// `fold_add`/`fold_sub`/... shape, so each identity stays independently
/// testable.
pub struct Folder;

impl Folder {
    fn both_const(ctx: &Context, a: Value, b: Value) -> Option<(i64, i64)> {
        match (ctx.as_int(a), ctx.as_int(b)) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    fn both_float(ctx: &Context, a: Value, b: Value) -> Option<(f32, f32)> {
        match (ctx.as_float(a), ctx.as_float(b)) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        }
    }

    fn syntactically_same(a: Value, b: Value) -> bool {
        a == b
    }

    pub fn fold_add(ctx: &mut Context, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        if ty.is_float() {
            if let Some((x, y)) = Self::both_float(ctx, a, b) {
                return Some(ctx.intern_float(x + y));
            }
            if ctx.as_float(a) == Some(0.0) {
                return Some(b);
            }
            if ctx.as_float(b) == Some(0.0) {
                return Some(a);
            }
            return None;
        }
        if let Some((x, y)) = Self::both_const(ctx, a, b) {
            return Some(if ty == PrimType::L {
                ctx.intern_long(x.wrapping_add(y))
            } else {
                ctx.intern_int(x.wrapping_add(y) as i32)
            });
        }
        if ctx.as_int(a) == Some(0) {
            return Some(b);
        }
        if ctx.as_int(b) == Some(0) {
            return Some(a);
        }
        None
    }

    pub fn fold_sub(ctx: &mut Context, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        if ty.is_float() {
            if let Some((x, y)) = Self::both_float(ctx, a, b) {
                return Some(ctx.intern_float(x - y));
            }
            if ctx.as_float(b) == Some(0.0) {
                return Some(a);
            }
            return None;
        }
        if let Some((x, y)) = Self::both_const(ctx, a, b) {
            return Some(if ty == PrimType::L {
                ctx.intern_long(x.wrapping_sub(y))
            } else {
                ctx.intern_int(x.wrapping_sub(y) as i32)
            });
        }
        if ctx.as_int(b) == Some(0) {
            return Some(a);
        }
        if Self::syntactically_same(a, b) {
            return Some(ctx.intern_int(0));
        }
        None
    }

    pub fn fold_neg(ctx: &mut Context, ty: PrimType, a: Value) -> Option<Value> {
        if ty.is_float() {
            return ctx.as_float(a).map(|x| ctx.intern_float(-x));
        }
        if let Some(x) = ctx.as_int(a) {
            return Some(if ty == PrimType::L {
                ctx.intern_long(x.wrapping_neg())
            } else {
                ctx.intern_int((x as i32).wrapping_neg())
            });
        }
        None
    }

    pub fn fold_mul(ctx: &mut Context, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        if ty.is_float() {
            if let Some((x, y)) = Self::both_float(ctx, a, b) {
                return Some(ctx.intern_float(x * y));
            }
            if ctx.as_float(a) == Some(0.0) || ctx.as_float(b) == Some(0.0) {
                return Some(ctx.intern_float(0.0));
            }
            if ctx.as_float(a) == Some(1.0) {
                return Some(b);
            }
            if ctx.as_float(b) == Some(1.0) {
                return Some(a);
            }
            return None;
        }
        if let Some((x, y)) = Self::both_const(ctx, a, b) {
            return Some(if ty == PrimType::L {
                ctx.intern_long(x.wrapping_mul(y))
            } else {
                ctx.intern_int(x.wrapping_mul(y) as i32)
            });
        }
        if ctx.as_int(a) == Some(0) || ctx.as_int(b) == Some(0) {
            return Some(ctx.intern_int(0));
        }
        if ctx.as_int(a) == Some(1) {
            return Some(b);
        }
        if ctx.as_int(b) == Some(1) {
            return Some(a);
        }
        None
    }

    /// `div` is defined on int and float; host truncating semantics for
    /// two integer constants (matches spec.md §4.1).
    pub fn fold_div(ctx: &mut Context, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        if ty.is_float() {
            if let Some((x, y)) = Self::both_float(ctx, a, b) {
                if y != 0.0 {
                    return Some(ctx.intern_float(x / y));
                }
                return None;
            }
            if ctx.as_float(b) == Some(1.0) {
                return Some(a);
            }
            return None;
        }
        if let Some((x, y)) = Self::both_const(ctx, a, b) {
            if y != 0 {
                return Some(if ty == PrimType::L {
                    ctx.intern_long(x.wrapping_div(y))
                } else {
                    ctx.intern_int(x.wrapping_div(y) as i32)
                });
            }
            return None;
        }
        if ctx.as_int(a) == Some(0) {
            return Some(ctx.intern_int(0));
        }
        if ctx.as_int(b) == Some(1) {
            return Some(a);
        }
        if Self::syntactically_same(a, b) {
            return Some(ctx.intern_int(1));
        }
        None
    }

    /// `rem` is int-only; the caller must reject float `rem` upstream
    /// (spec.md §4.1 — "using it on float is an error signaled upstream").
    pub fn fold_rem(ctx: &mut Context, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        debug_assert!(!ty.is_float(), "rem is defined on int only");
        if let Some((x, y)) = Self::both_const(ctx, a, b) {
            if y != 0 {
                return Some(if ty == PrimType::L {
                    ctx.intern_long(x.wrapping_rem(y))
                } else {
                    ctx.intern_int(x.wrapping_rem(y) as i32)
                });
            }
            return None;
        }
        if ctx.as_int(a) == Some(0) {
            return Some(ctx.intern_int(0));
        }
        if ctx.as_int(b) == Some(1) {
            return Some(ctx.intern_int(0));
        }
        None
    }

    pub fn fold_compare_int(
        ctx: &mut Context,
        op: Opcode,
        a: Value,
        b: Value,
    ) -> Option<Value> {
        let (x, y) = Self::both_const(ctx, a, b)?;
        let r = match op {
            Opcode::CeqW => x == y,
            Opcode::CneW => x != y,
            Opcode::CsleW => x <= y,
            Opcode::CsltW => x < y,
            Opcode::CsgeW => x >= y,
            Opcode::CsgtW => x > y,
            _ => return None,
        };
        Some(ctx.intern_int(r as i32))
    }

    pub fn fold_compare_float(
        ctx: &mut Context,
        op: Opcode,
        a: Value,
        b: Value,
    ) -> Option<Value> {
        let (x, y) = Self::both_float(ctx, a, b)?;
        let r = match op {
            Opcode::CeqS => x == y,
            Opcode::CneS => x != y,
            Opcode::CleS => x <= y,
            Opcode::CltS => x < y,
            Opcode::CgeS => x >= y,
            Opcode::CgtS => x > y,
            _ => return None,
        };
        Some(ctx.intern_int(r as i32))
    }

    pub fn fold_stosi(ctx: &mut Context, a: Value) -> Option<Value> {
        ctx.as_float(a).map(|x| ctx.intern_int(x as i32))
    }

    pub fn fold_swtof(ctx: &mut Context, a: Value) -> Option<Value> {
        ctx.as_int(a).map(|x| ctx.intern_float(x as i32 as f32))
    }

    pub fn fold_extsw(ctx: &mut Context, a: Value) -> Option<Value> {
        ctx.as_int(a).map(|x| ctx.intern_long(x as i32 as i64))
    }

    /// Attempt to fold an already-materialized instruction, for use by
    /// passes that run after the IR has been built (local/global copy
    /// propagation, global value numbering) rather than at build time.
    /// Dispatches to the per-opcode fold methods above; `Copy` "folds" to
    /// its own source, making copy propagation a special case of the same
    /// mechanism the builder uses.
    pub fn try_fold(ctx: &mut Context, inst: &Instruction) -> Option<Value> {
        let a = inst.args[0];
        let b = inst.args[1];
        match inst.opcode {
            Opcode::Add => Self::fold_add(ctx, inst.ty, a?, b?),
            Opcode::Sub => Self::fold_sub(ctx, inst.ty, a?, b?),
            Opcode::Mul => Self::fold_mul(ctx, inst.ty, a?, b?),
            Opcode::Div => Self::fold_div(ctx, inst.ty, a?, b?),
            Opcode::Rem => Self::fold_rem(ctx, inst.ty, a?, b?),
            Opcode::Neg => Self::fold_neg(ctx, inst.ty, a?),
            Opcode::CeqW | Opcode::CneW | Opcode::CsleW | Opcode::CsltW | Opcode::CsgeW | Opcode::CsgtW => {
                Self::fold_compare_int(ctx, inst.opcode, a?, b?)
            }
            Opcode::CeqS | Opcode::CneS | Opcode::CleS | Opcode::CltS | Opcode::CgeS | Opcode::CgtS => {
                Self::fold_compare_float(ctx, inst.opcode, a?, b?)
            }
            Opcode::StoSi => Self::fold_stosi(ctx, a?),
            Opcode::SwToF => Self::fold_swtof(ctx, a?),
            Opcode::ExtSW => Self::fold_extsw(ctx, a?),
            Opcode::Copy => a,
            _ => None,
        }
    }
}

/// Builds well-formed IR incrementally for a front end.
///
/// Every arithmetic/compare/convert builder method consults [`Folder`]
/// first; when folding succeeds, no instruction is emitted and the folded
/// constant is returned directly (§4.1's builder contract).
pub struct Builder<'m> {
    module: &'m mut Module,
    ctx: Context,
    func: usize,
    insert_point: Option<BlockId>,
}

impl<'m> Builder<'m> {
    pub fn new(module: &'m mut Module, ctx: Context) -> Self {
        Self {
            module,
            ctx,
            func: usize::MAX,
            insert_point: None,
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    pub fn into_context(self) -> Context {
        self.ctx
    }

    /// Start a new function and make it current.
    pub fn create_function(&mut self, export: bool, name: impl Into<String>, ret_ty: PrimType) -> usize {
        let start_id = self.module.fresh_block_id();
        let f = Function::new(start_id, export, name, ret_ty);
        self.module.functions.push(f);
        self.func = self.module.functions.len() - 1;
        self.insert_point = Some(start_id);
        self.func
    }

    pub fn set_function(&mut self, idx: usize) {
        self.func = idx;
        self.insert_point = None;
    }

    fn func_mut(&mut self) -> &mut Function {
        &mut self.module.functions[self.func]
    }

    pub fn entry_block(&self) -> BlockId {
        self.module.functions[self.func].start
    }

    pub fn set_insert_block(&mut self, block: BlockId) {
        self.insert_point = Some(block);
    }

    fn insert_point(&self) -> BlockId {
        self.insert_point.unwrap_or(self.module.functions[self.func].end)
    }

    /// Create a new block (a "label") appended after the current end of
    /// the function.
    pub fn create_label(&mut self, name: impl Into<String>) -> BlockId {
        let id = self.module.fresh_block_id();
        let block = Block::new(id, name);
        self.func_mut().push_block(block);
        id
    }

    fn push_inst(&mut self, inst: Instruction) -> Option<Value> {
        let dst = inst.dst;
        let id = self.func_mut().alloc_inst_id();
        let b = self.insert_point();
        self.func_mut().insts.insert(id, inst);
        self.func_mut().block_mut(b).insts.push(id);
        dst.map(super::value::Value::Temp)
    }

    fn new_temp(&mut self, ty: PrimType) -> super::TempId {
        let id = self.func_mut().new_temp(ty);
        self.ctx.temp_ty.insert(id, ty);
        id
    }

    fn binary_fold(&mut self, op: Opcode, ty: PrimType, a: Value, b: Value) -> Option<Value> {
        match op {
            Opcode::Add => Folder::fold_add(&mut self.ctx, ty, a, b),
            Opcode::Sub => Folder::fold_sub(&mut self.ctx, ty, a, b),
            Opcode::Mul => Folder::fold_mul(&mut self.ctx, ty, a, b),
            Opcode::Div => Folder::fold_div(&mut self.ctx, ty, a, b),
            Opcode::Rem => Folder::fold_rem(&mut self.ctx, ty, a, b),
            Opcode::CeqW | Opcode::CneW | Opcode::CsleW | Opcode::CsltW | Opcode::CsgeW
            | Opcode::CsgtW => Folder::fold_compare_int(&mut self.ctx, op, a, b),
            Opcode::CeqS | Opcode::CneS | Opcode::CleS | Opcode::CltS | Opcode::CgeS
            | Opcode::CgtS => Folder::fold_compare_float(&mut self.ctx, op, a, b),
            _ => None,
        }
    }

    fn emit_binary(&mut self, op: Opcode, ty: PrimType, a: Value, b: Value, result_ty: PrimType) -> Value {
        if let Some(folded) = self.binary_fold(op, ty, a, b) {
            return folded;
        }
        let dst = self.new_temp(result_ty);
        self.push_inst(Instruction::binary(op, result_ty, Some(dst), a, b));
        Value::Temp(dst)
    }

    pub fn create_add(&mut self, ty: PrimType, a: Value, b: Value) -> Value {
        self.emit_binary(Opcode::Add, ty, a, b, ty)
    }
    pub fn create_sub(&mut self, ty: PrimType, a: Value, b: Value) -> Value {
        self.emit_binary(Opcode::Sub, ty, a, b, ty)
    }
    pub fn create_mul(&mut self, ty: PrimType, a: Value, b: Value) -> Value {
        self.emit_binary(Opcode::Mul, ty, a, b, ty)
    }
    pub fn create_div(&mut self, ty: PrimType, a: Value, b: Value) -> Value {
        self.emit_binary(Opcode::Div, ty, a, b, ty)
    }
    /// `rem` is int-only; callers must not invoke with `ty == S`.
    pub fn create_rem(&mut self, ty: PrimType, a: Value, b: Value) -> Value {
        debug_assert!(!ty.is_float());
        self.emit_binary(Opcode::Rem, ty, a, b, ty)
    }

    pub fn create_neg(&mut self, ty: PrimType, a: Value) -> Value {
        if let Some(folded) = Folder::fold_neg(&mut self.ctx, ty, a) {
            return folded;
        }
        let dst = self.new_temp(ty);
        self.push_inst(Instruction::unary(Opcode::Neg, ty, Some(dst), a));
        Value::Temp(dst)
    }

    fn create_compare(&mut self, op: Opcode, a: Value, b: Value) -> Value {
        if let Some(folded) = self.binary_fold(op, if op.wire_tag().ends_with('s') { PrimType::S } else { PrimType::W }, a, b) {
            return folded;
        }
        let dst = self.new_temp(PrimType::W);
        self.push_inst(Instruction::binary(op, PrimType::W, Some(dst), a, b));
        Value::Temp(dst)
    }

    pub fn create_ceqw(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CeqW, a, b)
    }
    pub fn create_cnew(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CneW, a, b)
    }
    pub fn create_cslew(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CsleW, a, b)
    }
    pub fn create_csltw(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CsltW, a, b)
    }
    pub fn create_csgew(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CsgeW, a, b)
    }
    pub fn create_csgtw(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CsgtW, a, b)
    }
    pub fn create_ceqs(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CeqS, a, b)
    }
    pub fn create_cnes(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CneS, a, b)
    }
    pub fn create_cles(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CleS, a, b)
    }
    pub fn create_clts(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CltS, a, b)
    }
    pub fn create_cges(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CgeS, a, b)
    }
    pub fn create_cgts(&mut self, a: Value, b: Value) -> Value {
        self.create_compare(Opcode::CgtS, a, b)
    }

    pub fn create_stosi(&mut self, a: Value) -> Value {
        if let Some(folded) = Folder::fold_stosi(&mut self.ctx, a) {
            return folded;
        }
        let dst = self.new_temp(PrimType::W);
        self.push_inst(Instruction::unary(Opcode::StoSi, PrimType::W, Some(dst), a));
        Value::Temp(dst)
    }

    pub fn create_swtof(&mut self, a: Value) -> Value {
        if let Some(folded) = Folder::fold_swtof(&mut self.ctx, a) {
            return folded;
        }
        let dst = self.new_temp(PrimType::S);
        self.push_inst(Instruction::unary(Opcode::SwToF, PrimType::S, Some(dst), a));
        Value::Temp(dst)
    }

    pub fn create_extsw(&mut self, a: Value) -> Value {
        if let Some(folded) = Folder::fold_extsw(&mut self.ctx, a) {
            return folded;
        }
        let dst = self.new_temp(PrimType::L);
        self.push_inst(Instruction::unary(Opcode::ExtSW, PrimType::L, Some(dst), a));
        Value::Temp(dst)
    }

    pub fn create_copy(&mut self, ty: PrimType, a: Value) -> Value {
        let dst = self.new_temp(ty);
        self.push_inst(Instruction::unary(Opcode::Copy, ty, Some(dst), a));
        Value::Temp(dst)
    }

    /// Store `value` through `address`. The store width is `ty`.
    pub fn create_store(&mut self, ty: PrimType, value: Value, address: Value) {
        let op = match ty {
            PrimType::S => Opcode::StoreS,
            PrimType::L => Opcode::StoreL,
            _ => Opcode::StoreW,
        };
        self.push_inst(Instruction::binary(op, ty, None, address, value));
    }

    /// Load a value of type `ty` through `address`.
    pub fn create_load(&mut self, ty: PrimType, address: Value) -> Value {
        let op = match ty {
            PrimType::S => Opcode::LoadS,
            PrimType::L => Opcode::LoadL,
            _ => Opcode::LoadW,
        };
        let dst = self.new_temp(ty);
        self.push_inst(Instruction::unary(op, ty, Some(dst), address));
        Value::Temp(dst)
    }

    /// Allocate `bytes` of stack space, always in the entry block
    /// regardless of the current insertion block (§4.1).
    pub fn create_alloc(&mut self, align8: bool, bytes: i64) -> Value {
        let ty = if align8 { PrimType::L } else { PrimType::W };
        let op = if align8 { Opcode::Alloc8 } else { Opcode::Alloc4 };
        let size = self.ctx.intern_long(bytes);
        let dst = self.new_temp(ty);
        let entry = self.entry_block();
        let inst = Instruction::unary(op, ty, Some(dst), size);
        let id = self.func_mut().alloc_inst_id();
        self.func_mut().insts.insert(id, inst);
        self.func_mut().block_mut(entry).insts.push(id);
        Value::Temp(dst)
    }

    /// Receive the next function parameter.
    pub fn create_par(&mut self, ty: PrimType) -> Value {
        let dst = self.new_temp(ty);
        self.push_inst(Instruction::nullary(Opcode::Par, ty, Some(dst)));
        self.func_mut().param_tys.push(ty);
        Value::Temp(dst)
    }

    /// Pass `value` as the next argument of the following `call`.
    pub fn create_arg(&mut self, ty: PrimType, value: Value) {
        self.push_inst(Instruction::unary(Opcode::Arg, ty, None, value));
    }

    /// Call the function at `callee`; must be preceded by the right
    /// number of `create_arg` calls. Returns `None` for a void callee.
    pub fn create_call(&mut self, ty: PrimType, callee: Value) -> Option<Value> {
        if ty == PrimType::X {
            self.push_inst(Instruction::unary(Opcode::Call, ty, None, callee));
            return None;
        }
        let dst = self.new_temp(ty);
        self.push_inst(Instruction::unary(Opcode::Call, ty, Some(dst), callee));
        Some(Value::Temp(dst))
    }

    /// Set the current block's terminator to an unconditional jump.
    /// Idempotent: a no-op if the block already has a real terminator
    /// (§4.1 — "this makes dead code after `return` harmless").
    pub fn create_jmp(&mut self, target: BlockId) {
        let b = self.insert_point();
        let blk = self.func_mut().block_mut(b);
        if !blk.term.is_set() {
            blk.term = Terminator::Jump { target };
        }
    }

    /// Set the current block's terminator to a conditional jump.
    pub fn create_jnz(&mut self, cond: Value, if_true: BlockId, if_false: BlockId) {
        let b = self.insert_point();
        let blk = self.func_mut().block_mut(b);
        if !blk.term.is_set() {
            blk.term = Terminator::CondJump {
                cond,
                if_true,
                if_false,
            };
        }
    }

    /// Set the current block's terminator to a return.
    pub fn create_ret(&mut self, value: Option<Value>) {
        let b = self.insert_point();
        let blk = self.func_mut().block_mut(b);
        if !blk.term.is_set() {
            blk.term = Terminator::Return { value };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> (Module, Context) {
        (Module::new(), Context::new())
    }

    #[test]
    fn constant_fold_on_builder() {
        let (mut module, ctx) = fresh();
        let mut b = Builder::new(&mut module, ctx);
        b.create_function(false, "f", PrimType::W);
        let five = b.context_mut().intern_int(2);
        let three = b.context_mut().intern_int(3);
        let t = b.create_add(PrimType::W, five, three);
        assert_eq!(b.context().as_int(t), Some(5));
        assert_eq!(module.functions[0].block(module.functions[0].start).insts.len(), 0);
    }

    #[test]
    fn algebraic_identity_mul_by_one() {
        let (mut module, ctx) = fresh();
        let mut b = Builder::new(&mut module, ctx);
        b.create_function(false, "f", PrimType::W);
        let x_temp = b.func_mut().new_temp(PrimType::W);
        let x = Value::Temp(x_temp);
        let one = b.context_mut().intern_int(1);
        let t = b.create_mul(PrimType::W, x, one);
        assert_eq!(t, x);
        assert_eq!(module.functions[0].block(module.functions[0].start).insts.len(), 0);
    }

    #[test]
    fn terminator_builders_are_idempotent() {
        let (mut module, ctx) = fresh();
        let mut b = Builder::new(&mut module, ctx);
        b.create_function(false, "f", PrimType::W);
        let zero = b.context_mut().intern_int(0);
        b.create_ret(Some(zero));
        let other = b.create_label("dead");
        b.create_jmp(other); // entry already terminated; no-op
        let entry = b.entry_block();
        assert_eq!(
            module.functions[0].block(entry).term,
            Terminator::Return { value: Some(zero) }
        );
    }

    #[test]
    fn alloc_always_lands_in_entry() {
        let (mut module, ctx) = fresh();
        let mut b = Builder::new(&mut module, ctx);
        b.create_function(false, "f", PrimType::W);
        let other = b.create_label("other");
        b.set_insert_block(other);
        b.create_alloc(false, 4);
        let entry = b.entry_block();
        assert_eq!(module.functions[0].block(entry).insts.len(), 1);
        assert_eq!(module.functions[0].block(other).insts.len(), 0);
    }
}
