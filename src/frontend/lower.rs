//! Lowers a checked [`Program`] into IR via [`crate::ir::Builder`].
//!
//! Deliberately naive, matching the teacher's "emit as you parse" generator
//! style: every local (including parameters) gets a stack slot up front and
//! is accessed through `load`/`store`, rather than this pass tracking a
//! current SSA value per variable itself. That's exactly the shape
//! [`crate::ssa::construct_ssa`]'s Mem2Reg stage expects to promote back
//! out, so the rename/phi-insertion machinery does real work once this
//! front end is driven end-to-end.

use std::collections::HashMap;

use crate::ir::{Builder, Context, Module, PrimType, Value};
use crate::types::Ty;

use super::ast::{BinOp, Expr, FunctionDecl, Program, Stmt, TypeExpr};
use super::sema::function_signatures;

fn to_ty(ty: &TypeExpr) -> Ty {
    match ty {
        TypeExpr::Int => Ty::Int,
        TypeExpr::Float => Ty::Float,
        TypeExpr::Void => Ty::Void,
        TypeExpr::Array(elem, size) => Ty::Array(Box::new(to_ty(elem)), size.unwrap_or(0).max(0) as usize),
    }
}

fn to_prim(ty: &Ty) -> PrimType {
    match ty {
        Ty::Int => PrimType::W,
        Ty::Float => PrimType::S,
        Ty::Void => PrimType::X,
        Ty::Pointer(_) | Ty::Array(_, _) => PrimType::L,
    }
}

#[derive(Clone)]
struct Binding {
    addr: Value,
    ty: Ty,
}

struct LoopTargets {
    header: crate::ir::BlockId,
    exit: crate::ir::BlockId,
}

struct FunctionLowerer<'b, 'm> {
    b: &'b mut Builder<'m>,
    vars: HashMap<String, Binding>,
    loops: Vec<LoopTargets>,
    funcs: &'b HashMap<String, (Vec<Ty>, Ty)>,
}

impl<'b, 'm> FunctionLowerer<'b, 'm> {
    fn declare_local(&mut self, name: &str, ty: Ty) -> Binding {
        let addr = if matches!(ty, Ty::Array(_, _) | Ty::Pointer(_)) {
            self.b.create_alloc(true, ty.size().max(8) as i64)
        } else {
            self.b.create_alloc(false, 4)
        };
        let binding = Binding { addr, ty };
        self.vars.insert(name.to_string(), binding.clone());
        binding
    }

    fn cast(&mut self, value: Value, from: &Ty, to: &Ty) -> Value {
        if from == to {
            return value;
        }
        match (from, to) {
            (Ty::Int, Ty::Float) => self.b.create_swtof(value),
            (Ty::Float, Ty::Int) => self.b.create_stosi(value),
            _ => value,
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> (Value, Ty) {
        match expr {
            Expr::Int(n, _) => (self.b.context_mut().intern_int(*n as i32), Ty::Int),
            Expr::Float(f, _) => (self.b.context_mut().intern_float(*f as f32), Ty::Float),
            Expr::Ident(name, _) => match self.vars.get(name).cloned() {
                Some(binding) => {
                    if matches!(binding.ty, Ty::Array(_, _)) {
                        // Arrays have no indexing expression in this grammar;
                        // referencing one yields its address, untyped use.
                        (binding.addr, binding.ty)
                    } else {
                        let prim = to_prim(&binding.ty);
                        (self.b.create_load(prim, binding.addr), binding.ty)
                    }
                }
                None => (self.b.context_mut().intern_int(0), Ty::Int),
            },
            Expr::Neg(inner, _) => {
                let (v, ty) = self.lower_expr(inner);
                (self.b.create_neg(to_prim(&ty), v), ty)
            }
            Expr::Binary(op, lhs, rhs, _) => self.lower_binary(*op, lhs, rhs),
            Expr::Call(name, args, _) => self.lower_call(name, args),
        }
    }

    fn lower_binary(&mut self, op: BinOp, lhs: &Expr, rhs: &Expr) -> (Value, Ty) {
        let (lv, lt) = self.lower_expr(lhs);
        let (rv, rt) = self.lower_expr(rhs);
        let common = if lt == Ty::Float || rt == Ty::Float { Ty::Float } else { Ty::Int };
        let lv = self.cast(lv, &lt, &common);
        let rv = self.cast(rv, &rt, &common);
        let prim = to_prim(&common);

        let is_float = common == Ty::Float;
        let value = match op {
            BinOp::Add => self.b.create_add(prim, lv, rv),
            BinOp::Sub => self.b.create_sub(prim, lv, rv),
            BinOp::Mul => self.b.create_mul(prim, lv, rv),
            BinOp::Div => self.b.create_div(prim, lv, rv),
            // `rem` is int-only; a float `%` has already been flagged by
            // sema as a type mismatch, so this is unreachable on checked
            // input and a best-effort fallback otherwise.
            BinOp::Rem => {
                if is_float {
                    self.b.create_div(prim, lv, rv)
                } else {
                    self.b.create_rem(prim, lv, rv)
                }
            }
            BinOp::Eq => {
                if is_float {
                    self.b.create_ceqs(lv, rv)
                } else {
                    self.b.create_ceqw(lv, rv)
                }
            }
            BinOp::Ne => {
                if is_float {
                    self.b.create_cnes(lv, rv)
                } else {
                    self.b.create_cnew(lv, rv)
                }
            }
            BinOp::Lt => {
                if is_float {
                    self.b.create_clts(lv, rv)
                } else {
                    self.b.create_csltw(lv, rv)
                }
            }
            BinOp::Le => {
                if is_float {
                    self.b.create_cles(lv, rv)
                } else {
                    self.b.create_cslew(lv, rv)
                }
            }
            BinOp::Gt => {
                if is_float {
                    self.b.create_cgts(lv, rv)
                } else {
                    self.b.create_csgtw(lv, rv)
                }
            }
            BinOp::Ge => {
                if is_float {
                    self.b.create_cges(lv, rv)
                } else {
                    self.b.create_csgew(lv, rv)
                }
            }
        };
        let result_ty = match op {
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Ty::Int,
            _ => common,
        };
        (value, result_ty)
    }

    fn lower_call(&mut self, name: &str, args: &[Expr]) -> (Value, Ty) {
        let Some((param_tys, ret_ty)) = self.funcs.get(name).cloned() else {
            return (self.b.context_mut().intern_int(0), Ty::Int);
        };
        let mut lowered = Vec::with_capacity(args.len());
        for (arg, expected) in args.iter().zip(param_tys.iter()) {
            let (v, at) = self.lower_expr(arg);
            lowered.push(self.cast(v, &at, expected));
        }
        for (v, ty) in lowered.into_iter().zip(param_tys.iter()) {
            self.b.create_arg(to_prim(ty), v);
        }
        let callee = self.b.context_mut().intern_global(name);
        match self.b.create_call(to_prim(&ret_ty), callee) {
            Some(v) => (v, ret_ty),
            None => (self.b.context_mut().intern_int(0), Ty::Void),
        }
    }

    fn lower_stmts(&mut self, stmts: &[Stmt], ret_ty: &Ty) {
        for stmt in stmts {
            self.lower_stmt(stmt, ret_ty);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt, ret_ty: &Ty) {
        match stmt {
            Stmt::Let { name, ty, init, .. } => {
                let declared = to_ty(ty);
                let binding = self.declare_local(name, declared.clone());
                if let Some(init) = init {
                    let (v, vt) = self.lower_expr(init);
                    let v = self.cast(v, &vt, &declared);
                    self.b.create_store(to_prim(&declared), v, binding.addr);
                }
            }
            Stmt::Assign { name, value, .. } => {
                let Some(binding) = self.vars.get(name).cloned() else { return };
                let (v, vt) = self.lower_expr(value);
                let v = self.cast(v, &vt, &binding.ty);
                self.b.create_store(to_prim(&binding.ty), v, binding.addr);
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                let (cv, _) = self.lower_expr(cond);
                let then_blk = self.b.create_label("then");
                let else_blk = self.b.create_label("else");
                let merge_blk = self.b.create_label("merge");
                self.b.create_jnz(cv, then_blk, else_blk);

                self.b.set_insert_block(then_blk);
                self.lower_stmts(then_branch, ret_ty);
                self.b.create_jmp(merge_blk);

                self.b.set_insert_block(else_blk);
                self.lower_stmts(else_branch, ret_ty);
                self.b.create_jmp(merge_blk);

                self.b.set_insert_block(merge_blk);
            }
            Stmt::While { cond, body, .. } => {
                let header = self.b.create_label("loop.header");
                let body_blk = self.b.create_label("loop.body");
                let exit = self.b.create_label("loop.exit");
                self.b.create_jmp(header);

                self.b.set_insert_block(header);
                let (cv, _) = self.lower_expr(cond);
                self.b.create_jnz(cv, body_blk, exit);

                self.b.set_insert_block(body_blk);
                self.loops.push(LoopTargets { header, exit });
                self.lower_stmts(body, ret_ty);
                self.loops.pop();
                self.b.create_jmp(header);

                self.b.set_insert_block(exit);
            }
            Stmt::Return { value, .. } => {
                let value = value.as_ref().map(|e| {
                    let (v, vt) = self.lower_expr(e);
                    self.cast(v, &vt, ret_ty)
                });
                self.b.create_ret(value);
            }
            Stmt::Break(_) => {
                if let Some(target) = self.loops.last() {
                    self.b.create_jmp(target.exit);
                }
            }
            Stmt::Continue(_) => {
                if let Some(target) = self.loops.last() {
                    self.b.create_jmp(target.header);
                }
            }
            Stmt::Expr(e) => {
                self.lower_expr(e);
            }
        }
    }
}

/// Lower every function in `program` into `module`'s builder. Runs
/// regardless of sema taint: a malformed program still gets a best-effort
/// IR so the caller can report diagnostics without aborting mid-pass.
pub fn lower(program: &Program, module: &mut Module, ctx: Context) -> Context {
    let mut errors = Vec::new();
    let funcs = function_signatures(program, &mut errors);
    let mut b = Builder::new(module, ctx);

    for decl in &program.functions {
        lower_function(&mut b, decl, &funcs);
    }
    b.into_context()
}

fn lower_function(b: &mut Builder, decl: &FunctionDecl, funcs: &HashMap<String, (Vec<Ty>, Ty)>) {
    let ret_ty = to_ty(&decl.ret_ty);
    b.create_function(true, decl.name.clone(), to_prim(&ret_ty));

    let mut lowerer = FunctionLowerer { b, vars: HashMap::new(), loops: Vec::new(), funcs };
    for param in &decl.params {
        let pty = to_ty(&param.ty);
        let prim = to_prim(&pty);
        let value = lowerer.b.create_par(prim);
        let binding = lowerer.declare_local(&param.name, pty.clone());
        lowerer.b.create_store(prim, value, binding.addr);
    }
    lowerer.lower_stmts(&decl.body, &ret_ty);

    if ret_ty == Ty::Void {
        lowerer.b.create_ret(None);
    } else {
        let zero = lowerer.b.context_mut().intern_int(0);
        lowerer.b.create_ret(Some(zero));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::parse;

    fn lower_source(src: &str) -> Module {
        let (program, errors) = parse(src);
        assert!(errors.is_empty(), "{errors:?}");
        let mut module = Module::new();
        lower(&program, &mut module, Context::new());
        module
    }

    #[test]
    fn straight_line_function_lowers_to_allocs_and_loads() {
        let module = lower_source("fn add(a: int, b: int) -> int { let r: int = a + b; return r; }");
        let f = &module.functions[0];
        let entry = f.start;
        let allocs = f.block(entry).insts.iter().filter(|&&id| f.inst(id).opcode.is_alloc()).count();
        // two params + one local, each gets its own stack slot.
        assert_eq!(allocs, 3);
    }

    #[test]
    fn if_else_produces_three_extra_blocks() {
        let module = lower_source(
            "fn max(a: int, b: int) -> int {\n\
             if (a > b) { return a; } else { return b; }\n\
             }",
        );
        let f = &module.functions[0];
        assert_eq!(f.blocks.len(), 4); // entry + then + else + merge
    }

    #[test]
    fn while_loop_has_a_back_edge_to_its_header() {
        let module = lower_source(
            "fn count(n: int) -> int {\n\
             let i: int = 0;\n\
             while (i < n) { i = i + 1; }\n\
             return i;\n\
             }",
        );
        let f = &module.functions[0];
        let header = f.blocks_in_order().into_iter().find(|&b| f.block(b).name == "loop.header").unwrap();
        let body = f.blocks_in_order().into_iter().find(|&b| f.block(b).name == "loop.body").unwrap();
        assert_eq!(f.block(body).term, crate::ir::Terminator::Jump { target: header });
    }

    #[test]
    fn void_function_returns_none() {
        let module = lower_source("fn f() -> void { let x: int = 1; }");
        let f = &module.functions[0];
        let last = f.blocks_in_order().pop().unwrap();
        assert_eq!(f.block(last).term, crate::ir::Terminator::Return { value: None });
    }
}
