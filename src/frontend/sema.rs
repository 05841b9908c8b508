//! Symbol/type checking over the parsed AST (§7's front-end error
//! taxonomy: undefined symbol, type mismatch, non-constant in constant
//! context, non-integer array size, redefinition, break/continue outside
//! a loop). Errors are collected, not fatal — see [`crate::FrontendError`].

use std::collections::HashMap;

use crate::error::FrontendError;
use crate::types::Ty;

use super::ast::{BinOp, Expr, FunctionDecl, Program, Stmt, TypeExpr};

pub struct SemaResult {
    pub tainted: bool,
    pub errors: Vec<FrontendError>,
}

fn lower_type(ty: &TypeExpr, line: u32, errors: &mut Vec<FrontendError>) -> Ty {
    match ty {
        TypeExpr::Int => Ty::Int,
        TypeExpr::Float => Ty::Float,
        TypeExpr::Void => Ty::Void,
        TypeExpr::Array(elem, size) => {
            let elem_ty = lower_type(elem, line, errors);
            match size {
                Some(n) if *n >= 0 => Ty::Array(Box::new(elem_ty), *n as usize),
                _ => {
                    errors.push(FrontendError::new(line, "array size must be a non-negative integer literal"));
                    Ty::Array(Box::new(elem_ty), 0)
                }
            }
        }
    }
}

struct Scope {
    vars: Vec<HashMap<String, Ty>>,
    loop_depth: u32,
}

impl Scope {
    fn new() -> Self {
        Self { vars: vec![HashMap::new()], loop_depth: 0 }
    }

    fn push(&mut self) {
        self.vars.push(HashMap::new());
    }

    fn pop(&mut self) {
        self.vars.pop();
    }

    fn declare(&mut self, name: &str, ty: Ty) -> bool {
        let top = self.vars.last_mut().expect("scope stack is never empty");
        if top.contains_key(name) {
            return false;
        }
        top.insert(name.to_string(), ty);
        true
    }

    fn lookup(&self, name: &str) -> Option<&Ty> {
        self.vars.iter().rev().find_map(|frame| frame.get(name))
    }
}

fn check_expr(expr: &Expr, scope: &Scope, funcs: &HashMap<String, (Vec<Ty>, Ty)>, errors: &mut Vec<FrontendError>) -> Ty {
    match expr {
        Expr::Int(_, _) => Ty::Int,
        Expr::Float(_, _) => Ty::Float,
        Expr::Ident(name, line) => match scope.lookup(name) {
            Some(ty) => ty.clone(),
            None => {
                errors.push(FrontendError::new(*line, format!("undefined symbol '{name}'")));
                Ty::Int
            }
        },
        Expr::Neg(inner, line) => {
            let ty = check_expr(inner, scope, funcs, errors);
            if !ty.is_scalar() {
                errors.push(FrontendError::new(*line, "type mismatch: '-' requires a scalar operand"));
            }
            ty
        }
        Expr::Binary(op, lhs, rhs, line) => {
            let lt = check_expr(lhs, scope, funcs, errors);
            let rt = check_expr(rhs, scope, funcs, errors);
            if !lt.is_scalar() || !rt.is_scalar() {
                errors.push(FrontendError::new(*line, "type mismatch: operands must be int or float"));
                return Ty::Int;
            }
            if lt != rt && !lt.implicitly_castable_to(&rt) {
                errors.push(FrontendError::new(*line, format!("type mismatch: '{lt}' and '{rt}'")));
            }
            match op {
                BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Ty::Int,
                _ => {
                    if lt == Ty::Float || rt == Ty::Float {
                        Ty::Float
                    } else {
                        Ty::Int
                    }
                }
            }
        }
        Expr::Call(name, args, line) => match funcs.get(name) {
            Some((params, ret)) => {
                if params.len() != args.len() {
                    errors.push(FrontendError::new(*line, format!("'{name}' expects {} argument(s), got {}", params.len(), args.len())));
                }
                for (arg, expected) in args.iter().zip(params.iter()) {
                    let at = check_expr(arg, scope, funcs, errors);
                    if at != *expected && !at.implicitly_castable_to(expected) {
                        errors.push(FrontendError::new(arg.line(), format!("type mismatch: expected '{expected}', found '{at}'")));
                    }
                }
                ret.clone()
            }
            None => {
                errors.push(FrontendError::new(*line, format!("undefined symbol '{name}'")));
                Ty::Int
            }
        },
    }
}

fn check_stmts(stmts: &[Stmt], scope: &mut Scope, ret_ty: &Ty, funcs: &HashMap<String, (Vec<Ty>, Ty)>, errors: &mut Vec<FrontendError>) {
    scope.push();
    for stmt in stmts {
        match stmt {
            Stmt::Let { name, ty, init, line } => {
                let declared = lower_type(ty, *line, errors);
                if let Some(init) = init {
                    let it = check_expr(init, scope, funcs, errors);
                    if it != declared && !it.implicitly_castable_to(&declared) {
                        errors.push(FrontendError::new(*line, format!("type mismatch: expected '{declared}', found '{it}'")));
                    }
                }
                if !scope.declare(name, declared) {
                    errors.push(FrontendError::new(*line, format!("redefinition of '{name}'")));
                }
            }
            Stmt::Assign { name, value, line } => {
                let vt = check_expr(value, scope, funcs, errors);
                match scope.lookup(name).cloned() {
                    Some(declared) => {
                        if vt != declared && !vt.implicitly_castable_to(&declared) {
                            errors.push(FrontendError::new(*line, format!("type mismatch: expected '{declared}', found '{vt}'")));
                        }
                    }
                    None => errors.push(FrontendError::new(*line, format!("undefined symbol '{name}'"))),
                }
            }
            Stmt::If { cond, then_branch, else_branch, line } => {
                let ct = check_expr(cond, scope, funcs, errors);
                if !ct.is_scalar() {
                    errors.push(FrontendError::new(*line, "type mismatch: condition must be int or float"));
                }
                check_stmts(then_branch, scope, ret_ty, funcs, errors);
                check_stmts(else_branch, scope, ret_ty, funcs, errors);
            }
            Stmt::While { cond, body, line } => {
                let ct = check_expr(cond, scope, funcs, errors);
                if !ct.is_scalar() {
                    errors.push(FrontendError::new(*line, "type mismatch: condition must be int or float"));
                }
                scope.loop_depth += 1;
                check_stmts(body, scope, ret_ty, funcs, errors);
                scope.loop_depth -= 1;
            }
            Stmt::Return { value, line } => match (value, ret_ty) {
                (None, Ty::Void) => {}
                (None, _) => errors.push(FrontendError::new(*line, format!("type mismatch: expected '{ret_ty}', found 'void'"))),
                (Some(v), _) => {
                    let vt = check_expr(v, scope, funcs, errors);
                    if vt != *ret_ty && !vt.implicitly_castable_to(ret_ty) {
                        errors.push(FrontendError::new(*line, format!("type mismatch: expected '{ret_ty}', found '{vt}'")));
                    }
                }
            },
            Stmt::Break(line) => {
                if scope.loop_depth == 0 {
                    errors.push(FrontendError::new(*line, "'break' outside a loop"));
                }
            }
            Stmt::Continue(line) => {
                if scope.loop_depth == 0 {
                    errors.push(FrontendError::new(*line, "'continue' outside a loop"));
                }
            }
            Stmt::Expr(e) => {
                check_expr(e, scope, funcs, errors);
            }
        }
    }
    scope.pop();
}

fn check_function(decl: &FunctionDecl, funcs: &HashMap<String, (Vec<Ty>, Ty)>, errors: &mut Vec<FrontendError>) {
    let ret_ty = lower_type(&decl.ret_ty, decl.line, errors);
    let mut scope = Scope::new();
    for param in &decl.params {
        let pty = lower_type(&param.ty, decl.line, errors);
        if !scope.declare(&param.name, pty) {
            errors.push(FrontendError::new(decl.line, format!("redefinition of parameter '{}'", param.name)));
        }
    }
    check_stmts(&decl.body, &mut scope, &ret_ty, funcs, errors);
}

/// Build the name -> (param types, return type) table shared by `check`
/// and [`super::lower`] so both see the same signatures.
pub(crate) fn function_signatures(program: &Program, errors: &mut Vec<FrontendError>) -> HashMap<String, (Vec<Ty>, Ty)> {
    let mut funcs = HashMap::new();
    for decl in &program.functions {
        let ret = lower_type(&decl.ret_ty, decl.line, errors);
        let params = decl.params.iter().map(|p| lower_type(&p.ty, decl.line, errors)).collect();
        if funcs.insert(decl.name.clone(), (params, ret)).is_some() {
            errors.push(FrontendError::new(decl.line, format!("redefinition of function '{}'", decl.name)));
        }
    }
    funcs
}

/// Check every function in `program`, returning every diagnostic found and
/// whether the program is tainted (any error at all suppresses emission).
pub fn check(program: &Program) -> SemaResult {
    let mut errors = Vec::new();
    let funcs = function_signatures(program, &mut errors);
    for decl in &program.functions {
        check_function(decl, &funcs, &mut errors);
    }
    SemaResult { tainted: !errors.is_empty(), errors }
}
