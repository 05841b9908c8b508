//! A minimal front end for a small C-like language: lexer, recursive-
//! descent parser, a symbol/type checker, and a lowering pass onto
//! [`crate::ir::Builder`].
//!
//! This exists so the mid-end can be exercised end-to-end from source text
//! rather than only from hand-built IR; instruction selection, peephole
//! scheduling, and assembly emission stay out of scope (see [`crate::codegen`]
//! for the corresponding minimal stand-in on the output side).

pub mod ast;
pub mod lexer;
pub mod lower;
pub mod parser;
pub mod sema;

use crate::error::FrontendError;
use crate::ir::{Context, Module};

/// Everything `compile` produces: the IR (best-effort even when tainted),
/// the interning context it was built against, and every diagnostic from
/// parsing and checking.
pub struct CompiledUnit {
    pub module: Module,
    pub context: Context,
    pub tainted: bool,
    pub errors: Vec<FrontendError>,
}

/// Lex, parse, check, and lower `src`. Always returns IR — a tainted unit's
/// IR is best-effort and must not be handed to codegen; callers that need
/// that enforcement should use [`compile_or_report`] instead.
pub fn compile(src: &str) -> CompiledUnit {
    let (program, mut errors) = parser::parse(src);
    let sema_result = sema::check(&program);
    errors.extend(sema_result.errors);

    let mut module = Module::new();
    let context = lower::lower(&program, &mut module, Context::new());

    CompiledUnit {
        module,
        context,
        tainted: !errors.is_empty(),
        errors,
    }
}

/// Same as [`compile`], but aggregates diagnostics into a single `anyhow`
/// error when the unit is tainted, the way a driver's top-level entry
/// point reports a failed compilation to its caller.
pub fn compile_or_report(src: &str) -> anyhow::Result<CompiledUnit> {
    let unit = compile(src);
    if unit.tainted {
        let detail = unit.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("\n");
        anyhow::bail!("compilation failed:\n{detail}");
    }
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_source_compiles_untainted() {
        let unit = compile("fn add(a: int, b: int) -> int { return a + b; }");
        assert!(!unit.tainted, "{:?}", unit.errors);
        assert_eq!(unit.module.functions.len(), 1);
    }

    #[test]
    fn undefined_symbol_taints_but_still_lowers() {
        let unit = compile("fn f() -> int { return y; }");
        assert!(unit.tainted);
        assert_eq!(unit.module.functions.len(), 1);
    }

    #[test]
    fn compile_or_report_bails_on_tainted_input() {
        let result = compile_or_report("fn f() -> int { return y; }");
        assert!(result.is_err());
    }

    #[test]
    fn compile_or_report_succeeds_on_clean_input() {
        let result = compile_or_report("fn f() -> int { return 0; }");
        assert!(result.is_ok());
    }
}
