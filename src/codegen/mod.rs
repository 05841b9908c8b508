//! A minimal code generator: walks post-allocation IR and renders each
//! instruction's operands through a [`regalloc::Allocation`] instead of
//! emitting target assembly.
//!
//! Instruction selection, peephole scheduling, and real RISC-V emission
//! are out of scope for this mid-end (see the crate's non-goals); this
//! module exists so the pipeline has a concrete consumer of
//! [`crate::regalloc::Allocation`] to drive end-to-end in tests.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ir::{Context, Function, Module, TempId, Value};
use crate::regalloc::{Allocation, Assignment, Reg};

fn render_operand(out: &mut String, ctx: &Context, alloc: &Allocation, v: Value) {
    match v {
        Value::Temp(t) => render_temp(out, alloc, t),
        Value::Const(_) => {
            if let Some(i) = ctx.as_int(v) {
                let _ = write!(out, "{i}");
            } else if let Some(f) = ctx.as_float(v) {
                let _ = write!(out, "{f}");
            }
        }
        Value::Global(h) => {
            let _ = write!(out, "${}", ctx.global_name(h));
        }
    }
}

fn render_temp(out: &mut String, alloc: &Allocation, t: TempId) {
    match alloc.get(t) {
        Some(Assignment::Register(Reg { kind, index })) => {
            let _ = write!(out, "%t{}[{:?}{}]", t.0, kind, index);
        }
        Some(Assignment::Spill) => {
            let _ = write!(out, "%t{}[spill]", t.0);
        }
        None => {
            let _ = write!(out, "%t{}[?]", t.0);
        }
    }
}

/// Render one function's instructions, one per line, with every temp
/// annotated by its allocation decision. `phis` are expected empty — this
/// must run after [`crate::ssadestruct::destruct_ssa`].
pub fn emit_function(func: &Function, ctx: &Context, alloc: &Allocation) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "function ${} {{", func.name);
    for b in func.blocks_in_order() {
        let block = func.block(b);
        debug_assert!(block.phis.is_empty(), "codegen requires SSA to already be destructed");
        let _ = writeln!(out, "@{}", block.display_name());
        for &id in &block.insts {
            let inst = func.inst(id);
            out.push_str("  ");
            if let Some(dst) = inst.dst {
                render_temp(&mut out, alloc, dst);
                out.push_str(" = ");
            }
            out.push_str(inst.opcode.wire_tag());
            for arg in inst.args.iter().flatten() {
                out.push(' ');
                render_operand(&mut out, ctx, alloc, *arg);
            }
            out.push('\n');
        }
        let _ = writeln!(out, "  {}", render_terminator(&block.term, ctx, alloc));
    }
    out.push_str("}\n");
    out
}

fn render_terminator(term: &crate::ir::Terminator, ctx: &Context, alloc: &Allocation) -> String {
    use crate::ir::Terminator;
    match term {
        Terminator::Jump { target } => format!("jmp @{}", target.0),
        Terminator::CondJump { cond, if_true, if_false } => {
            let mut c = String::new();
            render_operand(&mut c, ctx, alloc, *cond);
            format!("jnz {c}, @{}, @{}", if_true.0, if_false.0)
        }
        Terminator::Return { value } => match value {
            Some(v) => {
                let mut s = String::new();
                render_operand(&mut s, ctx, alloc, *v);
                format!("ret {s}")
            }
            None => "ret".to_string(),
        },
        Terminator::FallThrough => "<unterminated>".to_string(),
    }
}

/// Render every function in `module`, looking up each one's allocation by
/// name in `allocations`.
pub fn emit_module(module: &Module, ctx: &Context, allocations: &HashMap<String, Allocation>) -> String {
    let mut out = String::new();
    for func in &module.functions {
        let Some(alloc) = allocations.get(&func.name) else { continue };
        out.push_str(&emit_function(func, ctx, alloc));
        out.push('\n');
    }
    out
}
