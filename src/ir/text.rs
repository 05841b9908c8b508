//! Textual IR writer, mirroring QBE's surface syntax (§6).
//!
//! This is the crate's primary debugging and golden-test format: every
//! data definition, function, block, phi, instruction, and terminator has
//! a canonical one-line rendering.

use std::fmt::Write as _;

use super::func::Function;
use super::instr::{Phi, Terminator};
use super::module::{Data, DataItem, Module};
use super::value::{Context, GlobalHandle, Value};
use super::{BlockId, TempId};

fn write_value(out: &mut String, ctx: &Context, v: Value) {
    match v {
        Value::Temp(TempId(n)) => {
            let _ = write!(out, "%t{n}");
        }
        Value::Const(_) => {
            if let Some(i) = ctx.as_int(v) {
                let _ = write!(out, "{i}");
            } else if let Some(f) = ctx.as_float(v) {
                let _ = write!(out, "{f}");
            }
        }
        Value::Global(h) => {
            let _ = write!(out, "${}", global_name(ctx, h));
        }
    }
}

fn global_name(ctx: &Context, h: GlobalHandle) -> &str {
    ctx.global_name(h)
}

fn block_ref(func: &Function, id: BlockId) -> String {
    format!("@{}", func.block(id).display_name())
}

/// Render one data definition: `[export\n]data $name = align N { items }`.
pub fn write_data(out: &mut String, data: &Data) {
    if data.export {
        out.push_str("export\n");
    }
    let _ = write!(out, "data ${} = align {} {{ ", data.name, data.align);
    let mut first = true;
    for item in &data.items {
        if !first {
            out.push_str(", ");
        }
        first = false;
        match item {
            DataItem::Const { ty, bits } => {
                let _ = write!(out, "{ty} {bits}");
            }
            DataItem::Zero(n) => {
                let _ = write!(out, "z {n}");
            }
        }
    }
    out.push_str(" }\n");
}

/// Render one function, including its blocks in source order.
pub fn write_function(out: &mut String, ctx: &Context, func: &Function) {
    if func.export {
        out.push_str("export\n");
    }
    let _ = write!(out, "function {} ${}(", func.ret_ty, func.name);
    for (i, ty) in func.param_tys.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{ty}");
    }
    out.push_str(") {\n");
    for id in func.blocks_in_order() {
        write_block(out, ctx, func, id);
    }
    out.push_str("}\n");
}

fn write_block(out: &mut String, ctx: &Context, func: &Function, id: BlockId) {
    let block = func.block(id);
    let _ = writeln!(out, "{}:", block_ref(func, id));
    for phi_id in &block.phis {
        write_phi(out, ctx, func, *phi_id);
    }
    for inst_id in &block.insts {
        write_inst(out, ctx, func, *inst_id);
    }
    write_terminator(out, ctx, func, &block.term);
}

fn write_phi(out: &mut String, ctx: &Context, func: &Function, phi_id: super::PhiId) {
    let phi: &Phi = func.phi(phi_id);
    let _ = write!(out, "\t%t{} ={} phi ", phi.dst.0, phi.ty);
    for (i, (pred, v)) in phi.args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} ", block_ref(func, *pred));
        write_value(out, ctx, *v);
    }
    out.push('\n');
}

fn write_inst(out: &mut String, ctx: &Context, func: &Function, inst_id: super::InstId) {
    let inst = func.inst(inst_id);
    out.push('\t');
    if let Some(dst) = inst.dst {
        let _ = write!(out, "%t{} ={} ", dst.0, inst.ty);
    }
    out.push_str(inst.opcode.wire_tag());
    let mut first = true;
    for arg in inst.operands() {
        out.push(if first { ' ' } else { ',' });
        if !first {
            out.push(' ');
        }
        first = false;
        write_value(out, ctx, arg);
    }
    out.push('\n');
}

fn write_terminator(out: &mut String, ctx: &Context, func: &Function, term: &Terminator) {
    match term {
        Terminator::FallThrough => {}
        Terminator::Jump { target } => {
            let _ = writeln!(out, "\tjmp {}", block_ref(func, *target));
        }
        Terminator::CondJump {
            cond,
            if_true,
            if_false,
        } => {
            out.push_str("\tjnz ");
            write_value(out, ctx, *cond);
            let _ = writeln!(
                out,
                ", {}, {}",
                block_ref(func, *if_true),
                block_ref(func, *if_false)
            );
        }
        Terminator::Return { value } => {
            out.push_str("\tret");
            if let Some(v) = value {
                out.push(' ');
                write_value(out, ctx, *v);
            }
            out.push('\n');
        }
    }
}

/// Render an entire module: all data definitions, then all functions.
pub fn write_module(ctx: &Context, module: &Module) -> String {
    let mut out = String::new();
    for data in &module.datas {
        write_data(&mut out, data);
    }
    for func in &module.functions {
        write_function(&mut out, ctx, func);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::builder::Builder;
    use crate::ir::value::PrimType;

    #[test]
    fn renders_a_minimal_function() {
        let mut module = Module::new();
        let ctx = Context::new();
        let mut b = Builder::new(&mut module, ctx);
        b.create_function(true, "main", PrimType::W);
        let zero = b.context_mut().intern_int(0);
        b.create_ret(Some(zero));
        let ctx = b.into_context();
        let text = write_module(&ctx, &module);
        assert!(text.contains("export\n"));
        assert!(text.contains("function w $main() {"));
        assert!(text.contains("@start:"));
        assert!(text.contains("ret 0"));
    }

    #[test]
    fn renders_data_with_zero_fill() {
        let mut module = Module::new();
        module.add_data(Data {
            name: "buf".into(),
            align: 8,
            export: false,
            items: vec![DataItem::Zero(16)],
        });
        let ctx = Context::new();
        let text = write_module(&ctx, &module);
        assert_eq!(text, "data $buf = align 8 { z 16 }\n");
    }
}
