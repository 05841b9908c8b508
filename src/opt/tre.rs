//! Tail-recursion elimination (§4.7): a block whose last instruction is a
//! self-`call` immediately followed by a `return` of that call's result
//! (or a void return) becomes a jump back to a loop-target block, with
//! the call's arguments copied into the parameter temporaries first.

use crate::ir::{Block, BlockId, Context, Function, InstId, Instruction, Module, Opcode, TempId, Terminator, Value};

fn tail_call_sites(func: &Function, ctx: &Context) -> Vec<(BlockId, InstId)> {
    let mut out = Vec::new();
    for b in func.blocks_in_order() {
        let Some(&last) = func.block(b).insts.last() else { continue };
        let inst = func.inst(last);
        if inst.opcode != Opcode::Call {
            continue;
        }
        let Some(Value::Global(h)) = inst.args[0] else { continue };
        if ctx.global_name(h) != func.name {
            continue;
        }
        let is_tail_return = match &func.block(b).term {
            Terminator::Return { value: None } => inst.dst.is_none(),
            Terminator::Return { value: Some(Value::Temp(t)) } => inst.dst == Some(*t),
            _ => false,
        };
        if is_tail_return {
            out.push((b, last));
        }
    }
    out
}

fn apply(module: &mut Module, idx: usize, sites: Vec<(BlockId, InstId)>) {
    let loop_target = module.fresh_block_id();
    let func = &mut module.functions[idx];
    let entry = func.start;

    let param_temps: Vec<TempId> = func
        .block(entry)
        .insts
        .iter()
        .filter(|&&id| func.inst(id).opcode == Opcode::Par)
        .map(|&id| func.inst(id).dst.unwrap())
        .collect();

    let (kept, moved): (Vec<InstId>, Vec<InstId>) = func
        .block(entry)
        .insts
        .clone()
        .into_iter()
        .partition(|&id| {
            let op = func.inst(id).opcode;
            op == Opcode::Par || op.is_alloc()
        });

    let mut lt_block = Block::new(loop_target, "tre.loop");
    lt_block.insts = moved;
    lt_block.term = func.block(entry).term.clone();
    func.block_mut(entry).insts = kept;
    func.block_mut(entry).term = Terminator::Jump { target: loop_target };
    func.insert_block_after(entry, lt_block);

    for (old_b, call_inst) in sites {
        let real_b = if old_b == entry { loop_target } else { old_b };
        let pos = func.block(real_b).insts.iter().position(|&i| i == call_inst).unwrap();
        let (arg_values, arg_count) = super::contiguous_args(func, real_b, pos);

        let mut new_tail = Vec::new();
        for (&param, &value) in param_temps.iter().zip(arg_values.iter()) {
            let ty = func.temp_ty(param);
            let cp_id = func.alloc_inst_id();
            func.insts.insert(cp_id, Instruction::unary(Opcode::Copy, ty, Some(param), value));
            new_tail.push(cp_id);
        }

        let mut insts = func.block(real_b).insts.clone();
        insts.splice(pos - arg_count..=pos, new_tail);
        func.block_mut(real_b).insts = insts;
        func.block_mut(real_b).term = Terminator::Jump { target: loop_target };
    }
}

/// Eliminate every tail-recursive self-call in every function of
/// `module`. Returns whether anything changed.
pub fn run(module: &mut Module, ctx: &Context) -> bool {
    let mut changed = false;
    for idx in 0..module.functions.len() {
        let sites = tail_call_sites(&module.functions[idx], ctx);
        if sites.is_empty() {
            continue;
        }
        apply(module, idx, sites);
        changed = true;
    }
    changed
}
