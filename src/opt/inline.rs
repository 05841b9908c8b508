//! Function inlining (§4.7). Inlinability is computed once per module by
//! [`crate::analysis::compute_leaf_and_inline_flags`]; this pass rewrites
//! each call site to an inlinable callee by cloning the callee's body into
//! the caller.

use std::collections::HashMap;

use crate::ir::{Block, BlockId, Context, Function, InstId, Instruction, Module, Opcode, Phi, TempId, Terminator, Value};

fn remap(v: Value, temp_map: &HashMap<TempId, TempId>) -> Value {
    match v {
        Value::Temp(t) => Value::Temp(*temp_map.get(&t).unwrap_or(&t)),
        other => other,
    }
}

fn find_call(module: &Module, caller_idx: usize, ctx: &Context) -> Option<(BlockId, InstId, usize)> {
    let caller = &module.functions[caller_idx];
    for b in caller.blocks_in_order() {
        for &inst_id in &caller.block(b).insts {
            let inst = caller.inst(inst_id);
            if inst.opcode != Opcode::Call {
                continue;
            }
            let Some(Value::Global(h)) = inst.args[0] else { continue };
            let name = ctx.global_name(h);
            let Some(callee_idx) = module.functions.iter().position(|f| f.name == name) else { continue };
            if callee_idx == caller_idx || !module.functions[callee_idx].is_inlinable {
                continue;
            }
            return Some((b, inst_id, callee_idx));
        }
    }
    None
}

fn inline_at(module: &mut Module, caller_idx: usize, call_block: BlockId, call_inst: InstId, callee_idx: usize) {
    let callee = module.functions[callee_idx].clone();
    let callee_order = callee.blocks_in_order();

    let caller_dst = module.functions[caller_idx].inst(call_inst).dst;
    let call_pos = module.functions[caller_idx]
        .block(call_block)
        .insts
        .iter()
        .position(|&i| i == call_inst)
        .unwrap();
    let (arg_values, arg_count) = super::contiguous_args(&module.functions[caller_idx], call_block, call_pos);

    let par_order: Vec<InstId> = callee
        .block(callee.start)
        .insts
        .iter()
        .copied()
        .filter(|&id| callee.inst(id).opcode == Opcode::Par)
        .collect();

    let mut block_map: HashMap<BlockId, BlockId> = HashMap::new();
    for &old_b in &callee_order {
        block_map.insert(old_b, module.fresh_block_id());
    }
    let join_block = module.fresh_block_id();

    let caller = &mut module.functions[caller_idx];

    let mut temp_map: HashMap<TempId, TempId> = HashMap::new();
    for (&old_t, meta) in &callee.temps {
        temp_map.insert(old_t, caller.new_temp(meta.ty));
    }

    let mut return_edges: Vec<(BlockId, Value)> = Vec::new();
    let mut migrated_allocs: Vec<InstId> = Vec::new();
    let mut last_new_block = call_block;

    for &old_b in &callee_order {
        let new_b = block_map[&old_b];
        let old_block = callee.block(old_b);

        let mut new_insts = Vec::new();
        for &old_inst_id in &old_block.insts {
            let old_inst = callee.inst(old_inst_id);
            let new_dst = old_inst.dst.map(|t| temp_map[&t]);
            let (opcode, args) = if old_inst.opcode == Opcode::Par {
                let idx = par_order.iter().position(|&p| p == old_inst_id).unwrap();
                (Opcode::Copy, [arg_values.get(idx).copied(), None])
            } else {
                let mut a = old_inst.args;
                for v in a.iter_mut() {
                    if let Some(val) = v {
                        *val = remap(*val, &temp_map);
                    }
                }
                (old_inst.opcode, a)
            };
            let new_id = caller.alloc_inst_id();
            caller.insts.insert(
                new_id,
                Instruction {
                    opcode,
                    ty: old_inst.ty,
                    dst: new_dst,
                    args,
                    number: None,
                },
            );
            if opcode.is_alloc() {
                migrated_allocs.push(new_id);
            } else {
                new_insts.push(new_id);
            }
        }

        let new_phis: Vec<_> = old_block
            .phis
            .iter()
            .map(|&old_phi_id| {
                let old_phi = callee.phi(old_phi_id);
                let new_id = caller.alloc_phi_id();
                let new_args = old_phi
                    .args
                    .iter()
                    .map(|(b, v)| (block_map[b], remap(*v, &temp_map)))
                    .collect();
                caller.phis.insert(
                    new_id,
                    Phi {
                        ty: old_phi.ty,
                        dst: temp_map[&old_phi.dst],
                        args: new_args,
                    },
                );
                new_id
            })
            .collect();

        let new_term = match &old_block.term {
            Terminator::Return { value } => {
                if let Some(v) = value {
                    return_edges.push((new_b, remap(*v, &temp_map)));
                }
                Terminator::Jump { target: join_block }
            }
            Terminator::Jump { target } => Terminator::Jump { target: block_map[target] },
            Terminator::CondJump {
                cond,
                if_true,
                if_false,
            } => Terminator::CondJump {
                cond: remap(*cond, &temp_map),
                if_true: block_map[if_true],
                if_false: block_map[if_false],
            },
            Terminator::FallThrough => Terminator::Jump { target: join_block },
        };

        let mut block = Block::new(new_b, format!("inl.{}", old_block.name));
        block.phis = new_phis;
        block.insts = new_insts;
        block.term = new_term;
        caller.insert_block_after(last_new_block, block);
        last_new_block = new_b;
    }

    let mut join = Block::new(join_block, "inl.join");
    if let Some(dst) = caller_dst {
        if !return_edges.is_empty() {
            let phi_id = caller.alloc_phi_id();
            caller.phis.insert(
                phi_id,
                Phi {
                    ty: caller.temp_ty(dst),
                    dst,
                    args: return_edges,
                },
            );
            join.phis.push(phi_id);
        }
    }
    let after_call = caller.block(call_block).insts[call_pos + 1..].to_vec();
    join.insts = after_call;
    join.term = caller.block(call_block).term.clone();
    caller.insert_block_after(last_new_block, join);

    let callee_entry = block_map[&callee.start];
    let before_args = call_pos - arg_count;
    let kept: Vec<InstId> = caller.block(call_block).insts[..before_args].to_vec();
    caller.block_mut(call_block).insts = kept;
    caller.block_mut(call_block).term = Terminator::Jump { target: callee_entry };

    let entry = caller.start;
    for id in migrated_allocs {
        caller.block_mut(entry).insts.push(id);
    }
}

/// Inline every eligible call site, repeating per caller until none
/// remain (so a caller with several call sites is fully handled).
pub fn run(module: &mut Module, ctx: &Context) -> bool {
    let mut changed = false;
    for caller_idx in 0..module.functions.len() {
        while let Some((block_id, inst_id, callee_idx)) = find_call(module, caller_idx, ctx) {
            inline_at(module, caller_idx, block_id, inst_id, callee_idx);
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimType;

    fn callee_fn(ctx: &mut Context) -> Function {
        let mut f = Function::new(BlockId(0), false, "add_one", PrimType::W);
        let entry = f.start;
        let p = f.new_temp(PrimType::W);
        let pid = f.alloc_inst_id();
        f.insts.insert(pid, Instruction::nullary(Opcode::Par, PrimType::W, Some(p)));
        f.block_mut(entry).insts.push(pid);

        let one = ctx.intern_int(1);
        let r = f.new_temp(PrimType::W);
        let rid = f.alloc_inst_id();
        f.insts
            .insert(rid, Instruction::binary(Opcode::Add, PrimType::W, Some(r), Value::Temp(p), one));
        f.block_mut(entry).insts.push(rid);
        f.block_mut(entry).term = Terminator::Return { value: Some(Value::Temp(r)) };
        f.is_leaf = true;
        f.is_inlinable = true;
        f
    }

    #[test]
    fn call_site_is_replaced_by_cloned_callee_body() {
        let mut ctx = Context::new();
        let mut module = Module::new();
        module.functions.push(callee_fn(&mut ctx));

        let mut caller = Function::new(BlockId(100), false, "main", PrimType::W);
        let entry = caller.start;
        let five = ctx.intern_int(5);
        let callee_addr = ctx.intern_global("add_one");
        let Value::Global(gh) = callee_addr else { unreachable!() };

        let arg_id = caller.alloc_inst_id();
        caller
            .insts
            .insert(arg_id, Instruction::unary(Opcode::Arg, PrimType::W, None, five));
        caller.block_mut(entry).insts.push(arg_id);

        let dst = caller.new_temp(PrimType::W);
        let call_id = caller.alloc_inst_id();
        caller
            .insts
            .insert(call_id, Instruction::unary(Opcode::Call, PrimType::W, Some(dst), Value::Global(gh)));
        caller.block_mut(entry).insts.push(call_id);
        caller.block_mut(entry).term = Terminator::Return { value: Some(Value::Temp(dst)) };

        module.functions.push(caller);
        let changed = run(&mut module, &ctx);
        assert!(changed);

        let main = module.function("main").unwrap();
        assert!(matches!(main.block(main.start).term, Terminator::Jump { .. }));
        assert!(main.blocks_in_order().len() > 1);
    }
}
