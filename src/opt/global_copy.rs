//! Global copy propagation (§4.4): for every temp whose sole definition
//! is `copy x`, chase the chain to its final source and rewrite every
//! use — instruction operand, phi argument, terminator argument —
//! function-wide (unlike [`super::local_prop`], this crosses block
//! boundaries).

use std::collections::HashMap;

use crate::ir::{Function, Opcode, TempId, Terminator, Value};

fn copy_source(func: &Function, t: TempId) -> Option<Value> {
    let meta = func.temps.get(&t)?;
    let [def] = meta.defs.as_slice() else { return None };
    let crate::ir::Def::InstDef { inst } = def else { return None };
    let inst = func.inst(*inst);
    (inst.opcode == Opcode::Copy).then(|| inst.args[0]).flatten()
}

fn chase(func: &Function, cache: &mut HashMap<TempId, Value>, mut v: Value) -> Value {
    let mut seen = std::collections::HashSet::new();
    while let Value::Temp(t) = v {
        if let Some(cached) = cache.get(&t) {
            v = *cached;
            continue;
        }
        if !seen.insert(t) {
            break;
        }
        match copy_source(func, t) {
            Some(src) => v = src,
            None => break,
        }
    }
    cache.insert(
        match v {
            Value::Temp(t) => t,
            _ => return v,
        },
        v,
    );
    v
}

/// Rewrite every operand in the function to the final source of its copy
/// chain. Returns whether anything changed.
pub fn run(func: &mut Function) -> bool {
    let mut changed = false;
    let mut cache: HashMap<TempId, Value> = HashMap::new();

    for block_id in func.blocks_in_order() {
        let phi_ids = func.block(block_id).phis.clone();
        for phi_id in phi_ids {
            let mut args = func.phi(phi_id).args.clone();
            for (_, v) in args.iter_mut() {
                let rewritten = chase(func, &mut cache, *v);
                if rewritten != *v {
                    *v = rewritten;
                    changed = true;
                }
            }
            func.phi_mut(phi_id).args = args;
        }

        let inst_ids = func.block(block_id).insts.clone();
        for inst_id in inst_ids {
            let mut args = func.inst(inst_id).args;
            for arg in args.iter_mut() {
                if let Some(v) = arg {
                    let rewritten = chase(func, &mut cache, *v);
                    if rewritten != *v {
                        *v = rewritten;
                        changed = true;
                    }
                }
            }
            func.inst_mut(inst_id).args = args;
        }

        let term = func.block(block_id).term.clone();
        let new_term = match term {
            Terminator::CondJump {
                cond,
                if_true,
                if_false,
            } => {
                let c = chase(func, &mut cache, cond);
                if c != cond {
                    changed = true;
                }
                Terminator::CondJump {
                    cond: c,
                    if_true,
                    if_false,
                }
            }
            Terminator::Return { value: Some(v) } => {
                let r = chase(func, &mut cache, v);
                if r != v {
                    changed = true;
                }
                Terminator::Return { value: Some(r) }
            }
            other => other,
        };
        func.block_mut(block_id).term = new_term;
    }
    changed
}
