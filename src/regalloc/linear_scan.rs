//! Linear-scan allocation (§4.9), four stages: classify global/local,
//! pre-allocate argument registers, sweep globals onto S/FS, then sweep
//! each block's locals onto T/FT.

use std::collections::HashMap;

use crate::analysis::{compute_live_intervals, LiveInterval};
use crate::error::{Fatal, Result};
use crate::ir::{BlockId, Def, Function, Opcode, TempId, Value};

use super::banks::{Reg, RegKind, RegisterBanks};

/// The outcome of allocating one temporary: a physical register, or a
/// spill (the backend will give it a stack slot).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Register(Reg),
    Spill,
}

/// The full per-function result: one assignment per temporary that has
/// at least one def or use.
#[derive(Debug, Clone, Default)]
pub struct Allocation {
    pub assignments: HashMap<TempId, Assignment>,
}

impl Allocation {
    pub fn get(&self, t: TempId) -> Option<Assignment> {
        self.assignments.get(&t).copied()
    }
}

fn is_global(func: &Function, t: TempId) -> bool {
    func.blocks_in_order()
        .into_iter()
        .any(|b| func.block(b).live_in.contains(&t) || func.block(b).live_out.contains(&t))
}

fn trivially_single_use(func: &Function, t: TempId) -> bool {
    func.temps.get(&t).map(|m| m.uses.len() == 1).unwrap_or(false)
}

fn entry_params(func: &Function) -> Vec<TempId> {
    func.block(func.start)
        .insts
        .iter()
        .filter(|&&id| func.inst(id).opcode == Opcode::Par)
        .filter_map(|&id| func.inst(id).dst)
        .collect()
}

fn call_sites(func: &Function) -> Vec<(BlockId, usize)> {
    let mut out = Vec::new();
    for b in func.blocks_in_order() {
        for (pos, &id) in func.block(b).insts.iter().enumerate() {
            if func.inst(id).opcode == Opcode::Call {
                out.push((b, pos));
            }
        }
    }
    out
}

/// Stage 2: pre-allocate A/FA registers for entry parameters and for call
/// arguments, skipping anything global or whose single use isn't trivial.
fn preallocate_args(func: &Function, banks: &RegisterBanks, out: &mut HashMap<TempId, Assignment>) {
    let mut try_assign = |t: TempId, idx: &mut u8, kind: RegKind, out: &mut HashMap<TempId, Assignment>| {
        if out.contains_key(&t) || is_global(func, t) || !trivially_single_use(func, t) {
            return;
        }
        if *idx >= banks.capacity(kind) {
            return;
        }
        out.insert(t, Assignment::Register(Reg { kind, index: *idx }));
        *idx += 1;
    };

    let mut int_idx = 0u8;
    let mut float_idx = 0u8;
    for p in entry_params(func) {
        let kind = RegKind::arg_kind(func.temp_ty(p).is_float());
        let idx = if kind == RegKind::Fa { &mut float_idx } else { &mut int_idx };
        try_assign(p, idx, kind, out);
    }

    for (block, pos) in call_sites(func) {
        let (args, count) = crate::opt::contiguous_args(func, block, pos);
        let mut int_idx = 0u8;
        let mut float_idx = 0u8;
        for v in args.into_iter().take(count) {
            let Value::Temp(t) = v else { continue };
            let kind = RegKind::arg_kind(func.temp_ty(t).is_float());
            let idx = if kind == RegKind::Fa { &mut float_idx } else { &mut int_idx };
            try_assign(t, idx, kind, out);
        }
    }
}

struct ScanItem {
    temp: TempId,
    start: u32,
    end: u32,
}

/// Classic Poletto/Sarkar sweep: sort by start, keep an end-ordered active
/// set, evict the longest-lived active when a candidate outlives it,
/// otherwise spill the candidate.
fn sweep(mut items: Vec<ScanItem>, kind: RegKind, capacity: u8, out: &mut HashMap<TempId, Assignment>) {
    items.sort_by_key(|iv| iv.start);
    let mut active: Vec<(ScanItem, u8)> = Vec::new();
    let mut free: Vec<u8> = (0..capacity).collect();

    for iv in items {
        let mut expired = Vec::new();
        active.retain(|(a, r)| {
            if a.end < iv.start {
                expired.push(*r);
                false
            } else {
                true
            }
        });
        free.extend(expired);
        active.sort_by_key(|(a, _)| a.end);

        if let Some(r) = free.pop() {
            out.insert(iv.temp, Assignment::Register(Reg { kind, index: r }));
            active.push((iv, r));
        } else if let Some((longest, _)) = active.last() {
            if longest.end > iv.end {
                let (evicted, r) = active.pop().unwrap();
                out.insert(evicted.temp, Assignment::Spill);
                out.insert(iv.temp, Assignment::Register(Reg { kind, index: r }));
                active.push((iv, r));
                active.sort_by_key(|(a, _)| a.end);
            } else {
                out.insert(iv.temp, Assignment::Spill);
            }
        } else {
            out.insert(iv.temp, Assignment::Spill);
        }
    }
}

fn owning_block(func: &Function, t: TempId) -> Option<BlockId> {
    let meta = func.temps.get(&t)?;
    let def = meta.defs.first()?;
    match def {
        Def::InstDef { inst } => func
            .blocks_in_order()
            .into_iter()
            .find(|&b| func.block(b).insts.contains(inst)),
        Def::PhiDef { block, .. } => Some(*block),
    }
}

/// Run the full four-stage allocator over `func`. `live_intervals` must
/// have been computed by [`crate::analysis::compute_live_intervals`]
/// against the current IR (liveness and use-def current too, for stage 1
/// and stage 2's classification).
pub fn allocate(func: &Function, banks: &RegisterBanks) -> Result<Allocation> {
    let intervals: Vec<LiveInterval> = {
        let mut f = func.clone();
        compute_live_intervals(&mut f)
    };

    let mut assignments: HashMap<TempId, Assignment> = HashMap::new();
    preallocate_args(func, banks, &mut assignments);

    let (global_ints, global_floats): (Vec<ScanItem>, Vec<ScanItem>) = intervals
        .iter()
        .filter(|iv| !assignments.contains_key(&iv.temp) && is_global(func, iv.temp))
        .map(|iv| ScanItem {
            temp: iv.temp,
            start: iv.start,
            end: iv.end,
        })
        .partition(|item| !func.temp_ty(item.temp).is_float());
    sweep(global_ints, RegKind::global_kind(false), banks.s, &mut assignments);
    sweep(global_floats, RegKind::global_kind(true), banks.fs, &mut assignments);

    let mut by_block: HashMap<BlockId, (Vec<ScanItem>, Vec<ScanItem>)> = HashMap::new();
    for iv in &intervals {
        if assignments.contains_key(&iv.temp) || is_global(func, iv.temp) {
            continue;
        }
        let Some(b) = owning_block(func, iv.temp) else { continue };
        let entry = by_block.entry(b).or_default();
        let item = ScanItem {
            temp: iv.temp,
            start: iv.start,
            end: iv.end,
        };
        if func.temp_ty(iv.temp).is_float() {
            entry.1.push(item);
        } else {
            entry.0.push(item);
        }
    }
    for (_, (ints, floats)) in by_block {
        sweep(ints, RegKind::local_kind(false), banks.t, &mut assignments);
        sweep(floats, RegKind::local_kind(true), banks.ft, &mut assignments);
    }

    for t in func.temps.keys() {
        if !assignments.contains_key(t) {
            return Err(Fatal::RegisterAllocationExhausted(format!(
                "{:?} received no allocation decision",
                t
            )));
        }
    }

    Ok(Allocation { assignments })
}
