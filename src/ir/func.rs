//! Functions: the per-function arenas and derived analysis fields.

use std::collections::{HashMap, HashSet};

use super::block::Block;
use super::instr::{Instruction, Phi};
use super::value::{PrimType, Use};
use super::{BlockId, InstId, PhiId, TempId};

/// Per-temporary bookkeeping: its type plus mutable use/def annotations
/// (§3's "mutable use-list and def-list annotations").
#[derive(Debug, Clone)]
pub struct TempMeta {
    pub ty: PrimType,
    pub uses: Vec<Use>,
    pub defs: Vec<super::value::Def>,
}

impl TempMeta {
    pub fn new(ty: PrimType) -> Self {
        Self {
            ty,
            uses: Vec::new(),
            defs: Vec::new(),
        }
    }
}

/// A function: its blocks, instructions, phis, and temporaries, plus the
/// fields analyses fill in.
#[derive(Debug, Clone)]
pub struct Function {
    pub export: bool,
    pub name: String,
    pub ret_ty: PrimType,
    pub param_tys: Vec<PrimType>,

    pub start: BlockId,
    pub end: BlockId,

    pub blocks: HashMap<BlockId, Block>,
    pub insts: HashMap<InstId, Instruction>,
    pub phis: HashMap<PhiId, Phi>,
    pub temps: HashMap<TempId, TempMeta>,

    next_temp: u32,
    next_inst: u32,
    next_phi: u32,

    // --- derived (filled by analyses) ---
    pub rpo: Vec<BlockId>,
    pub is_leaf: bool,
    pub is_inlinable: bool,
}

impl Function {
    pub(crate) fn new(start: BlockId, export: bool, name: impl Into<String>, ret_ty: PrimType) -> Self {
        let mut blocks = HashMap::new();
        blocks.insert(start, Block::new(start, "start"));
        Self {
            export,
            name: name.into(),
            ret_ty,
            param_tys: Vec::new(),
            start,
            end: start,
            blocks,
            insts: HashMap::new(),
            phis: HashMap::new(),
            temps: HashMap::new(),
            next_temp: 0,
            next_inst: 0,
            next_phi: 0,
            rpo: Vec::new(),
            is_leaf: true,
            is_inlinable: true,
        }
    }

    /// Allocate a fresh SSA temporary of the given type.
    pub fn new_temp(&mut self, ty: PrimType) -> TempId {
        let id = TempId(self.next_temp);
        self.next_temp += 1;
        self.temps.insert(id, TempMeta::new(ty));
        id
    }

    pub(crate) fn alloc_inst_id(&mut self) -> InstId {
        let id = InstId(self.next_inst);
        self.next_inst += 1;
        id
    }

    pub(crate) fn alloc_phi_id(&mut self) -> PhiId {
        let id = PhiId(self.next_phi);
        self.next_phi += 1;
        id
    }

    /// Append a block after `end` and make it the new `end`.
    pub fn push_block(&mut self, block: Block) -> BlockId {
        let id = block.id;
        if let Some(end) = self.blocks.get_mut(&self.end) {
            end.next = Some(id);
        }
        self.blocks.insert(id, block);
        self.end = id;
        id
    }

    /// Insert `block` into source order immediately after `after`.
    pub fn insert_block_after(&mut self, after: BlockId, mut block: Block) -> BlockId {
        let id = block.id;
        let following = self.blocks.get(&after).and_then(|b| b.next);
        block.next = following;
        self.blocks.insert(id, block);
        self.blocks.get_mut(&after).unwrap().next = Some(id);
        if self.end == after {
            self.end = id;
        }
        id
    }

    /// Remove a block entirely (used by unreachable-block removal and
    /// empty-block collapsing). The caller is responsible for having
    /// already retargeted every predecessor/phi/terminator reference.
    pub fn remove_block(&mut self, id: BlockId) {
        let next = self.blocks.get(&id).and_then(|b| b.next);
        for b in self.blocks.values_mut() {
            if b.next == Some(id) {
                b.next = next;
            }
        }
        if self.end == id {
            if let Some(prev) = self.blocks.values().find(|b| b.next == next).map(|b| b.id) {
                self.end = prev;
            }
        }
        self.blocks.remove(&id);
    }

    /// All blocks in source order, following `next` pointers from `start`.
    pub fn blocks_in_order(&self) -> Vec<BlockId> {
        let mut out = Vec::with_capacity(self.blocks.len());
        let mut cur = Some(self.start);
        let mut seen = HashSet::new();
        while let Some(id) = cur {
            if !seen.insert(id) {
                break;
            }
            out.push(id);
            cur = self.blocks.get(&id).and_then(|b| b.next);
        }
        out
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.blocks.get(&id).expect("dangling BlockId")
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        self.blocks.get_mut(&id).expect("dangling BlockId")
    }

    pub fn inst(&self, id: InstId) -> &Instruction {
        self.insts.get(&id).expect("dangling InstId")
    }

    pub fn inst_mut(&mut self, id: InstId) -> &mut Instruction {
        self.insts.get_mut(&id).expect("dangling InstId")
    }

    pub fn phi(&self, id: PhiId) -> &Phi {
        self.phis.get(&id).expect("dangling PhiId")
    }

    pub fn phi_mut(&mut self, id: PhiId) -> &mut Phi {
        self.phis.get_mut(&id).expect("dangling PhiId")
    }

    pub fn temp_ty(&self, id: TempId) -> PrimType {
        self.temps.get(&id).map(|m| m.ty).unwrap_or(PrimType::W)
    }

    /// The set of temporaries the function contains (§3: a derived field
    /// on `Function`).
    pub fn temp_set(&self) -> HashSet<TempId> {
        self.temps.keys().copied().collect()
    }
}
