//! Opcodes, instructions, phi nodes, and terminators.

use super::value::{PrimType, Value};
use super::{BlockId, TempId};

/// Every opcode the mid-end IR supports, with its textual wire tag in
/// parentheses. The set is closed — front ends targeting this IR must
/// lower to exactly these ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// `dst = a + b` (`add`)
    Add,
    /// `dst = a - b` (`sub`)
    Sub,
    /// `dst = -a` (`neg`, second arg unused)
    Neg,
    /// `dst = a / b` (`div`)
    Div,
    /// `dst = a * b` (`mul`)
    Mul,
    /// `dst = a % b`, integer only (`rem`)
    Rem,

    /// Store a 32-bit int/float through pointer `a` of value `b` (`storew`/`stores`).
    StoreW,
    /// Store a 64-bit int/address through pointer `a` of value `b` (`storel`).
    StoreL,
    /// Store a 32-bit float through pointer `a` of value `b` (`stores`).
    StoreS,
    /// Load a 32-bit int from pointer `a` (`loadw`).
    LoadW,
    /// Load a 64-bit int/address from pointer `a` (`loadl`).
    LoadL,
    /// Load a 32-bit float from pointer `a` (`loads`).
    LoadS,
    /// Reserve 4-byte-aligned stack space of size `a` (entry block only).
    Alloc4,
    /// Reserve 8-byte-aligned stack space of size `a` (entry block only).
    Alloc8,

    /// `dst = (a == b)`, word operands (`ceqw`)
    CeqW,
    /// `dst = (a != b)`, word operands (`cnew`)
    CneW,
    /// `dst = (a <= b)`, signed word (`cslew`)
    CsleW,
    /// `dst = (a < b)`, signed word (`csltw`)
    CsltW,
    /// `dst = (a >= b)`, signed word (`csgew`)
    CsgeW,
    /// `dst = (a > b)`, signed word (`csgtw`)
    CsgtW,
    /// `dst = (a == b)`, float operands (`ceqs`)
    CeqS,
    /// `dst = (a != b)`, float operands (`cnes`)
    CneS,
    /// `dst = (a <= b)`, float operands (`cles`)
    CleS,
    /// `dst = (a < b)`, float operands (`clts`)
    CltS,
    /// `dst = (a >= b)`, float operands (`cges`)
    CgeS,
    /// `dst = (a > b)`, float operands (`cgts`)
    CgtS,

    /// Sign-extend word to long (`extsw`)
    ExtSW,
    /// Float to signed int (`stosi`)
    StoSi,
    /// Signed int to float (`swtof`)
    SwToF,

    /// Receive the next function parameter into `dst` (`par`); parameter
    /// index is implied by position among `par` instructions in the entry
    /// block.
    Par,
    /// Pass `a` as the next call argument (`arg`); argument index is
    /// implied by position among the `arg` instructions immediately
    /// preceding the next `call`.
    Arg,
    /// Call the function whose address is `a` (`call`); preceded by zero
    /// or more `arg` instructions carrying this call's arguments.
    Call,

    /// `dst = a` (`copy`)
    Copy,
    /// Placeholder with no effect (`nop`).
    Nop,
}

impl Opcode {
    /// The textual wire tag from spec §6.
    pub fn wire_tag(self) -> &'static str {
        use Opcode::*;
        match self {
            Add => "add",
            Sub => "sub",
            Neg => "neg",
            Div => "div",
            Mul => "mul",
            Rem => "rem",
            StoreW => "storew",
            StoreL => "storel",
            StoreS => "stores",
            LoadW => "loadw",
            LoadL => "loadl",
            LoadS => "loads",
            Alloc4 => "alloc4",
            Alloc8 => "alloc8",
            CeqW => "ceqw",
            CneW => "cnew",
            CsleW => "cslew",
            CsltW => "csltw",
            CsgeW => "csgew",
            CsgtW => "csgtw",
            CeqS => "ceqs",
            CneS => "cnes",
            CleS => "cles",
            CltS => "clts",
            CgeS => "cges",
            CgtS => "cgts",
            ExtSW => "extsw",
            StoSi => "stosi",
            SwToF => "swtof",
            Par => "par",
            Arg => "arg",
            Call => "call",
            Copy => "copy",
            Nop => "nop",
        }
    }

    /// True for `storew`/`storel`/`stores`, `call`, `par`, `arg` — ops that
    /// must never be deleted or reordered past a side effect.
    pub fn is_side_effecting_or_pinned(self) -> bool {
        matches!(
            self,
            Opcode::StoreW
                | Opcode::StoreL
                | Opcode::StoreS
                | Opcode::Call
                | Opcode::Par
                | Opcode::Arg
        )
    }

    /// True for the two stack-allocation ops; the data model requires
    /// these to appear only in the entry block.
    pub fn is_alloc(self) -> bool {
        matches!(self, Opcode::Alloc4 | Opcode::Alloc8)
    }

    /// True for comparisons (int or float); LICM treats these as
    /// non-hoistable per spec §4.5.
    pub fn is_compare(self) -> bool {
        use Opcode::*;
        matches!(
            self,
            CeqW | CneW | CsleW | CsltW | CsgeW | CsgtW | CeqS | CneS | CleS | CltS | CgeS | CgtS
        )
    }

    /// True for loads (movable in GCM only insofar as the pinned/movable
    /// split in §4.6 keeps them pinned — included here for instruction
    /// classification, not for LICM eligibility).
    pub fn is_load(self) -> bool {
        matches!(self, Opcode::LoadW | Opcode::LoadL | Opcode::LoadS)
    }

    /// True for `copy`.
    pub fn is_copy(self) -> bool {
        matches!(self, Opcode::Copy)
    }
}

/// A single IR instruction: an opcode, an optional destination, and up to
/// two operands.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub opcode: Opcode,
    /// Result type. For ops with no destination (stores, `arg`, `call`
    /// without a returned value) this is the operand type the op acts on.
    pub ty: PrimType,
    pub dst: Option<TempId>,
    pub args: [Option<Value>; 2],
    /// Position assigned by the last instruction-numbering analysis run
    /// (§4.2, used by live-interval computation). `None` until computed.
    pub number: Option<u32>,
}

impl Instruction {
    /// Construct an instruction with both argument slots filled.
    pub fn binary(opcode: Opcode, ty: PrimType, dst: Option<TempId>, a0: Value, a1: Value) -> Self {
        Self {
            opcode,
            ty,
            dst,
            args: [Some(a0), Some(a1)],
            number: None,
        }
    }

    /// Construct an instruction with one argument.
    pub fn unary(opcode: Opcode, ty: PrimType, dst: Option<TempId>, a0: Value) -> Self {
        Self {
            opcode,
            ty,
            dst,
            args: [Some(a0), None],
            number: None,
        }
    }

    /// Construct a nullary instruction (`par`, `nop`).
    pub fn nullary(opcode: Opcode, ty: PrimType, dst: Option<TempId>) -> Self {
        Self {
            opcode,
            ty,
            dst,
            args: [None, None],
            number: None,
        }
    }

    /// Iterator over the non-empty operand slots.
    pub fn operands(&self) -> impl Iterator<Item = Value> + '_ {
        self.args.iter().filter_map(|a| *a)
    }

    /// Mutable access to the non-empty operand slots, for rewriting passes.
    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.args.iter_mut().filter_map(|a| a.as_mut())
    }
}

/// A phi node: chooses among incoming values by predecessor.
///
/// Invariant (§3): `args.len()` equals the owning block's predecessor
/// count, in predecessor order.
#[derive(Debug, Clone)]
pub struct Phi {
    pub ty: PrimType,
    pub dst: TempId,
    pub args: Vec<(BlockId, Value)>,
}

impl Phi {
    /// The incoming value for a given predecessor block, if present.
    pub fn incoming(&self, from: BlockId) -> Option<Value> {
        self.args.iter().find(|(b, _)| *b == from).map(|(_, v)| *v)
    }

    /// Mutable access to the incoming value for a given predecessor block.
    pub fn incoming_mut(&mut self, from: BlockId) -> Option<&mut Value> {
        self.args.iter_mut().find(|(b, _)| *b == from).map(|(_, v)| v)
    }
}

/// A block's terminator.
///
/// Successor counts must agree with the variant (§3): fall-through 0,
/// jump 1, conditional-jump 2, return 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    /// No explicit terminator yet; control falls into the next block in
    /// source order. Builder terminator calls replace this; it must not
    /// survive into SSA destruction.
    FallThrough,
    /// Unconditional jump to `target`.
    Jump { target: BlockId },
    /// Jump to `if_true` if `cond` is non-zero, else `if_false`.
    CondJump {
        cond: Value,
        if_true: BlockId,
        if_false: BlockId,
    },
    /// Return, optionally with a value.
    Return { value: Option<Value> },
}

impl Terminator {
    /// The successor blocks in terminator-defined order (true branch
    /// before false branch for `CondJump`). A conditional jump whose two
    /// targets are identical yields that target exactly once.
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Terminator::FallThrough => Vec::new(),
            Terminator::Jump { target } => vec![*target],
            Terminator::CondJump {
                if_true, if_false, ..
            } => {
                if if_true == if_false {
                    vec![*if_true]
                } else {
                    vec![*if_true, *if_false]
                }
            }
            Terminator::Return { .. } => Vec::new(),
        }
    }

    /// True once a real (non-fall-through) terminator has been set.
    pub fn is_set(&self) -> bool {
        !matches!(self, Terminator::FallThrough)
    }
}
