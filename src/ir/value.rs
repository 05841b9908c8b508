//! IR primitive types, values, and the interning context that owns them.

use std::collections::HashMap;

/// IR primitive type tag: 32-bit int, 64-bit int/address, 32-bit float, or
/// void (no value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimType {
    /// 32-bit integer (`w`).
    W,
    /// 64-bit integer / address (`l`).
    L,
    /// 32-bit float (`s`).
    S,
    /// Void / no value (`x`).
    X,
}

impl PrimType {
    /// The one-character wire tag used in textual IR and opcode suffixes.
    pub fn tag(self) -> char {
        match self {
            PrimType::W => 'w',
            PrimType::L => 'l',
            PrimType::S => 's',
            PrimType::X => 'x',
        }
    }

    /// True for `S` (the only float primitive type).
    pub fn is_float(self) -> bool {
        matches!(self, PrimType::S)
    }
}

impl std::fmt::Display for PrimType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Identifier of a temporary (SSA name), unique within its function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

/// A use of a temporary, tagged by the construct doing the using. Mirrors
/// the original's `PhiUse`/`InstUse`/`JmpUse` variant split so liveness and
/// use-def bookkeeping can distinguish where a use lives without a second
/// lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Use {
    /// Used as an argument of phi `phi`, on the edge from `block`.
    PhiUse { phi: super::PhiId, block: super::BlockId },
    /// Used as an operand of instruction `inst`.
    InstUse { inst: super::InstId },
    /// Used as the condition or return value of the terminator of `block`.
    JmpUse { block: super::BlockId },
}

/// A definition of a temporary, tagged by the construct doing the defining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Def {
    /// Defined by instruction `inst`.
    InstDef { inst: super::InstId },
    /// Defined by phi `phi`, at the top of `block`.
    PhiDef { phi: super::PhiId, block: super::BlockId },
}

/// An operand or result: an SSA temporary, an interned constant, or an
/// interned global address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Value {
    /// A temporary (SSA name) local to the current function.
    Temp(TempId),
    /// An interned constant bit pattern of a given primitive type.
    Const(ConstHandle),
    /// An interned global symbol address (always type `L`).
    Global(GlobalHandle),
}

impl Value {
    /// The primitive type this value carries, given the interning context
    /// needed to resolve constant/global handles.
    pub fn ty(self, ctx: &Context) -> PrimType {
        match self {
            Value::Temp(t) => ctx.temp_ty.get(&t).copied().unwrap_or(PrimType::W),
            Value::Const(h) => ctx.consts[h.0 as usize].ty,
            Value::Global(_) => PrimType::L,
        }
    }

    /// Convenience constructor for a word constant.
    pub fn int(ctx: &mut Context, v: i32) -> Value {
        ctx.intern_int(v)
    }

    /// Convenience constructor for a float constant.
    pub fn float(ctx: &mut Context, v: f32) -> Value {
        ctx.intern_float(v)
    }
}

/// Interned constant bit pattern, keyed on its raw bits and primitive type
/// so `f32` (not `Eq`/`Hash`) can still be interned faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConstHandle(pub u32);

/// Interned global symbol address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GlobalHandle(pub u32);

#[derive(Debug, Clone, Copy)]
pub(crate) struct ConstBits {
    pub bits: u64,
    pub ty: PrimType,
}

/// Per-compilation interning context for [`ConstHandle`]s and
/// [`GlobalHandle`]s.
///
/// The original source interns these in process-wide static caches; this
/// crate hangs the caches off a context value owned by one compilation
/// instead (see SPEC_FULL.md §5), so two compilations in the same process
/// never share handles. Within one `Context`, interning is append-only:
/// equal constants/names always resolve to the same handle.
#[derive(Debug, Default)]
pub struct Context {
    pub(crate) consts: Vec<ConstBits>,
    int_cache: HashMap<i32, ConstHandle>,
    float_cache: HashMap<u32, ConstHandle>,
    pub(crate) globals: Vec<String>,
    global_cache: HashMap<String, GlobalHandle>,
    pub(crate) temp_ty: HashMap<TempId, PrimType>,
}

impl Context {
    /// A fresh, empty interning context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a 32-bit integer constant.
    pub fn intern_int(&mut self, v: i32) -> Value {
        if let Some(h) = self.int_cache.get(&v) {
            return Value::Const(*h);
        }
        let h = ConstHandle(self.consts.len() as u32);
        self.consts.push(ConstBits {
            bits: v as u32 as u64,
            ty: PrimType::W,
        });
        self.int_cache.insert(v, h);
        Value::Const(h)
    }

    /// Intern a 64-bit integer (long) constant.
    pub fn intern_long(&mut self, v: i64) -> Value {
        let h = ConstHandle(self.consts.len() as u32);
        self.consts.push(ConstBits {
            bits: v as u64,
            ty: PrimType::L,
        });
        Value::Const(h)
    }

    /// Intern a 32-bit float constant.
    pub fn intern_float(&mut self, v: f32) -> Value {
        let key = v.to_bits();
        if let Some(h) = self.float_cache.get(&key) {
            return Value::Const(*h);
        }
        let h = ConstHandle(self.consts.len() as u32);
        self.consts.push(ConstBits {
            bits: key as u64,
            ty: PrimType::S,
        });
        self.float_cache.insert(key, h);
        Value::Const(h)
    }

    /// Intern a global symbol address by name.
    pub fn intern_global(&mut self, name: &str) -> Value {
        if let Some(h) = self.global_cache.get(name) {
            return Value::Global(*h);
        }
        let h = GlobalHandle(self.globals.len() as u32);
        self.globals.push(name.to_string());
        self.global_cache.insert(name.to_string(), h);
        Value::Global(h)
    }

    /// The integer value of an interned int/long constant, if `v` is one.
    pub fn as_int(&self, v: Value) -> Option<i64> {
        match v {
            Value::Const(h) => {
                let c = self.consts[h.0 as usize];
                match c.ty {
                    PrimType::W => Some(c.bits as u32 as i32 as i64),
                    PrimType::L => Some(c.bits as i64),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// The float value of an interned float constant, if `v` is one.
    pub fn as_float(&self, v: Value) -> Option<f32> {
        match v {
            Value::Const(h) => {
                let c = self.consts[h.0 as usize];
                (c.ty == PrimType::S).then(|| f32::from_bits(c.bits as u32))
            }
            _ => None,
        }
    }

    /// Name of an interned global address.
    pub fn global_name(&self, h: GlobalHandle) -> &str {
        &self.globals[h.0 as usize]
    }

    /// Whether two values are the structurally identical operand (same
    /// temp id, or the same interned constant/global handle).
    pub fn syntactically_eq(a: Value, b: Value) -> bool {
        a == b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constants_intern_by_value() {
        let mut ctx = Context::new();
        let a = ctx.intern_int(5);
        let b = ctx.intern_int(5);
        assert_eq!(a, b);
        let c = ctx.intern_int(6);
        assert_ne!(a, c);
    }

    #[test]
    fn float_constants_intern_by_bits() {
        let mut ctx = Context::new();
        let a = ctx.intern_float(1.5);
        let b = ctx.intern_float(1.5);
        assert_eq!(a, b);
        assert_eq!(ctx.as_float(a), Some(1.5));
    }

    #[test]
    fn globals_intern_by_name() {
        let mut ctx = Context::new();
        let a = ctx.intern_global("foo");
        let b = ctx.intern_global("foo");
        assert_eq!(a, b);
        assert_ne!(a, ctx.intern_global("bar"));
    }
}
