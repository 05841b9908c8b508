//! Register bank shapes (§4.9): disjoint integer banks S (callee-saved),
//! T (caller-saved), A (argument), and their floating equivalents.

/// Which bank a physical register belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegKind {
    /// Integer callee-saved.
    S,
    /// Integer caller-saved.
    T,
    /// Integer argument.
    A,
    /// Float callee-saved.
    Fs,
    /// Float caller-saved.
    Ft,
    /// Float argument.
    Fa,
}

impl RegKind {
    /// The bank holding pre-allocated argument/parameter registers for a
    /// value of the given primitive type.
    pub fn arg_kind(is_float: bool) -> Self {
        if is_float {
            RegKind::Fa
        } else {
            RegKind::A
        }
    }

    /// The bank used for globally-live temporaries of the given type.
    pub fn global_kind(is_float: bool) -> Self {
        if is_float {
            RegKind::Fs
        } else {
            RegKind::S
        }
    }

    /// The bank used for block-local temporaries of the given type.
    pub fn local_kind(is_float: bool) -> Self {
        if is_float {
            RegKind::Ft
        } else {
            RegKind::T
        }
    }
}

/// A physical register: a bank plus an index within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg {
    pub kind: RegKind,
    pub index: u8,
}

/// Register counts per bank. RISC-V gives 12 callee-saved (`s0`-`s11`), 7
/// caller-saved (`t0`-`t6`), and 8 argument (`a0`-`a7`) integer registers,
/// mirrored by the float banks.
#[derive(Debug, Clone, Copy)]
pub struct RegisterBanks {
    pub s: u8,
    pub t: u8,
    pub a: u8,
    pub fs: u8,
    pub ft: u8,
    pub fa: u8,
}

impl RegisterBanks {
    pub fn riscv() -> Self {
        Self {
            s: 12,
            t: 7,
            a: 8,
            fs: 12,
            ft: 7,
            fa: 8,
        }
    }

    pub fn capacity(&self, kind: RegKind) -> u8 {
        match kind {
            RegKind::S => self.s,
            RegKind::T => self.t,
            RegKind::A => self.a,
            RegKind::Fs => self.fs,
            RegKind::Ft => self.ft,
            RegKind::Fa => self.fa,
        }
    }
}
