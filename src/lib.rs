#![allow(clippy::too_many_arguments)]
//! # cminor-mid
//!
//! A mid-end for a small C-like language: an SSA-form, QBE-flavored
//! intermediate representation plus the analysis and optimization passes
//! that run over it before handoff to a RISC-V code generator.
//!
//! ## Pipeline
//!
//! ```text
//! front end → ir::builder → ssa (Mem2Reg + phis + rename) → opt (scalar,
//! loop, code motion, inlining) → ssadestruct → regalloc → codegen
//! ```
//!
//! This crate owns everything from the IR data model through register
//! allocation. The front end (lexer/parser/AST/symbol table) and the
//! code generator (instruction selection, peephole, assembly emission) are
//! included only as minimal stand-ins so the mid-end can be driven
//! end-to-end in tests; see [`frontend`] and [`codegen`].

pub mod analysis;
pub mod codegen;
pub mod error;
pub mod frontend;
pub mod ir;
pub mod opt;
pub mod pass;
pub mod pipeline;
pub mod regalloc;
pub mod ssa;
pub mod ssadestruct;
pub mod types;

pub use error::{Fatal, FrontendError, Result};
pub use ir::{Block, BlockId, Function, Instruction, Module, Opcode, Phi, Terminator, Value};
pub use pass::{BasicBlockPass, FunctionPass, ModulePass, Pass, Pipeline};
