//! Register allocation (§4.9): linear scan over live intervals onto a
//! RISC-V-shaped bank layout (S/T/A integer, FS/FT/FA float).

pub mod banks;
pub mod linear_scan;

pub use banks::{Reg, RegKind, RegisterBanks};
pub use linear_scan::{allocate, Allocation, Assignment};
