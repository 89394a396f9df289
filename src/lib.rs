//! Shade - whole-program storage allocation for the 6502
//!
//! This crate decides where every function's locals, parameters and
//! temporaries live on 6502-family targets (C64/C128, VIC-20,
//! Commander X16): zero page, RAM, or a stack frame. Functions whose
//! lifetimes can never overlap share the same address range, and the
//! scarce zero page goes to the variables that profit most from it.

pub mod alloc;
pub mod config;
pub mod graph;
pub mod table;

// Re-export the pipeline surface
pub use alloc::{
    AllocError, AllocWarning, Allocation, CoalesceStrategy, ProgramLayout, Region, allocate,
};
pub use config::PlatformConfig;
pub use table::{FunctionTable, loader};
