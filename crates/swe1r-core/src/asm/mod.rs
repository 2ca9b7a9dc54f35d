//! Minimal x86-32 encoder used to build trampolines and code caves.
//!
//! Only the handful of instructions the patches need are supported. Every
//! relative branch encodes `destination - (address after the displacement)`.

pub mod decode;
mod emitter;
pub mod encode;

pub use decode::{Branch, decode_branch, is_nop_run};
pub use emitter::Emitter;
pub use encode::{Cond, Reg, rel32};

/// Length of `call rel32` / `jmp rel32`
pub const NEAR_BRANCH_LEN: u32 = 5;

pub const NOP: u8 = 0x90;
