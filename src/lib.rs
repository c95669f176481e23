//! A CHIP-8 interpreter.
//!
//! [`emu::Interpreter`] owns the whole machine and is driven one instruction
//! at a time by its host. [`runner::Runner`] is a ready-made host loop that
//! paces instructions against the 60Hz timers.

pub mod emu;
mod nibble;
pub mod runner;

pub use emu::*;
pub use nibble::{NibbleOutOfRange, u4};
pub use runner::{FrameReport, Runner, RunnerConfig};
