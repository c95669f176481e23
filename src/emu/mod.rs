//! The CHIP-8 interpreter core: machine state, decoding and execution.

mod execute;
mod font;
mod instruction;
mod interpreter;
mod stack;
mod types;

pub use font::*;
pub use instruction::*;
pub use interpreter::*;
pub use stack::*;
pub use types::*;
