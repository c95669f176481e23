/// Outcome of a single interpreter tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The instruction ran and nothing visible to the host changed.
    Continue,
    /// The display buffer was modified (00E0 or DXYN), the host may redraw.
    DisplayUpdated,
    /// FX0A found no pressed key, the same instruction runs again next tick.
    AwaitingKey,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpreterError {
    #[error("Program is too large ({size} bytes), max size is {max_size} bytes")]
    ProgramTooLarge { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack overflow: call to {target:#05X} exceeds the {depth}-level call stack")]
    StackOverflow { target: u16, depth: usize },

    #[error("Stack underflow: attempted to return from a subroutine with empty call stack")]
    StackUnderflow,
}

// The constants are fixed by the CHIP-8 machine definition
pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
pub const MEMORY_SIZE: usize = 4096;
pub const PROGRAM_START_ADDRESS: u16 = 0x200;
pub const REGISTER_COUNT: usize = 16;
pub const KEY_COUNT: usize = 16;

/// Flat row-major pixel buffer, `true` = lit.
pub type Display = [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT];

/// Index of pixel `(x, y)` in a [`Display`], wrapping both coordinates.
pub const fn pixel_index(x: usize, y: usize) -> usize {
    (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
}
