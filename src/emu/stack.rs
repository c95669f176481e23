use super::InterpreterError;

pub const STACK_DEPTH: usize = 16;

/// Fixed-capacity call stack holding subroutine return addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallStack {
    slots: [u16; STACK_DEPTH],
    /// Number of live frames, always `<= STACK_DEPTH`.
    pointer: u16,
}

impl CallStack {
    pub const fn new() -> Self {
        Self {
            slots: [0; STACK_DEPTH],
            pointer: 0,
        }
    }

    /// Pushes the return address for a call to `target`.
    pub fn push(&mut self, return_address: u16, target: u16) -> Result<(), InterpreterError> {
        let slot = self
            .slots
            .get_mut(self.pointer as usize)
            .ok_or(InterpreterError::StackOverflow {
                target,
                depth: STACK_DEPTH,
            })?;
        *slot = return_address;
        self.pointer += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<u16, InterpreterError> {
        if self.pointer == 0 {
            return Err(InterpreterError::StackUnderflow);
        }
        self.pointer -= 1;
        Ok(self.slots[self.pointer as usize])
    }

    pub fn pointer(&self) -> u16 {
        self.pointer
    }

    /// Live frames, oldest first.
    pub fn frames(&self) -> &[u16] {
        &self.slots[..self.pointer as usize]
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}
