use log::debug;
use rand::Rng;

use super::{
    AluOp, DISPLAY_HEIGHT, DISPLAY_WIDTH, Instruction, Interpreter, InterpreterError, TickOutcome,
    glyph_address, pixel_index,
};
use crate::u4;

/// Flag register.
const VF: usize = 0xF;
/// Longest sprite a Dxyn can draw.
const MAX_SPRITE_ROWS: usize = 15;

impl Interpreter {
    /// Runs an already fetched instruction. The program counter points past it.
    pub(crate) fn execute(
        &mut self,
        instruction: Instruction,
    ) -> Result<TickOutcome, InterpreterError> {
        match instruction {
            Instruction::Nop => {}
            Instruction::ClearDisplay => {
                self.display = [false; DISPLAY_WIDTH * DISPLAY_HEIGHT];
                return Ok(TickOutcome::DisplayUpdated);
            }
            Instruction::Return => {
                self.pc = self.stack.pop()?;
            }
            Instruction::Jump { nnn } => {
                self.pc = nnn;
            }
            Instruction::Call { nnn } => {
                self.stack.push(self.pc, nnn)?;
                self.pc = nnn;
            }
            Instruction::JumpWithOffset { nnn } => {
                self.pc = nnn.wrapping_add(self.v[0].into());
            }
            Instruction::SkipEqualImm { x, nn } => {
                self.skip_if(self.v[x] == nn);
            }
            Instruction::SkipNotEqualImm { x, nn } => {
                self.skip_if(self.v[x] != nn);
            }
            Instruction::SkipEqualReg { x, y } => {
                self.skip_if(self.v[x] == self.v[y]);
            }
            Instruction::SkipNotEqualReg { x, y } => {
                self.skip_if(self.v[x] != self.v[y]);
            }
            Instruction::SetImm { x, nn } => {
                self.v[x] = nn;
            }
            Instruction::AddImm { x, nn } => {
                self.v[x] = self.v[x].wrapping_add(nn);
            }
            Instruction::Alu { x, y, op } => {
                self.execute_alu(x, y, op);
            }
            Instruction::SetIndex { nnn } => {
                self.i = nnn;
            }
            Instruction::AddIndex { x } => {
                self.i = self.i.wrapping_add(self.v[x].into());
            }
            Instruction::Random { x, nn } => {
                let rand_byte: u8 = self.rng.random();
                self.v[x] = rand_byte & nn;
            }
            Instruction::Draw { x, y, n } => {
                return self.execute_draw(x, y, n);
            }
            Instruction::SkipIfPressed { x } => {
                self.skip_if(self.is_key_pressed(self.v[x]));
            }
            Instruction::SkipIfNotPressed { x } => {
                self.skip_if(!self.is_key_pressed(self.v[x]));
            }
            Instruction::WaitForKey { x } => {
                return Ok(self.execute_wait_for_key(x));
            }
            Instruction::ReadDelayTimer { x } => {
                self.v[x] = self.delay_timer;
            }
            Instruction::SetDelayTimer { x } => {
                self.delay_timer = self.v[x];
            }
            Instruction::SetSoundTimer { x } => {
                self.sound_timer = self.v[x];
            }
            Instruction::FontGlyph { x } => {
                self.i = glyph_address(self.v[x]);
            }
            Instruction::Bcd { x } => {
                let value = self.v[x];
                let digits = [value / 100, (value / 10) % 10, value % 10];
                self.mem_slice_mut(self.i, digits.len())?
                    .copy_from_slice(&digits);
            }
            Instruction::StoreRegs { x } => {
                let count = usize::from(x) + 1;
                let (i, v) = (self.i, self.v);
                self.mem_slice_mut(i, count)?.copy_from_slice(&v[..count]);
            }
            Instruction::LoadRegs { x } => {
                let count = usize::from(x) + 1;
                let mut loaded = [0; 16];
                loaded[..count].copy_from_slice(self.mem_slice(self.i, count)?);
                for reg in x.up_to() {
                    self.v[reg] = loaded[usize::from(reg)];
                }
            }
            Instruction::Unknown(opcode) => {
                debug!(
                    "Ignoring unknown opcode {opcode:#06X} at {:#05X}",
                    self.pc.wrapping_sub(2)
                );
            }
        };

        Ok(TickOutcome::Continue)
    }

    fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// Keys above 0xF do not exist and are never pressed.
    fn is_key_pressed(&self, key: u8) -> bool {
        self.keys.get(usize::from(key)).copied().unwrap_or(false)
    }

    // The flag is always written last, so when x is F the flag wins.
    fn execute_alu(&mut self, x: u4, y: u4, op: AluOp) {
        match op {
            AluOp::Set => self.v[x] = self.v[y],
            AluOp::Or => self.v[x] |= self.v[y],
            AluOp::And => self.v[x] &= self.v[y],
            AluOp::Xor => self.v[x] ^= self.v[y],
            AluOp::Add => {
                let sum = u16::from(self.v[x]) + u16::from(self.v[y]);
                self.v[x] = sum as u8;
                self.v[VF] = u8::from(sum > 0xFF);
            }
            AluOp::Sub => {
                let diff = i16::from(self.v[x]) - i16::from(self.v[y]);
                self.v[x] = diff as u8;
                self.v[VF] = u8::from(diff >= 0); // Notice that borrow is inverted
            }
            AluOp::SubReverse => {
                let diff = i16::from(self.v[y]) - i16::from(self.v[x]);
                self.v[x] = diff as u8;
                self.v[VF] = u8::from(diff >= 0);
            }
            AluOp::ShiftRight => {
                let lsb = self.v[x] & 1;
                self.v[x] >>= 1;
                self.v[VF] = lsb;
            }
            AluOp::ShiftLeft => {
                let msb = (self.v[x] >> 7) & 1;
                self.v[x] <<= 1;
                self.v[VF] = msb;
            }
        }
    }

    fn execute_draw(&mut self, x: u4, y: u4, n: u4) -> Result<TickOutcome, InterpreterError> {
        let x_pos = usize::from(self.v[x]);
        let y_pos = usize::from(self.v[y]);

        let row_count = usize::from(n);
        let mut sprite = [0u8; MAX_SPRITE_ROWS];
        sprite[..row_count].copy_from_slice(self.mem_slice(self.i, row_count)?);

        let mut any_erased = false;
        for (row, sprite_byte) in sprite[..row_count].iter().enumerate() {
            for col in 0..8 {
                // If current sprite bit is non-zero
                if sprite_byte & (0x80 >> col) != 0 {
                    // Every pixel wraps on its own, a sprite can straddle both edges
                    let pixel = &mut self.display[pixel_index(x_pos + col, y_pos + row)];

                    // Flip the pixel
                    *pixel ^= true;

                    if !*pixel {
                        any_erased = true;
                    }
                }
            }
        }

        self.v[VF] = u8::from(any_erased);
        Ok(TickOutcome::DisplayUpdated)
    }

    fn execute_wait_for_key(&mut self, x: u4) -> TickOutcome {
        match self.keys.iter().position(|&pressed| pressed) {
            Some(key) => {
                self.v[x] = key as u8;
                TickOutcome::Continue
            }
            None => {
                // Repeat this instruction until a key is pressed
                self.pc = self.pc.wrapping_sub(2);
                TickOutcome::AwaitingKey
            }
        }
    }
}
