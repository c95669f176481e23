use std::fmt;

use crate::u4;

/// A decoded CHIP-8 instruction.
///
/// The fields (x, y, n, nn, nnn) correspond to the operands encoded in the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// 0000 - Do nothing.
    Nop,

    /// 00E0 - Clear the display.
    ClearDisplay,
    /// 00EE - Return from a subroutine.
    Return,

    /// 1nnn - Jump to location nnn.
    Jump { nnn: u16 },
    /// 2nnn - Call subroutine at nnn.
    Call { nnn: u16 },
    /// Bnnn - Jump to location nnn + V0.
    JumpWithOffset { nnn: u16 },

    /// 3xnn - Skip next instruction if Vx == nn.
    SkipEqualImm { x: u4, nn: u8 },
    /// 4xnn - Skip next instruction if Vx != nn.
    SkipNotEqualImm { x: u4, nn: u8 },
    /// 5xy0 - Skip next instruction if Vx == Vy.
    SkipEqualReg { x: u4, y: u4 },
    /// 9xy0 - Skip next instruction if Vx != Vy.
    SkipNotEqualReg { x: u4, y: u4 },

    /// 6xnn - Set Vx = nn.
    SetImm { x: u4, nn: u8 },
    /// 7xnn - Set Vx = Vx + nn, VF untouched.
    AddImm { x: u4, nn: u8 },
    /// 8xyN - Register to register arithmetic.
    Alu { x: u4, y: u4, op: AluOp },

    /// Annn - Set I = nnn.
    SetIndex { nnn: u16 },
    /// Fx1E - Set I = I + Vx.
    AddIndex { x: u4 },

    /// Cxnn - Set Vx = random byte AND nn.
    Random { x: u4, nn: u8 },
    /// Dxyn - Draw an n-row sprite from I at (Vx, Vy).
    Draw { x: u4, y: u4, n: u4 },

    /// Ex9E - Skip next instruction if key Vx is pressed.
    SkipIfPressed { x: u4 },
    /// ExA1 - Skip next instruction if key Vx is not pressed.
    SkipIfNotPressed { x: u4 },
    /// Fx0A - Store the first pressed key in Vx, re-run until one is.
    WaitForKey { x: u4 },

    /// Fx07 - Set Vx = delay timer.
    ReadDelayTimer { x: u4 },
    /// Fx15 - Set delay timer = Vx.
    SetDelayTimer { x: u4 },
    /// Fx18 - Set sound timer = Vx.
    SetSoundTimer { x: u4 },

    /// Fx29 - Set I = address of the font glyph for Vx.
    FontGlyph { x: u4 },
    /// Fx33 - Store the decimal digits of Vx at I, I+1, I+2.
    Bcd { x: u4 },
    /// Fx55 - Store V0..=Vx at I.
    StoreRegs { x: u4 },
    /// Fx65 - Load V0..=Vx from I.
    LoadRegs { x: u4 },

    /// Anything else. Executes as a no-op.
    Unknown(u16),
}

/// Operations selected by the low nibble of 8xyN.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    /// 8xy0 - Vx = Vy
    Set,
    /// 8xy1 - Vx = Vx OR Vy
    Or,
    /// 8xy2 - Vx = Vx AND Vy
    And,
    /// 8xy3 - Vx = Vx XOR Vy
    Xor,
    /// 8xy4 - Vx = Vx + Vy, VF = carry
    Add,
    /// 8xy5 - Vx = Vx - Vy, VF = NOT borrow
    Sub,
    /// 8xy6 - Vx = Vx SHR 1, VF = shifted out bit
    ShiftRight,
    /// 8xy7 - Vx = Vy - Vx, VF = NOT borrow
    SubReverse,
    /// 8xyE - Vx = Vx SHL 1, VF = shifted out bit
    ShiftLeft,
}

impl Instruction {
    /// Decode a 16-bit raw opcode into an `Instruction`.
    pub fn decode(opcode: u16) -> Self {
        let nibble = (
            u4::of_word(opcode, 1).get(),
            u4::of_word(opcode, 2).get(),
            u4::of_word(opcode, 3).get(),
            u4::of_word(opcode, 4).get(),
        );

        let x = u4::of_word(opcode, 2);
        let y = u4::of_word(opcode, 3);
        let n = u4::of_word(opcode, 4);
        let nn = (opcode & 0x00FF) as u8;
        let nnn = opcode & 0x0FFF;

        match nibble {
            (0x0, 0x0, 0x0, 0x0) => Instruction::Nop,
            (0x0, 0x0, 0xE, 0x0) => Instruction::ClearDisplay,
            (0x0, 0x0, 0xE, 0xE) => Instruction::Return,
            (0x1, _, _, _) => Instruction::Jump { nnn },
            (0x2, _, _, _) => Instruction::Call { nnn },
            (0x3, _, _, _) => Instruction::SkipEqualImm { x, nn },
            (0x4, _, _, _) => Instruction::SkipNotEqualImm { x, nn },
            (0x5, _, _, 0x0) => Instruction::SkipEqualReg { x, y },
            (0x6, _, _, _) => Instruction::SetImm { x, nn },
            (0x7, _, _, _) => Instruction::AddImm { x, nn },
            (0x8, _, _, low) => match AluOp::from_nibble(low) {
                Some(op) => Instruction::Alu { x, y, op },
                None => Instruction::Unknown(opcode),
            },
            (0x9, _, _, 0x0) => Instruction::SkipNotEqualReg { x, y },
            (0xA, _, _, _) => Instruction::SetIndex { nnn },
            (0xB, _, _, _) => Instruction::JumpWithOffset { nnn },
            (0xC, _, _, _) => Instruction::Random { x, nn },
            (0xD, _, _, _) => Instruction::Draw { x, y, n },
            (0xE, _, 0x9, 0xE) => Instruction::SkipIfPressed { x },
            (0xE, _, 0xA, 0x1) => Instruction::SkipIfNotPressed { x },
            (0xF, _, 0x0, 0x7) => Instruction::ReadDelayTimer { x },
            (0xF, _, 0x0, 0xA) => Instruction::WaitForKey { x },
            (0xF, _, 0x1, 0x5) => Instruction::SetDelayTimer { x },
            (0xF, _, 0x1, 0x8) => Instruction::SetSoundTimer { x },
            (0xF, _, 0x1, 0xE) => Instruction::AddIndex { x },
            (0xF, _, 0x2, 0x9) => Instruction::FontGlyph { x },
            (0xF, _, 0x3, 0x3) => Instruction::Bcd { x },
            (0xF, _, 0x5, 0x5) => Instruction::StoreRegs { x },
            (0xF, _, 0x6, 0x5) => Instruction::LoadRegs { x },

            _ => Instruction::Unknown(opcode),
        }
    }
}

impl AluOp {
    fn from_nibble(low: u8) -> Option<Self> {
        Some(match low {
            0x0 => AluOp::Set,
            0x1 => AluOp::Or,
            0x2 => AluOp::And,
            0x3 => AluOp::Xor,
            0x4 => AluOp::Add,
            0x5 => AluOp::Sub,
            0x6 => AluOp::ShiftRight,
            0x7 => AluOp::SubReverse,
            0xE => AluOp::ShiftLeft,
            _ => return None,
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::Nop => write!(f, "NOP"),
            Instruction::ClearDisplay => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump { nnn } => write!(f, "JP {nnn:#05X}"),
            Instruction::Call { nnn } => write!(f, "CALL {nnn:#05X}"),
            Instruction::JumpWithOffset { nnn } => write!(f, "JP V0, {nnn:#05X}"),
            Instruction::SkipEqualImm { x, nn } => write!(f, "SE V{x}, {nn:#04X}"),
            Instruction::SkipNotEqualImm { x, nn } => write!(f, "SNE V{x}, {nn:#04X}"),
            Instruction::SkipEqualReg { x, y } => write!(f, "SE V{x}, V{y}"),
            Instruction::SkipNotEqualReg { x, y } => write!(f, "SNE V{x}, V{y}"),
            Instruction::SetImm { x, nn } => write!(f, "LD V{x}, {nn:#04X}"),
            Instruction::AddImm { x, nn } => write!(f, "ADD V{x}, {nn:#04X}"),
            Instruction::Alu { x, y, op } => {
                let mnemonic = match op {
                    AluOp::Set => "LD",
                    AluOp::Or => "OR",
                    AluOp::And => "AND",
                    AluOp::Xor => "XOR",
                    AluOp::Add => "ADD",
                    AluOp::Sub => "SUB",
                    AluOp::ShiftRight => "SHR",
                    AluOp::SubReverse => "SUBN",
                    AluOp::ShiftLeft => "SHL",
                };
                write!(f, "{mnemonic} V{x}, V{y}")
            }
            Instruction::SetIndex { nnn } => write!(f, "LD I, {nnn:#05X}"),
            Instruction::AddIndex { x } => write!(f, "ADD I, V{x}"),
            Instruction::Random { x, nn } => write!(f, "RND V{x}, {nn:#04X}"),
            Instruction::Draw { x, y, n } => write!(f, "DRW V{x}, V{y}, {n}"),
            Instruction::SkipIfPressed { x } => write!(f, "SKP V{x}"),
            Instruction::SkipIfNotPressed { x } => write!(f, "SKNP V{x}"),
            Instruction::WaitForKey { x } => write!(f, "LD V{x}, K"),
            Instruction::ReadDelayTimer { x } => write!(f, "LD V{x}, DT"),
            Instruction::SetDelayTimer { x } => write!(f, "LD DT, V{x}"),
            Instruction::SetSoundTimer { x } => write!(f, "LD ST, V{x}"),
            Instruction::FontGlyph { x } => write!(f, "LD F, V{x}"),
            Instruction::Bcd { x } => write!(f, "LD B, V{x}"),
            Instruction::StoreRegs { x } => write!(f, "LD [I], V{x}"),
            Instruction::LoadRegs { x } => write!(f, "LD V{x}, [I]"),
            Instruction::Unknown(opcode) => write!(f, "DW {opcode:#06X}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_operands_by_nibble_position() {
        assert_eq!(
            Instruction::decode(0xD125),
            Instruction::Draw {
                x: u4::new(1),
                y: u4::new(2),
                n: u4::new(5)
            }
        );
        assert_eq!(
            Instruction::decode(0x7A3C),
            Instruction::AddImm {
                x: u4::new(0xA),
                nn: 0x3C
            }
        );
        assert_eq!(
            Instruction::decode(0x2ABC),
            Instruction::Call { nnn: 0xABC }
        );
    }

    #[test]
    fn zero_word_is_nop() {
        assert_eq!(Instruction::decode(0x0000), Instruction::Nop);
        assert_eq!(Instruction::decode(0x0123), Instruction::Unknown(0x0123));
    }

    #[test]
    fn register_skips_require_zero_low_nibble() {
        assert!(matches!(
            Instruction::decode(0x5120),
            Instruction::SkipEqualReg { .. }
        ));
        assert!(matches!(
            Instruction::decode(0x9120),
            Instruction::SkipNotEqualReg { .. }
        ));
        assert_eq!(Instruction::decode(0x5121), Instruction::Unknown(0x5121));
        assert_eq!(Instruction::decode(0x912F), Instruction::Unknown(0x912F));
    }

    #[test]
    fn low_nibble_zero_elsewhere_is_not_a_register_skip() {
        assert_eq!(
            Instruction::decode(0x6120),
            Instruction::SetImm {
                x: u4::new(1),
                nn: 0x20
            }
        );
        assert!(matches!(
            Instruction::decode(0x8120),
            Instruction::Alu { op: AluOp::Set, .. }
        ));
    }

    #[test]
    fn undefined_alu_ops_are_unknown() {
        for low in [0x8, 0x9, 0xA, 0xB, 0xC, 0xD, 0xF] {
            let opcode = 0x8120 | low;
            assert_eq!(Instruction::decode(opcode), Instruction::Unknown(opcode));
        }
        assert!(matches!(
            Instruction::decode(0x812E),
            Instruction::Alu {
                op: AluOp::ShiftLeft,
                ..
            }
        ));
    }

    #[test]
    fn decodes_timer_and_key_group() {
        assert_eq!(
            Instruction::decode(0xF318),
            Instruction::SetSoundTimer { x: u4::new(3) }
        );
        assert_eq!(
            Instruction::decode(0xF40A),
            Instruction::WaitForKey { x: u4::new(4) }
        );
        assert_eq!(
            Instruction::decode(0xE5A1),
            Instruction::SkipIfNotPressed { x: u4::new(5) }
        );
        assert_eq!(Instruction::decode(0xE5A2), Instruction::Unknown(0xE5A2));
    }

    #[test]
    fn formats_mnemonics() {
        assert_eq!(Instruction::decode(0x00E0).to_string(), "CLS");
        assert_eq!(Instruction::decode(0x8AB4).to_string(), "ADD VA, VB");
        assert_eq!(Instruction::decode(0xA2F0).to_string(), "LD I, 0x2F0");
        assert_eq!(Instruction::decode(0xD015).to_string(), "DRW V0, V1, 5");
    }
}
