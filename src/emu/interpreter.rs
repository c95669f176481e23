use log::{info, trace};
use rand::{SeedableRng, rngs::StdRng};

use super::{
    CallStack, DISPLAY_HEIGHT, DISPLAY_WIDTH, Display, FONT, FONT_START_ADDRESS, Instruction,
    InterpreterError, KEY_COUNT, MEMORY_SIZE, PROGRAM_START_ADDRESS, REGISTER_COUNT, TickOutcome,
    pixel_index,
};
use crate::u4;

/// CHIP-8 virtual machine state
pub struct Interpreter {
    /// 4KB memory array, font glyphs at the bottom
    pub(crate) memory: [u8; MEMORY_SIZE],
    /// Display buffer: 64x32 monochrome pixels, row-major
    pub(crate) display: Display,

    /// Program counter: address of the next instruction to execute
    pub(crate) pc: u16,
    /// Index register: used for memory operations
    pub(crate) i: u16,
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub(crate) v: [u8; REGISTER_COUNT],
    /// Call stack for subroutine returns
    pub(crate) stack: CallStack,

    /// Delay timer: decremented by `tick_timers`
    pub(crate) delay_timer: u8,
    /// Sound timer: decremented by `tick_timers`, the host beeps while non-zero
    pub(crate) sound_timer: u8,

    /// Keypad state: 16 keys mapped as booleans (true = pressed)
    pub(crate) keys: [bool; KEY_COUNT],

    /// Source for CXNN. Not part of the machine state, survives `reset`.
    pub(crate) rng: StdRng,
}

impl Interpreter {
    /// Creates an interpreter whose random source is seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Creates an interpreter with a deterministic random source.
    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut interpreter = Interpreter {
            memory: [0; MEMORY_SIZE],
            display: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
            pc: PROGRAM_START_ADDRESS,
            i: 0,
            v: [0; REGISTER_COUNT],
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            keys: [false; KEY_COUNT],
            rng,
        };
        interpreter.load_font();
        interpreter
    }

    /// Zeroes all machine state and reloads the font. The loaded program is
    /// wiped too, so the host has to call `load_program` again.
    pub fn reset(&mut self) {
        self.memory.fill(0);
        self.display.fill(false);
        self.pc = PROGRAM_START_ADDRESS;
        self.i = 0;
        self.v.fill(0);
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.keys.fill(false);
        self.load_font();
        info!("Interpreter reset");
    }

    /// Copies a raw ROM image into memory at the program start address.
    pub fn load_program(&mut self, program: &[u8]) -> Result<(), InterpreterError> {
        let start = PROGRAM_START_ADDRESS as usize;
        let end = start + program.len();
        self.memory
            .get_mut(start..end)
            .ok_or(InterpreterError::ProgramTooLarge {
                size: program.len(),
                max_size: MEMORY_SIZE - start,
            })?
            .copy_from_slice(program);

        info!("Loaded program [size: {}]", program.len());
        Ok(())
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    ///
    /// A failing tick leaves the machine exactly as it was before the call.
    pub fn tick(&mut self) -> Result<TickOutcome, InterpreterError> {
        let address = self.pc;
        let opcode = self.fetch()?;
        let instruction = Instruction::decode(opcode);
        trace!("{address:#05X}: {opcode:04X} {instruction}");

        self.execute(instruction).inspect_err(|_| self.pc = address)
    }

    /// Decrements both timers towards zero. Meant to be called at 60Hz.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.keys[key] = pressed;
    }

    /// Overwrite the whole keypad at once.
    pub fn set_keys(&mut self, keys: &[bool; KEY_COUNT]) {
        self.keys = *keys;
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    /// Get the state of a pixel on the display (true = on). Coordinates wrap.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.display[pixel_index(x, y)]
    }

    /// Returns true if the sound timer is greater than zero, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn program_counter(&self) -> u16 {
        self.pc
    }

    pub fn index_register(&self) -> u16 {
        self.i
    }

    pub fn v_registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.v
    }

    pub fn delay_timer(&self) -> u8 {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> u8 {
        self.sound_timer
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn keys(&self) -> &[bool; KEY_COUNT] {
        &self.keys
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.memory
    }

    fn load_font(&mut self) {
        self.memory[FONT_START_ADDRESS..FONT_START_ADDRESS + FONT.len()].copy_from_slice(&FONT);
    }

    /// Fetches the next 16-bit opcode and moves the program counter past it.
    fn fetch(&mut self) -> Result<u16, InterpreterError> {
        let bytes = self.mem_slice(self.pc, 2)?;
        let opcode = u16::from_be_bytes([bytes[0], bytes[1]]);
        self.pc = self.pc.wrapping_add(2);

        Ok(opcode)
    }

    /// Bounds-checked view of `len` bytes starting at `start`.
    pub(crate) fn mem_slice(&self, start: u16, len: usize) -> Result<&[u8], InterpreterError> {
        let begin = start as usize;
        self.memory
            .get(begin..begin + len)
            .ok_or(InterpreterError::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE as u16),
            })
    }

    /// Mutable counterpart of [`Self::mem_slice`].
    pub(crate) fn mem_slice_mut(
        &mut self,
        start: u16,
        len: usize,
    ) -> Result<&mut [u8], InterpreterError> {
        let begin = start as usize;
        self.memory
            .get_mut(begin..begin + len)
            .ok_or(InterpreterError::MemoryOutOfBounds {
                address: start.max(MEMORY_SIZE as u16),
            })
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::GLYPH_SIZE;

    fn assert_same_state(a: &Interpreter, b: &Interpreter) {
        assert_eq!(a.memory, b.memory);
        assert_eq!(a.display, b.display);
        assert_eq!(a.pc, b.pc);
        assert_eq!(a.i, b.i);
        assert_eq!(a.v, b.v);
        assert_eq!(a.stack, b.stack);
        assert_eq!(a.delay_timer, b.delay_timer);
        assert_eq!(a.sound_timer, b.sound_timer);
        assert_eq!(a.keys, b.keys);
    }

    fn dirty() -> Interpreter {
        let mut chip = Interpreter::new_with_seed(7);
        chip.load_program(&[0x12, 0x34, 0x56]).unwrap();
        chip.memory[0xF00] = 0xAA;
        chip.display[100] = true;
        chip.pc = 0x456;
        chip.i = 0x321;
        chip.v[3] = 9;
        chip.stack.push(0x202, 0x300).unwrap();
        chip.delay_timer = 4;
        chip.sound_timer = 5;
        chip.keys[0xA] = true;
        chip
    }

    #[test]
    fn new_starts_at_program_address() {
        let chip = Interpreter::new_with_seed(0);
        assert_eq!(chip.program_counter(), 0x200);
        assert_eq!(chip.index_register(), 0);
        assert_eq!(chip.stack().pointer(), 0);
        assert!(chip.display().iter().all(|&pixel| !pixel));
        assert!(chip.memory()[FONT.len()..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn font_glyphs_at_five_byte_offsets() {
        let chip = Interpreter::new_with_seed(0);
        for digit in 0..16 {
            let start = digit * GLYPH_SIZE;
            assert_eq!(
                chip.memory()[start..start + GLYPH_SIZE],
                FONT[start..start + GLYPH_SIZE]
            );
        }
        // Glyph "0" and glyph "F" spot checks
        assert_eq!(chip.memory()[0..5], [0xF0, 0x90, 0x90, 0x90, 0xF0]);
        assert_eq!(chip.memory()[75..80], [0xF0, 0x80, 0xF0, 0x80, 0x80]);
    }

    #[test]
    fn reset_matches_fresh_instance() {
        let fresh = Interpreter::new_with_seed(1);

        let mut once = dirty();
        once.reset();
        assert_same_state(&once, &fresh);

        let mut twice = dirty();
        twice.reset();
        twice.reset();
        assert_same_state(&twice, &once);
    }

    #[test]
    fn load_program_copies_at_start_address() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.load_program(&[0x60, 0x05, 0x61]).unwrap();
        assert_eq!(chip.memory()[0x200..0x203], [0x60, 0x05, 0x61]);
        assert_eq!(chip.memory()[0x203], 0);
    }

    #[test]
    fn load_program_rejects_oversized_rom() {
        let mut chip = Interpreter::new_with_seed(0);
        let max = MEMORY_SIZE - PROGRAM_START_ADDRESS as usize;
        assert!(chip.load_program(&vec![0xFF; max]).is_ok());
        assert_eq!(
            chip.load_program(&vec![0xFF; max + 1]),
            Err(InterpreterError::ProgramTooLarge {
                size: max + 1,
                max_size: max
            })
        );
    }

    #[test]
    fn fetch_is_big_endian_and_advances_by_two() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.load_program(&[0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(chip.fetch(), Ok(0xAABB));
        assert_eq!(chip.fetch(), Ok(0xCCDD));
        assert_eq!(chip.program_counter(), 0x204);
    }

    #[test]
    fn fetch_past_end_of_memory_fails_without_moving() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.pc = 0xFFF;
        assert_eq!(
            chip.tick(),
            Err(InterpreterError::MemoryOutOfBounds { address: 0x1000 })
        );
        assert_eq!(chip.program_counter(), 0xFFF);
    }

    #[test]
    fn timers_count_down_to_zero() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.delay_timer = 2;
        chip.sound_timer = 1;
        assert!(chip.should_beep());

        chip.tick_timers();
        assert_eq!((chip.delay_timer(), chip.sound_timer()), (1, 0));
        assert!(!chip.should_beep());

        chip.tick_timers();
        chip.tick_timers();
        assert_eq!((chip.delay_timer(), chip.sound_timer()), (0, 0));
    }

    #[test]
    fn keys_can_be_set_individually_or_wholesale() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.set_key(u4::new(0xC), true);
        assert!(chip.keys()[0xC]);

        let mut all = [false; KEY_COUNT];
        all[1] = true;
        chip.set_keys(&all);
        assert!(!chip.keys()[0xC]);
        assert!(chip.keys()[1]);
    }

    #[test]
    fn pixel_wraps_coordinates() {
        let mut chip = Interpreter::new_with_seed(0);
        chip.display[pixel_index(3, 2)] = true;
        assert!(chip.pixel(3, 2));
        assert!(chip.pixel(3 + DISPLAY_WIDTH, 2 + DISPLAY_HEIGHT));
    }
}
