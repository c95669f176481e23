use log::debug;

use crate::{
    emu::{Interpreter, InterpreterError, KEY_COUNT, TickOutcome},
    u4,
};

pub const TIMER_HZ: f32 = 60.0;
pub const FRAME_TIME_STEP: f32 = 1.0 / TIMER_HZ;

/// Frames `update` will run at most in one call, the rest of a long stall is dropped.
pub const MAX_CATCH_UP_FRAMES: u32 = 4;

/// How the host paces the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Instruction ticks per 60Hz timer tick.
    pub cycles_per_frame: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            cycles_per_frame: 11,
        }
    }
}

/// What happened during one or more frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frames: u32,
    pub display_updated: bool,
    pub awaiting_key: bool,
}

impl FrameReport {
    fn merge(&mut self, other: FrameReport) {
        self.frames += other.frames;
        self.display_updated |= other.display_updated;
        self.awaiting_key = other.awaiting_key;
    }
}

/// High-level emulator runner that manages timing internally.
pub struct Runner {
    interpreter: Interpreter,
    config: RunnerConfig,
    dt_accumulator: f32,
}

impl Runner {
    pub fn new(interpreter: Interpreter, config: RunnerConfig) -> Self {
        Self {
            interpreter,
            config,
            dt_accumulator: 0.0,
        }
    }

    /// Update emulator by delta time.
    ///
    /// Runs one frame (a timer tick followed by `cycles_per_frame` instructions)
    /// for every whole 1/60s that has elapsed.
    pub fn update(&mut self, dt: f32) -> Result<FrameReport, InterpreterError> {
        self.dt_accumulator += dt;

        let mut report = FrameReport::default();
        while self.dt_accumulator >= FRAME_TIME_STEP {
            if report.frames == MAX_CATCH_UP_FRAMES {
                debug!("Dropping {:.3}s of emulation time", self.dt_accumulator);
                self.dt_accumulator = 0.0;
                break;
            }
            self.dt_accumulator -= FRAME_TIME_STEP;
            report.merge(self.run_frame()?);
        }

        Ok(report)
    }

    /// Runs exactly one frame regardless of elapsed time.
    pub fn run_frame(&mut self) -> Result<FrameReport, InterpreterError> {
        let mut report = FrameReport {
            frames: 1,
            ..FrameReport::default()
        };

        self.interpreter.tick_timers();

        for _ in 0..self.config.cycles_per_frame {
            match self.interpreter.tick()? {
                TickOutcome::Continue => {}
                TickOutcome::DisplayUpdated => report.display_updated = true,
                TickOutcome::AwaitingKey => {
                    // Keys only change between frames, polling again is pointless
                    report.awaiting_key = true;
                    break;
                }
            }
        }

        Ok(report)
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.interpreter.should_beep()
    }

    /// Set the state of a key on the keypad.
    pub fn set_key(&mut self, key: u4, pressed: bool) {
        self.interpreter.set_key(key, pressed)
    }

    pub fn set_keys(&mut self, keys: &[bool; KEY_COUNT]) {
        self.interpreter.set_keys(keys)
    }

    pub fn config(&self) -> RunnerConfig {
        self.config
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn interpreter_mut(&mut self) -> &mut Interpreter {
        &mut self.interpreter
    }
}
