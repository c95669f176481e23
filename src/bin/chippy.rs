use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

use anyhow::Context;
use clap::Parser;
use clap_num::{maybe_hex, number_range};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use log::{info, warn};
use ratatui::{
    DefaultTerminal, Frame,
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Paragraph, Widget},
};
use rodio::{OutputStream, OutputStreamBuilder, Sink, Source, source::SquareWave};

use chippy::{DISPLAY_HEIGHT, DISPLAY_WIDTH, Interpreter, Runner, RunnerConfig, runner, u4};

/// Mapping from the conventional 4x4 keyboard block to the CHIP-8 hex keypad (0x0-0xF).
const KEY_MAP: [KeyCode; 16] = [
    KeyCode::Char('x'), // 0x0
    KeyCode::Char('1'), // 0x1
    KeyCode::Char('2'), // 0x2
    KeyCode::Char('3'), // 0x3
    KeyCode::Char('q'), // 0x4
    KeyCode::Char('w'), // 0x5
    KeyCode::Char('e'), // 0x6
    KeyCode::Char('a'), // 0x7
    KeyCode::Char('s'), // 0x8
    KeyCode::Char('d'), // 0x9
    KeyCode::Char('z'), // 0xA
    KeyCode::Char('c'), // 0xB
    KeyCode::Char('4'), // 0xC
    KeyCode::Char('r'), // 0xD
    KeyCode::Char('f'), // 0xE
    KeyCode::Char('v'), // 0xF
];

// Key release events are not fired in terminals on Linux.
// To handle this, we implement a timeout after which we consider a key released.
const KEY_RELEASE_TIMEOUT: Duration = Duration::from_millis(100);

const FRAME_DURATION: Duration = Duration::from_nanos(1_000_000_000 / runner::TIMER_HZ as u64);

/// Square wave played while the sound timer is running.
struct Tone {
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    sink: Sink,
}

impl Tone {
    fn open(frequency: f32) -> anyhow::Result<Self> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .context("Failed to open audio output stream")?;
        stream.log_on_drop(false);

        let sink = Sink::connect_new(stream.mixer());
        sink.pause();
        sink.append(SquareWave::new(frequency).amplify(0.25));

        Ok(Self {
            _stream: stream,
            sink,
        })
    }

    fn set_playing(&self, playing: bool) {
        if playing {
            self.sink.play();
        } else {
            self.sink.pause();
        }
    }
}

struct App {
    runner: Runner,
    rom: Vec<u8>,
    rom_name: String,
    tone: Option<Tone>,
    should_quit: bool,
    last_tick: Instant,
    key_press_times: [Option<Instant>; 16],
}

impl App {
    fn new(args: &Args, rom: Vec<u8>) -> anyhow::Result<Self> {
        let mut interpreter = match args.seed {
            Some(seed) => Interpreter::new_with_seed(seed),
            None => Interpreter::new(),
        };
        interpreter
            .load_program(&rom)
            .context("Failed to load ROM into CHIP-8 memory")?;

        let config = RunnerConfig {
            cycles_per_frame: args.cycles_per_frame,
        };

        let tone = if args.mute {
            None
        } else {
            match Tone::open(args.tone) {
                Ok(tone) => Some(tone),
                Err(e) => {
                    warn!("Running without sound: {e:#}");
                    None
                }
            }
        };

        Ok(Self {
            runner: Runner::new(interpreter, config),
            rom,
            rom_name: args
                .rom_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default(),
            tone,
            should_quit: false,
            last_tick: Instant::now(),
            key_press_times: [None; 16],
        })
    }

    fn run(&mut self, terminal: &mut DefaultTerminal) -> anyhow::Result<()> {
        while !self.should_quit {
            let dt = self.last_tick.elapsed().as_secs_f32();
            self.last_tick = Instant::now();

            self.runner.update(dt).context("CHIP-8 execution error")?;

            if let Some(tone) = &self.tone {
                tone.set_playing(self.runner.should_beep());
            }

            terminal.draw(|frame| self.draw(frame))?;

            self.check_key_timeout();

            if event::poll(FRAME_DURATION)? {
                while !self.should_quit {
                    if let Event::Key(key) = event::read()? {
                        self.handle_key_event(key)?;
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    fn draw(&self, frame: &mut Frame) {
        frame.render_widget(self, frame.area());
    }

    fn check_key_timeout(&mut self) {
        let now = Instant::now();

        for (idx, press_time) in self.key_press_times.iter_mut().enumerate() {
            if let Some(time) = press_time {
                if now.duration_since(*time) > KEY_RELEASE_TIMEOUT {
                    *press_time = None;
                    self.runner.set_key(u4::new(idx as u8), false);
                }
            }
        }
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> anyhow::Result<()> {
        // Handle Ctrl+C globally
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return Ok(());
        }

        match key.code {
            KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Backspace if key.kind == KeyEventKind::Press => {
                self.restart()?;
            }
            code => {
                if let Some(idx) = KEY_MAP.iter().position(|&k| k == code) {
                    let pressed = key.kind != KeyEventKind::Release;
                    self.runner.set_key(u4::new(idx as u8), pressed);
                    self.key_press_times[idx] = pressed.then(Instant::now);
                }
            }
        }

        Ok(())
    }

    fn restart(&mut self) -> anyhow::Result<()> {
        let interpreter = self.runner.interpreter_mut();
        interpreter.reset();
        interpreter
            .load_program(&self.rom)
            .context("Failed to reload ROM after reset")?;
        self.key_press_times = [None; 16];
        info!("Restarted {}", self.rom_name);
        Ok(())
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Two display rows share one terminal cell
        const SCREEN_ROWS: u16 = DISPLAY_HEIGHT as u16 / 2;
        const MIN_WIDTH: u16 = DISPLAY_WIDTH as u16 + 2;
        const MIN_HEIGHT: u16 = SCREEN_ROWS + 2 + 1;

        if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
            Paragraph::new(format!(
                "Terminal is too small ({}x{} min)",
                MIN_WIDTH, MIN_HEIGHT
            ))
            .style(Style::default().fg(Color::Red))
            .alignment(Alignment::Center)
            .render(area, buf);

            return;
        }

        let [display, status] = Layout::vertical([
            Constraint::Length(SCREEN_ROWS + 2),
            Constraint::Length(1),
        ])
        .areas(area);

        self.render_display(display, buf);
        self.render_status(status, buf);
    }
}

impl App {
    fn render_display(&self, area: Rect, buf: &mut Buffer) {
        let chip = self.runner.interpreter();
        let text: Vec<Line> = (0..DISPLAY_HEIGHT)
            .step_by(2)
            .map(|y| {
                let row: String = (0..DISPLAY_WIDTH)
                    .map(|x| match (chip.pixel(x, y), chip.pixel(x, y + 1)) {
                        (true, true) => '█',
                        (true, false) => '▀',
                        (false, true) => '▄',
                        (false, false) => ' ',
                    })
                    .collect();
                Line::from(row).green()
            })
            .collect();

        Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::bordered().title(format!(" {} ", self.rom_name)))
            .render(area, buf);
    }

    fn render_status(&self, area: Rect, buf: &mut Buffer) {
        let chip = self.runner.interpreter();
        let status = format!(
            "PC {:03X}  I {:03X}  DT {:02X}  ST {:02X}  |  Esc quit, Backspace reset",
            chip.program_counter(),
            chip.index_register(),
            chip.delay_timer(),
            chip.sound_timer()
        );

        Paragraph::new(status)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .render(area, buf);
    }
}

fn cycles_in_range(s: &str) -> Result<u32, String> {
    number_range(s, 1, 1000)
}

/// CHIP-8 interpreter for the terminal.
///
/// Keys 1-4, Q-R, A-F, Z-V map to CHIP-8 keys.
/// Escape exits, Backspace restarts the ROM.
/// Set RUST_LOG to see interpreter logs on stderr.
#[derive(Parser, Debug)]
#[command(about, version)]
struct Args {
    /// Path to the CHIP-8 ROM file
    rom_path: PathBuf,

    /// Instructions executed per 60Hz frame
    #[arg(long, default_value_t = RunnerConfig::default().cycles_per_frame, value_parser = cycles_in_range)]
    cycles_per_frame: u32,

    /// Seed for the random number instruction, decimal or 0x-prefixed hex
    #[arg(long, value_parser = maybe_hex::<u64>)]
    seed: Option<u64>,

    /// Never play the sound timer tone
    #[arg(long)]
    mute: bool,

    /// Frequency of the sound timer tone in Hz
    #[arg(long, default_value_t = 440.0)]
    tone: f32,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();

    let rom = std::fs::read(&args.rom_path).context("Failed to read ROM file")?;
    let mut app = App::new(&args, rom).context("Failed to initialize application")?;

    let mut terminal = ratatui::init();
    let app_result = app.run(&mut terminal);
    ratatui::restore();

    app_result
}
