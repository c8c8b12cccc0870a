//! pianotui - a terminal virtual piano.
//!
//! Turns the computer keyboard into a live instrument: key presses play
//! notes through a SoundFont synthesizer in real time, with a sustain
//! pedal, a metronome, favorite instrument slots, reverb control, WAV
//! recording, and optional input from an external MIDI controller.
//!
//! # Usage
//!
//! ```bash
//! cargo run                        # use the first .sf2 in the working dir
//! cargo run -- -sf path/to/font.sf2
//! cargo run -- --midi-in 1         # attach external MIDI device 1
//! ```
//!
//! Press `F10` for help with keyboard shortcuts.

mod app;
mod audio;
mod config;
mod engine;
mod midi;
mod ui;

use app::App;
use config::Config;
use engine::PianoEngine;

use anyhow::{Context, Result};
use crossterm::event::{
    self, Event, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

/// Command-line options for the application.
struct CliOptions {
    /// Path to a custom SoundFont file.
    soundfont: Option<PathBuf>,
    /// External MIDI input device index, overriding the config.
    midi_input: Option<usize>,
    /// Print the available MIDI input devices and exit.
    list_midi: bool,
}

impl CliOptions {
    /// Parses command-line arguments.
    ///
    /// Supports:
    /// - `--soundfont <path>` or `-sf <path>`: Specify a SoundFont file
    /// - `--midi-in <index>` or `-m <index>`: Attach a MIDI input device
    /// - `--list-midi`: List MIDI input devices and exit
    /// - `--help` or `-h`: Print help and exit
    fn parse() -> Result<Self> {
        let args: Vec<String> = std::env::args().collect();
        let mut soundfont: Option<PathBuf> = None;
        let mut midi_input: Option<usize> = None;
        let mut list_midi = false;
        let mut i = 1;

        while i < args.len() {
            match args[i].as_str() {
                "--soundfont" | "-sf" => {
                    i += 1;
                    if i >= args.len() {
                        eprintln!("Error: --soundfont requires a path argument");
                        std::process::exit(1);
                    }
                    soundfont = Some(PathBuf::from(&args[i]));
                }
                "--midi-in" | "-m" => {
                    i += 1;
                    if i >= args.len() {
                        eprintln!("Error: --midi-in requires a device index");
                        std::process::exit(1);
                    }
                    match args[i].parse::<usize>() {
                        Ok(index) => midi_input = Some(index),
                        Err(_) => {
                            eprintln!("Error: --midi-in expects a number, got {}", args[i]);
                            std::process::exit(1);
                        }
                    }
                }
                "--list-midi" => list_midi = true,
                "--help" | "-h" => {
                    eprintln!("pianotui - Terminal virtual piano");
                    eprintln!();
                    eprintln!(
                        "Usage: {} [OPTIONS]",
                        args.first().unwrap_or(&"pianotui".to_string())
                    );
                    eprintln!();
                    eprintln!("Options:");
                    eprintln!("  -sf, --soundfont PATH  Load a specific SoundFont file (.sf2)");
                    eprintln!("  -m,  --midi-in INDEX   Attach an external MIDI input device");
                    eprintln!("       --list-midi       List MIDI input devices and exit");
                    eprintln!("  -h,  --help            Print this help message");
                    eprintln!();
                    eprintln!(
                        "Without --soundfont, the first .sf2 in the working directory is used."
                    );
                    std::process::exit(0);
                }
                other => {
                    // A bare .sf2 path works as a positional argument
                    if other.ends_with(".sf2") {
                        soundfont = Some(PathBuf::from(other));
                    } else {
                        eprintln!("Unknown option: {}", other);
                        eprintln!("Use --help for usage information");
                        std::process::exit(1);
                    }
                }
            }
            i += 1;
        }

        Ok(Self {
            soundfont,
            midi_input,
            list_midi,
        })
    }
}

/// Picks the SoundFont to load: the CLI choice if it exists, otherwise
/// the first .sf2 in the working directory.
///
/// Returns None when nothing is found; the engine then starts inert and
/// reports the problem instead of exiting.
fn find_soundfont(cli: &CliOptions) -> Option<PathBuf> {
    if let Some(path) = &cli.soundfont {
        if path.exists() {
            return Some(path.clone());
        }
        eprintln!("Warning: Specified soundfont not found: {}", path.display());
    }

    let mut candidates: Vec<PathBuf> = std::fs::read_dir(".")
        .ok()?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("sf2"))
        })
        .collect();
    candidates.sort();

    if candidates.len() > 1 {
        tracing::info!(
            "Multiple SoundFonts found, using {}; pass --soundfont to pick another",
            candidates[0].display()
        );
    }
    candidates.into_iter().next()
}

/// Main entry point.
fn main() -> Result<()> {
    // Parse CLI options first (before any terminal setup)
    let cli = CliOptions::parse()?;

    // Initialize logging (optional, for debugging)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if cli.list_midi {
        let ports = midi::MidiInputBridge::port_names();
        if ports.is_empty() {
            println!("No MIDI input devices found.");
        } else {
            for (index, name) in ports.iter().enumerate() {
                println!("{}: {}", index, name);
            }
        }
        return Ok(());
    }

    let config = Config::load();
    let soundfont = find_soundfont(&cli);

    // The engine reports its own failures over the event channel, so the
    // app comes up (inert) even with no SoundFont or audio device.
    let (event_tx, event_rx) = mpsc::channel();
    let mut engine = PianoEngine::new(soundfont.as_deref(), config, event_tx);
    if let Some(index) = cli.midi_input {
        engine.connect_midi_input(index);
    }

    let mut app = App::new(engine, event_rx);

    let mut terminal = setup_terminal().context("Failed to setup terminal")?;
    let result = run_app(&mut terminal, &mut app);
    restore_terminal(&mut terminal).context("Failed to restore terminal")?;

    result
}

/// Sets up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
    // Key release events need the kitty keyboard protocol. Terminals
    // without it still work, but note-off then only happens through the
    // sustain pedal; best-effort, so the failure is ignored.
    let _ = execute!(
        stdout,
        PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
    );
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend).context("Failed to create terminal")?;
    Ok(terminal)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    let _ = execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags);
    disable_raw_mode().context("Failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("Failed to leave alternate screen")?;
    terminal.show_cursor().context("Failed to show cursor")?;
    Ok(())
}

/// Main application loop.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        app.drain_events();
        app.clear_expired_status();

        terminal.draw(|frame| {
            ui::render(frame, app);

            if app.help_visible {
                ui::render_help(frame, app.help_scroll);
            }

            ui::render_bpm_dialog(frame, app);
        })?;

        // Short timeout so status expiry and engine events stay fresh
        if event::poll(Duration::from_millis(16))? {
            if let Event::Key(key) = event::read()? {
                match key.kind {
                    KeyEventKind::Press => app.handle_key_press(key.code, key.modifiers),
                    KeyEventKind::Release => app.handle_key_release(key.code),
                    // Repeats: holding a piano key must not retrigger it.
                    _ => {}
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}
