//! Application state and event handling.
//!
//! `App` sits between the terminal and the engine: it routes key events
//! into engine commands, drains engine events into the status line, and
//! owns the purely visual state (dialogs, help overlay).

use crate::engine::{EngineEvent, PianoEngine, REVERB_STEP};
use crate::midi::KeyId;
use crossterm::event::{KeyCode, KeyModifiers};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// How long a status message stays on screen.
const STATUS_DURATION: Duration = Duration::from_secs(2);

/// State for the BPM entry dialog.
#[derive(Debug, Clone, Default)]
pub struct BpmDialogState {
    /// Whether the dialog is open.
    pub open: bool,
    /// The tempo text being edited.
    pub input: String,
}

/// Top-level application state.
pub struct App {
    /// The performance engine; all commands go through it.
    pub engine: PianoEngine,
    /// Engine state-change notifications, drained every frame.
    events: mpsc::Receiver<EngineEvent>,
    /// Current status message and when it was set.
    pub status_message: Option<(String, Instant)>,
    /// BPM prompt shown when switching the metronome on.
    pub bpm_dialog: BpmDialogState,
    /// Whether the help overlay is visible.
    pub help_visible: bool,
    /// Scroll offset within the help overlay.
    pub help_scroll: u16,
    /// Set when the user asks to quit.
    pub should_quit: bool,
}

impl App {
    pub fn new(engine: PianoEngine, events: mpsc::Receiver<EngineEvent>) -> Self {
        Self {
            engine,
            events,
            status_message: None,
            bpm_dialog: BpmDialogState::default(),
            help_visible: false,
            help_scroll: 0,
            should_quit: false,
        }
    }

    /// Sets a status message with the current timestamp.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    /// Clears the status message if it has been displayed long enough.
    pub fn clear_expired_status(&mut self) {
        if let Some((_, time)) = &self.status_message {
            if time.elapsed() > STATUS_DURATION {
                self.status_message = None;
            }
        }
    }

    /// Drains pending engine events into the status line.
    ///
    /// This is the display/announcement sink: each event becomes one line
    /// of user-facing text.
    pub fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            let text = match event {
                EngineEvent::InstrumentChanged { id, name } => format!("{:03}: {}", id, name),
                EngineEvent::OctaveChanged(octave) => format!("Octave {}", octave),
                EngineEvent::TransposeChanged(transpose) => format!("Transpose {:+}", transpose),
                EngineEvent::NavigationReset => "Octave and transpose reset".to_string(),
                EngineEvent::SustainChanged(true) => "Pedal sustain".to_string(),
                EngineEvent::SustainChanged(false) => "Pedal free".to_string(),
                EngineEvent::ReverbChanged(percent) => format!("Reverb {}%", percent),
                EngineEvent::MetronomeStarted(bpm) => format!("Metronome on ({} BPM)", bpm),
                EngineEvent::MetronomeStopped => "Metronome off".to_string(),
                EngineEvent::RecordingStarted(path) => {
                    format!("Recording to {}", file_name(&path))
                }
                EngineEvent::RecordingStopped(path) => {
                    format!("Recording saved: {}", file_name(&path))
                }
                EngineEvent::RecordingAborted => "Recording discarded".to_string(),
                EngineEvent::FavoriteSaved(slot) => format!("Saved favorite {}", slot),
                EngineEvent::FavoriteLoaded { slot, .. } => format!("Loaded favorite {}", slot),
                EngineEvent::Unavailable(message) => message,
                EngineEvent::EngineError(message) => message,
            };
            self.set_status(text);
        }
    }

    /// Handles a key press. Repeat events are filtered out before they
    /// reach here, so a held piano key never retriggers.
    pub fn handle_key_press(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.help_visible {
            self.handle_help_key(code);
            return;
        }
        if self.bpm_dialog.open {
            self.handle_bpm_dialog_key(code);
            return;
        }

        // Favorites: Ctrl+digit saves, Ctrl+Shift+digit loads.
        if modifiers.contains(KeyModifiers::CONTROL) {
            if let KeyCode::Char(c) = code {
                if let Some(slot) = c.to_digit(10) {
                    if modifiers.contains(KeyModifiers::SHIFT) {
                        self.engine.load_favorite(slot as usize);
                    } else {
                        self.engine.save_favorite(slot as usize);
                    }
                    return;
                }
            }
        }

        match code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::F(10) => {
                self.help_visible = true;
                self.help_scroll = 0;
            }
            KeyCode::Char(' ') => self.engine.set_sustain(true),
            KeyCode::Right => self.engine.change_instrument(1),
            KeyCode::Left => self.engine.change_instrument(-1),
            KeyCode::Up => self.engine.change_octave(12),
            KeyCode::Down => self.engine.change_octave(-12),
            KeyCode::F(1) => self.engine.change_transpose(-1),
            KeyCode::F(2) => self.engine.change_transpose(1),
            KeyCode::F(3) => self.engine.adjust_reverb(-REVERB_STEP),
            KeyCode::F(4) => self.engine.adjust_reverb(REVERB_STEP),
            KeyCode::F(5) => self.toggle_metronome(),
            KeyCode::F(6) => self.toggle_recording(),
            KeyCode::F(7) => self.engine.abort_recording(),
            KeyCode::F(8) => self.engine.reset_navigation(),
            _ => {
                if let Some(key) = key_id_from_code(code) {
                    self.engine.key_down(key);
                }
            }
        }
    }

    /// Handles a key release. Needs a terminal that reports release
    /// events; without them, notes are best played with the pedal down.
    pub fn handle_key_release(&mut self, code: KeyCode) {
        if code == KeyCode::Char(' ') {
            self.engine.set_sustain(false);
            return;
        }
        if let Some(key) = key_id_from_code(code) {
            self.engine.key_up(key);
        }
    }

    fn handle_help_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::F(10) | KeyCode::Esc => {
                self.help_visible = false;
                self.help_scroll = 0;
            }
            KeyCode::Up => self.help_scroll = self.help_scroll.saturating_sub(1),
            KeyCode::Down => self.help_scroll = self.help_scroll.saturating_add(1),
            _ => {}
        }
    }

    fn handle_bpm_dialog_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => {
                let input = self.bpm_dialog.input.clone();
                self.bpm_dialog = BpmDialogState::default();
                match input.parse::<u32>() {
                    Ok(bpm) => self.engine.start_metronome(bpm),
                    Err(_) => self.set_status("Invalid tempo"),
                }
            }
            KeyCode::Esc => self.bpm_dialog = BpmDialogState::default(),
            KeyCode::Backspace => {
                self.bpm_dialog.input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.bpm_dialog.input.len() < 3 {
                    self.bpm_dialog.input.push(c);
                }
            }
            _ => {}
        }
    }

    /// F5: stop the metronome if it runs, otherwise prompt for a tempo.
    fn toggle_metronome(&mut self) {
        if self.engine.metronome_running() {
            self.engine.stop_metronome();
        } else {
            self.bpm_dialog.open = true;
            self.bpm_dialog.input = self.engine.bpm().to_string();
        }
    }

    /// F6: start or stop the recording session.
    fn toggle_recording(&mut self) {
        if self.engine.is_recording() {
            self.engine.stop_recording();
        } else {
            self.engine.start_recording();
        }
    }
}

/// Maps a crossterm key code to an engine key id.
///
/// Characters are normalized to lowercase so shifted letters land on the
/// same note.
fn key_id_from_code(code: KeyCode) -> Option<KeyId> {
    match code {
        KeyCode::Char(c) => Some(KeyId::Char(c.to_ascii_lowercase())),
        KeyCode::Enter => Some(KeyId::Enter),
        KeyCode::Backspace => Some(KeyId::Backspace),
        KeyCode::Delete => Some(KeyId::Delete),
        KeyCode::End => Some(KeyId::End),
        KeyCode::PageUp => Some(KeyId::PageUp),
        KeyCode::PageDown => Some(KeyId::PageDown),
        _ => None,
    }
}

/// Display name of a path, for status messages.
fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("?")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_app() -> App {
        let (tx, rx) = mpsc::channel();
        let engine = PianoEngine::new(None, Config::default(), tx);
        App::new(engine, rx)
    }

    #[test]
    fn test_key_id_mapping() {
        assert_eq!(key_id_from_code(KeyCode::Char('Z')), Some(KeyId::Char('z')));
        assert_eq!(key_id_from_code(KeyCode::Enter), Some(KeyId::Enter));
        assert_eq!(key_id_from_code(KeyCode::F(5)), None);
    }

    #[test]
    fn test_esc_quits() {
        let mut app = test_app();
        app.handle_key_press(KeyCode::Esc, KeyModifiers::NONE);
        assert!(app.should_quit);
    }

    #[test]
    fn test_bpm_dialog_accepts_digits_only() {
        let mut app = test_app();
        app.bpm_dialog.open = true;
        app.handle_key_press(KeyCode::Char('1'), KeyModifiers::NONE);
        app.handle_key_press(KeyCode::Char('x'), KeyModifiers::NONE);
        app.handle_key_press(KeyCode::Char('2'), KeyModifiers::NONE);
        app.handle_key_press(KeyCode::Char('0'), KeyModifiers::NONE);
        // A fourth digit would exceed any valid tempo.
        app.handle_key_press(KeyCode::Char('5'), KeyModifiers::NONE);
        assert_eq!(app.bpm_dialog.input, "120");
    }

    #[test]
    fn test_bpm_dialog_escape_cancels() {
        let mut app = test_app();
        app.bpm_dialog.open = true;
        app.bpm_dialog.input = "90".to_string();
        app.handle_key_press(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.bpm_dialog.open);
        assert!(!app.should_quit);
    }

    #[test]
    fn test_status_expiry() {
        let mut app = test_app();
        app.set_status("hello");
        app.clear_expired_status();
        assert!(app.status_message.is_some());
        app.status_message = Some(("old".to_string(), Instant::now() - Duration::from_secs(3)));
        app.clear_expired_status();
        assert!(app.status_message.is_none());
    }

    #[test]
    fn test_help_overlay_blocks_other_keys() {
        let mut app = test_app();
        app.handle_key_press(KeyCode::F(10), KeyModifiers::NONE);
        assert!(app.help_visible);
        // Esc closes help instead of quitting.
        app.handle_key_press(KeyCode::Esc, KeyModifiers::NONE);
        assert!(!app.help_visible);
        assert!(!app.should_quit);
    }
}
