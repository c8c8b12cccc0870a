//! The performance engine.
//!
//! One `PianoEngine` owns every piece of mutable performance state: the
//! pressed/sustained note accounting, the active instrument, the
//! metronome, the recording session, and the optional external MIDI
//! bridge. Input adapters call command methods; observable state changes
//! go out as [`EngineEvent`]s on a channel the display collaborator
//! drains, keeping the core free of any presentation knowledge.
//!
//! When the audio stack fails to come up the engine stays alive but
//! inert: the instrument set is empty and no note or render commands are
//! produced, while navigation and notifications keep working.

pub mod instruments;
pub mod keyboard;

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use crate::audio::metronome::{is_valid_bpm, ClickSounds, Metronome};
use crate::audio::recorder::{default_recording_path, Recorder};
use crate::audio::AudioEngine;
use crate::config::{Config, CONFIG_FILE, FAVORITE_SLOTS};
use crate::midi::{KeyId, MidiInputBridge};

pub use instruments::InstrumentSet;
pub use keyboard::KeyboardState;

/// Velocity for keyboard-played notes.
pub const DEFAULT_VELOCITY: u8 = 100;

/// Reverb adjustment step per command.
pub const REVERB_STEP: i16 = 10;

/// Observable state changes, consumed by display/announcement sinks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    InstrumentChanged { id: u8, name: String },
    OctaveChanged(i8),
    TransposeChanged(i8),
    NavigationReset,
    SustainChanged(bool),
    /// Reverb send as a percentage of full scale.
    ReverbChanged(u8),
    MetronomeStarted(u32),
    MetronomeStopped,
    RecordingStarted(PathBuf),
    RecordingStopped(PathBuf),
    RecordingAborted,
    FavoriteSaved(usize),
    FavoriteLoaded { slot: usize, id: u8 },
    /// A command could not be honored; the payload is user-facing text.
    Unavailable(String),
    /// A reportable failure (audio init, recording I/O).
    EngineError(String),
}

/// Read-only view of the engine for rendering.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub audio_ready: bool,
    pub instrument: u8,
    pub instrument_name: String,
    pub base_octave: u8,
    pub display_octave: i8,
    pub transpose: i8,
    pub sustain: bool,
    pub reverb_percent: u8,
    pub metronome_on: bool,
    pub bpm: u32,
    pub recording: bool,
    /// Name of the attached external MIDI port, if any.
    pub midi_port: Option<String>,
    pub pressed_keys: Vec<KeyId>,
}

/// The engine object handed to every input adapter and collaborator.
pub struct PianoEngine {
    audio: Option<AudioEngine>,
    metronome: Option<Metronome>,
    midi_input: Option<MidiInputBridge>,
    keyboard: KeyboardState,
    instruments: InstrumentSet,
    current_instrument: u8,
    reverb_level: u8,
    recorder: Arc<Recorder>,
    config: Config,
    config_path: PathBuf,
    events: mpsc::Sender<EngineEvent>,
}

impl PianoEngine {
    /// Builds the engine, bringing up the audio stack when a SoundFont is
    /// available.
    ///
    /// Audio failures are reported as an [`EngineEvent::EngineError`] and
    /// leave the engine inert rather than failing construction.
    pub fn new(
        soundfont: Option<&Path>,
        config: Config,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let recorder = Arc::new(Recorder::new());
        let mut engine = Self {
            audio: None,
            metronome: None,
            midi_input: None,
            keyboard: KeyboardState::new(),
            instruments: InstrumentSet::empty(),
            current_instrument: 0,
            reverb_level: 0,
            recorder,
            config,
            config_path: PathBuf::from(CONFIG_FILE),
            events,
        };

        match soundfont {
            Some(path) => match AudioEngine::new(path, Arc::clone(&engine.recorder)) {
                Ok(audio) => engine.attach_audio(audio),
                Err(e) => {
                    tracing::error!("Audio startup failed: {}", e);
                    engine.emit(EngineEvent::EngineError(format!(
                        "Audio unavailable: {}",
                        e
                    )));
                }
            },
            None => {
                engine.emit(EngineEvent::EngineError(
                    "No SoundFont (.sf2) found; keyboard is muted".to_string(),
                ));
            }
        }

        engine
    }

    /// Wires a live audio stack into the engine: instrument set,
    /// metronome resources, startup program, and the configured external
    /// MIDI device.
    fn attach_audio(&mut self, audio: AudioEngine) {
        self.instruments = InstrumentSet::from_entries(audio.presets().iter().cloned());
        if self.instruments.is_empty() {
            // Selection stays inert; notes still play on whatever the
            // synthesizer defaults to.
            tracing::warn!("SoundFont has no bank-0 presets");
        } else {
            tracing::info!("Loaded {} instruments", self.instruments.len());
        }
        self.metronome = Some(Metronome::new(
            audio.synth_handle(),
            audio.output_handle(),
            ClickSounds::load_default(),
        ));
        self.audio = Some(audio);

        let start = if self.instruments.contains(0) {
            Some(0)
        } else {
            self.instruments.first_id()
        };
        if let Some(id) = start {
            self.set_instrument(id, true);
        }

        let midi_index = self.config.midi_input;
        self.connect_midi_input(midi_index);
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events.send(event);
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save_to(&self.config_path) {
            tracing::warn!("Failed to save config: {:#}", e);
            self.emit(EngineEvent::EngineError("Could not save settings".to_string()));
        }
    }

    // --- Note input -----------------------------------------------------

    /// Handles a physical key press. Duplicate presses while held are
    /// ignored by the keyboard state.
    pub fn key_down(&mut self, key: KeyId) {
        let Some(audio) = &self.audio else { return };
        if let Some(note) = self.keyboard.key_down(key) {
            audio.note_on(note, DEFAULT_VELOCITY);
        }
    }

    /// Handles a physical key release; the pedal may defer the note-off.
    pub fn key_up(&mut self, key: KeyId) {
        let Some(audio) = &self.audio else { return };
        if let Some(note) = self.keyboard.key_up(key) {
            audio.note_off(note);
        }
    }

    /// Sets the sustain pedal. Releasing it turns off every deferred note
    /// exactly once.
    pub fn set_sustain(&mut self, active: bool) {
        if active == self.keyboard.sustain_active() {
            return;
        }
        let released = self.keyboard.set_sustain(active);
        if let Some(audio) = &self.audio {
            for note in released {
                audio.note_off(note);
            }
        }
        self.emit(EngineEvent::SustainChanged(active));
    }

    // --- Navigation -----------------------------------------------------

    /// Shifts the octave base; sounding notes are unaffected.
    pub fn change_octave(&mut self, delta: i16) {
        self.keyboard.change_octave(delta);
        self.emit(EngineEvent::OctaveChanged(self.keyboard.display_octave()));
    }

    /// Shifts the transpose offset, clamped to one octave either way.
    pub fn change_transpose(&mut self, delta: i16) {
        let transpose = self.keyboard.change_transpose(delta);
        self.emit(EngineEvent::TransposeChanged(transpose));
    }

    /// Restores the default octave and zero transpose.
    pub fn reset_navigation(&mut self) {
        self.keyboard.reset_navigation();
        self.emit(EngineEvent::NavigationReset);
    }

    /// Nudges the reverb send and forwards the new level.
    pub fn adjust_reverb(&mut self, delta: i16) {
        let Some(audio) = &self.audio else { return };
        self.reverb_level = (self.reverb_level as i16 + delta).clamp(0, 127) as u8;
        audio.set_reverb(self.reverb_level);
        self.emit(EngineEvent::ReverbChanged(self.reverb_percent()));
    }

    fn reverb_percent(&self) -> u8 {
        ((self.reverb_level as f32 / 127.0) * 100.0).round() as u8
    }

    // --- Instruments ----------------------------------------------------

    /// Selects an instrument, substituting the lowest available id for
    /// anything outside the set. `silent` suppresses the notification
    /// (used for the startup program).
    pub fn set_instrument(&mut self, id: u8, silent: bool) {
        let Some(resolved) = self.instruments.resolve(id) else {
            return;
        };
        self.current_instrument = resolved;
        if let Some(audio) = &self.audio {
            audio.set_program(resolved);
        }
        if !silent {
            self.emit(EngineEvent::InstrumentChanged {
                id: resolved,
                name: self.instrument_name(resolved),
            });
        }
    }

    /// Steps through the sorted instrument list, wrapping at the ends.
    pub fn change_instrument(&mut self, delta: i32) {
        let Some(next) = self.instruments.step_from(self.current_instrument, delta) else {
            return;
        };
        self.set_instrument(next, false);
    }

    fn instrument_name(&self, id: u8) -> String {
        self.instruments
            .name(id)
            .unwrap_or("Unknown")
            .to_string()
    }

    // --- Favorites ------------------------------------------------------

    /// Stores the current instrument in a favorite slot and persists it.
    pub fn save_favorite(&mut self, slot: usize) {
        if slot >= FAVORITE_SLOTS {
            self.emit(EngineEvent::Unavailable(format!("No favorite slot {}", slot)));
            return;
        }
        self.config.favorites[slot] = self.current_instrument;
        self.save_config();
        self.emit(EngineEvent::FavoriteSaved(slot));
    }

    /// Recalls a favorite slot; an empty or invalid slot changes nothing.
    pub fn load_favorite(&mut self, slot: usize) {
        if slot >= FAVORITE_SLOTS {
            self.emit(EngineEvent::Unavailable(format!("No favorite slot {}", slot)));
            return;
        }
        let id = self.config.favorites[slot];
        if self.instruments.contains(id) {
            self.set_instrument(id, false);
            self.emit(EngineEvent::FavoriteLoaded { slot, id });
        } else {
            self.emit(EngineEvent::Unavailable(format!("Favorite {} is empty", slot)));
        }
    }

    // --- Metronome ------------------------------------------------------

    /// Starts the metronome, replacing any running schedule.
    pub fn start_metronome(&mut self, bpm: u32) {
        if !is_valid_bpm(bpm) {
            self.emit(EngineEvent::Unavailable(format!("Invalid tempo: {}", bpm)));
            return;
        }
        let Some(metronome) = &mut self.metronome else {
            self.emit(EngineEvent::Unavailable("Metronome unavailable".to_string()));
            return;
        };
        metronome.start(bpm);
        self.emit(EngineEvent::MetronomeStarted(bpm));
    }

    /// Stops the metronome; an in-flight click finishes on its own.
    pub fn stop_metronome(&mut self) {
        if let Some(metronome) = &mut self.metronome {
            if metronome.is_running() {
                metronome.stop();
                self.emit(EngineEvent::MetronomeStopped);
            }
        }
    }

    pub fn metronome_running(&self) -> bool {
        self.metronome.as_ref().is_some_and(Metronome::is_running)
    }

    /// The last tempo used, for pre-filling the tempo prompt.
    pub fn bpm(&self) -> u32 {
        self.metronome.as_ref().map_or(120, Metronome::bpm)
    }

    // --- Recording ------------------------------------------------------

    /// Starts capturing to a fresh file in the configured directory.
    pub fn start_recording(&mut self) {
        if self.audio.is_none() {
            self.emit(EngineEvent::Unavailable("Recording unavailable".to_string()));
            return;
        }
        let path = default_recording_path(&self.config.recording_dir());
        match self.recorder.start(path.clone()) {
            Ok(()) => self.emit(EngineEvent::RecordingStarted(path)),
            Err(e) => {
                tracing::warn!("Recording start failed: {:#}", e);
                self.emit(EngineEvent::EngineError(format!(
                    "Could not start recording: {}",
                    path.display()
                )));
            }
        }
    }

    /// Stops the capture and finalizes the file.
    pub fn stop_recording(&mut self) {
        if let Some(path) = self.recorder.stop() {
            self.emit(EngineEvent::RecordingStopped(path));
        }
    }

    /// Stops the capture and deletes the file.
    pub fn abort_recording(&mut self) {
        if self.recorder.abort().is_some() {
            self.emit(EngineEvent::RecordingAborted);
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recorder.is_active()
    }

    // --- External MIDI --------------------------------------------------

    /// Attaches the external MIDI device at `index` to the synthesizer.
    /// A bad index or connection failure leaves no bridge attached.
    pub fn connect_midi_input(&mut self, index: usize) {
        let Some(audio) = &self.audio else { return };
        self.midi_input = match MidiInputBridge::connect(index, audio.synth_handle()) {
            Ok(bridge) => {
                tracing::info!("External MIDI attached: {} ({})", index, bridge.port_name());
                Some(bridge)
            }
            Err(e) => {
                tracing::debug!("MIDI input {} not attached: {}", index, e);
                None
            }
        };
    }

    // --- Queries --------------------------------------------------------

    /// Read-only state for the display collaborator.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            audio_ready: self.audio.is_some(),
            instrument: self.current_instrument,
            instrument_name: self.instrument_name(self.current_instrument),
            base_octave: self.keyboard.base_octave(),
            display_octave: self.keyboard.display_octave(),
            transpose: self.keyboard.transpose(),
            sustain: self.keyboard.sustain_active(),
            reverb_percent: self.reverb_percent(),
            metronome_on: self.metronome_running(),
            bpm: self.bpm(),
            recording: self.is_recording(),
            midi_port: self
                .midi_input
                .as_ref()
                .map(|bridge| bridge.port_name().to_string()),
            pressed_keys: self.keyboard.pressed_keys().collect(),
        }
    }
}

impl Drop for PianoEngine {
    fn drop(&mut self) {
        // A capture left running when the app closes is still a valid file.
        self.stop_recording();
        if let Some(metronome) = &mut self.metronome {
            metronome.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An inert engine with an injected instrument set: the selection,
    /// favorites, and notification paths without audio hardware.
    fn test_engine(instruments: InstrumentSet) -> (PianoEngine, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel();
        let mut engine = PianoEngine::new(None, Config::default(), tx);
        // Drain the startup "no soundfont" report.
        while rx.try_recv().is_ok() {}
        engine.instruments = instruments;
        engine.config_path = std::env::temp_dir().join(format!(
            "pianotui_engine_test_{}.json",
            std::process::id()
        ));
        (engine, rx)
    }

    fn sample_set() -> InstrumentSet {
        InstrumentSet::from_entries([
            (0, "Grand Piano".to_string()),
            (24, "Nylon Guitar".to_string()),
            (73, "Flute".to_string()),
        ])
    }

    #[test]
    fn test_change_instrument_wraps() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_instrument(73, true);

        engine.change_instrument(1);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::InstrumentChanged {
                id: 0,
                name: "Grand Piano".to_string()
            }
        );

        engine.change_instrument(-1);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::InstrumentChanged {
                id: 73,
                name: "Flute".to_string()
            }
        );
    }

    #[test]
    fn test_set_unknown_instrument_resolves_to_lowest() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_instrument(99, false);
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::InstrumentChanged {
                id: 0,
                name: "Grand Piano".to_string()
            }
        );
        assert_eq!(engine.snapshot().instrument, 0);
    }

    #[test]
    fn test_silent_selection_emits_nothing() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_instrument(24, true);
        assert!(rx.try_recv().is_err());
        assert_eq!(engine.snapshot().instrument, 24);
    }

    #[test]
    fn test_load_empty_favorite_changes_nothing() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_instrument(73, true);
        // Slot 4 holds the default id 0, which is valid here; point it at
        // an id outside the set instead.
        engine.config.favorites[4] = 55;

        engine.load_favorite(4);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Unavailable(_)
        ));
        assert_eq!(engine.snapshot().instrument, 73);
    }

    #[test]
    fn test_save_and_load_favorite() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_instrument(24, true);

        engine.save_favorite(7);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::FavoriteSaved(7));

        engine.set_instrument(0, true);
        engine.load_favorite(7);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::InstrumentChanged { id: 24, .. }
        ));
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::FavoriteLoaded { slot: 7, id: 24 }
        );

        std::fs::remove_file(&engine.config_path).ok();
    }

    #[test]
    fn test_out_of_range_slot_rejected() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.save_favorite(10);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Unavailable(_)
        ));
        engine.load_favorite(10);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Unavailable(_)
        ));
    }

    #[test]
    fn test_inert_engine_ignores_notes() {
        let (mut engine, rx) = test_engine(InstrumentSet::empty());
        engine.key_down(KeyId::Char('z'));
        engine.key_up(KeyId::Char('z'));
        engine.change_instrument(1);
        assert!(rx.try_recv().is_err());
        assert!(engine.snapshot().pressed_keys.is_empty());
    }

    #[test]
    fn test_navigation_events() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.change_octave(12);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::OctaveChanged(4));
        engine.change_transpose(-1);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::TransposeChanged(-1));
        engine.reset_navigation();
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::NavigationReset);
        assert_eq!(engine.snapshot().base_octave, 48);
    }

    #[test]
    fn test_sustain_events_deduplicate() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.set_sustain(true);
        engine.set_sustain(true);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::SustainChanged(true));
        assert!(rx.try_recv().is_err());
        engine.set_sustain(false);
        assert_eq!(rx.try_recv().unwrap(), EngineEvent::SustainChanged(false));
    }

    #[test]
    fn test_invalid_bpm_rejected() {
        let (mut engine, rx) = test_engine(sample_set());
        engine.start_metronome(0);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Unavailable(_)
        ));
        engine.start_metronome(500);
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Unavailable(_)
        ));
        assert!(!engine.metronome_running());
    }
}
