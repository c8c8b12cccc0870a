//! Real-time synthesis and output.
//!
//! Wraps rustysynth behind a shared handle and feeds the output device
//! through a pull-based rodio source. Every rendered block is interleaved
//! once and mirrored into the recorder before it reaches the device, so a
//! capture is sample-identical to what was heard.

use crate::audio::recorder::Recorder;
use crate::midi::KEYBOARD_CHANNEL;
use rodio::{OutputStream, OutputStreamHandle, Source};
use rustysynth::{SoundFont, Synthesizer, SynthesizerSettings};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;

/// Sample rate for audio synthesis (44.1 kHz standard).
pub const SAMPLE_RATE: u32 = 44100;

/// Frames rendered per synthesizer call.
/// Smaller = lower latency but higher CPU usage.
const BUFFER_SIZE: usize = 256;

/// MIDI control-change number for the reverb send level.
const CC_REVERB_SEND: i32 = 91;

/// Why the audio stack failed to come up.
///
/// All of these leave the engine inert: the caller reports the failure and
/// keeps running with an empty instrument set.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("SoundFont not found: {0}")]
    SoundFontMissing(PathBuf),
    #[error("Failed to load SoundFont {path}: {reason}")]
    SoundFontInvalid { path: PathBuf, reason: String },
    #[error("Audio output unavailable: {0}")]
    OutputUnavailable(String),
}

/// Audio source that generates samples from the synthesizer.
/// Implements rodio's Source trait; the device pulls, we render.
struct SynthSource {
    synth: Arc<Mutex<Synthesizer>>,
    recorder: Arc<Recorder>,
    left_buf: Vec<f32>,
    right_buf: Vec<f32>,
    /// Interleaved copy of the last rendered block: L, R, L, R, ...
    interleaved: Vec<f32>,
    /// Read position within `interleaved`.
    pos: usize,
}

impl SynthSource {
    fn new(synth: Arc<Mutex<Synthesizer>>, recorder: Arc<Recorder>) -> Self {
        Self {
            synth,
            recorder,
            left_buf: vec![0.0; BUFFER_SIZE],
            right_buf: vec![0.0; BUFFER_SIZE],
            interleaved: vec![0.0; BUFFER_SIZE * 2],
            // Start at the end to trigger the first render.
            pos: BUFFER_SIZE * 2,
        }
    }

    /// Renders the next block, interleaves it, and mirrors it into the
    /// recorder. The synthesizer fills with silence when no notes sound,
    /// so the source never underruns.
    fn refill(&mut self) {
        if let Ok(mut synth) = self.synth.lock() {
            synth.render(&mut self.left_buf, &mut self.right_buf);
        } else {
            self.left_buf.fill(0.0);
            self.right_buf.fill(0.0);
        }

        for i in 0..BUFFER_SIZE {
            self.interleaved[i * 2] = self.left_buf[i];
            self.interleaved[i * 2 + 1] = self.right_buf[i];
        }

        // One recorder call per block; inside it the lock is held for the
        // buffered writes only.
        self.recorder.write_block(&self.interleaved);
        self.pos = 0;
    }
}

impl Iterator for SynthSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.pos >= self.interleaved.len() {
            self.refill();
        }
        let sample = self.interleaved[self.pos];
        self.pos += 1;
        Some(sample)
    }
}

impl Source for SynthSource {
    fn current_frame_len(&self) -> Option<usize> {
        None // Continuous stream
    }

    fn channels(&self) -> u16 {
        2 // Stereo
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        None // Infinite stream
    }
}

/// The live audio stack: synthesizer, output stream, and recording tap.
pub struct AudioEngine {
    /// The synthesizer (shared with the render source, metronome ticks,
    /// and the external MIDI bridge; the mutex serializes all of them).
    synth: Arc<Mutex<Synthesizer>>,
    /// Audio output stream (must be kept alive).
    _stream: OutputStream,
    /// Output handle, cloneable for side channels like metronome clicks.
    stream_handle: OutputStreamHandle,
    /// (program, name) pairs extracted from the SoundFont's bank-0 presets,
    /// immutable for the session.
    presets: Vec<(u8, String)>,
}

impl std::fmt::Debug for AudioEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioEngine")
            .field("presets", &self.presets)
            .finish_non_exhaustive()
    }
}

impl AudioEngine {
    /// Creates the audio stack from a SoundFont file and starts playback.
    ///
    /// # Errors
    ///
    /// Returns [`AudioError`] if the SoundFont is missing or invalid, or
    /// the output device cannot be opened.
    pub fn new<P: AsRef<Path>>(soundfont_path: P, recorder: Arc<Recorder>) -> Result<Self, AudioError> {
        let path = soundfont_path.as_ref();
        if !path.exists() {
            return Err(AudioError::SoundFontMissing(path.to_path_buf()));
        }

        let mut file = BufReader::new(File::open(path).map_err(|e| AudioError::SoundFontInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?);
        let soundfont =
            Arc::new(
                SoundFont::new(&mut file).map_err(|e| AudioError::SoundFontInvalid {
                    path: path.to_path_buf(),
                    reason: format!("{:?}", e),
                })?,
            );

        let presets = extract_presets(&soundfont);

        let settings = SynthesizerSettings::new(SAMPLE_RATE as i32);
        let synth = Synthesizer::new(&soundfont, &settings).map_err(|e| {
            AudioError::SoundFontInvalid {
                path: path.to_path_buf(),
                reason: format!("{:?}", e),
            }
        })?;
        let synth = Arc::new(Mutex::new(synth));

        let (stream, stream_handle) =
            OutputStream::try_default().map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;

        let source = SynthSource::new(Arc::clone(&synth), recorder);
        stream_handle
            .play_raw(source)
            .map_err(|e| AudioError::OutputUnavailable(e.to_string()))?;

        Ok(Self {
            synth,
            _stream: stream,
            stream_handle,
            presets,
        })
    }

    /// The (program, name) pairs available in the loaded SoundFont.
    pub fn presets(&self) -> &[(u8, String)] {
        &self.presets
    }

    /// Starts a note on the keyboard channel.
    pub fn note_on(&self, note: u8, velocity: u8) {
        if let Ok(mut synth) = self.synth.lock() {
            synth.note_on(KEYBOARD_CHANNEL as i32, note as i32, velocity as i32);
        }
    }

    /// Stops a note on the keyboard channel.
    pub fn note_off(&self, note: u8) {
        if let Ok(mut synth) = self.synth.lock() {
            synth.note_off(KEYBOARD_CHANNEL as i32, note as i32);
        }
    }

    /// Selects the instrument for subsequent keyboard notes.
    pub fn set_program(&self, program: u8) {
        if let Ok(mut synth) = self.synth.lock() {
            // Program change is MIDI command 0xC0
            synth.process_midi_message(KEYBOARD_CHANNEL as i32, 0xC0, program as i32, 0);
        }
    }

    /// Sets the reverb send level (0-127) on the keyboard channel.
    pub fn set_reverb(&self, level: u8) {
        if let Ok(mut synth) = self.synth.lock() {
            synth.process_midi_message(KEYBOARD_CHANNEL as i32, 0xB0, CC_REVERB_SEND, level as i32);
        }
    }

    /// Shared synthesizer handle for collaborators (metronome fallback
    /// ticks, external MIDI input).
    pub fn synth_handle(&self) -> Arc<Mutex<Synthesizer>> {
        Arc::clone(&self.synth)
    }

    /// Output handle for playing side sounds outside the render path.
    pub fn output_handle(&self) -> OutputStreamHandle {
        self.stream_handle.clone()
    }
}

/// Extracts (program, name) pairs from the SoundFont's bank-0 presets.
///
/// Only bank 0 (the General MIDI bank) feeds the instrument list; other
/// banks are reachable over the external MIDI bridge but not from the
/// keyboard UI.
fn extract_presets(soundfont: &SoundFont) -> Vec<(u8, String)> {
    let mut presets: Vec<(u8, String)> = soundfont
        .get_presets()
        .iter()
        .filter(|p| p.get_bank_number() == 0 && (0..128).contains(&p.get_patch_number()))
        .map(|p| (p.get_patch_number() as u8, p.get_name().to_string()))
        .collect();
    presets.sort_by_key(|(program, _)| *program);
    presets.dedup_by_key(|(program, _)| *program);
    presets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore] // Requires a SoundFont file and an audio device
    fn test_engine_startup() {
        let recorder = Arc::new(Recorder::new());
        let engine = AudioEngine::new("assets/TimGM6mb.sf2", recorder).unwrap();
        assert!(!engine.presets().is_empty());
        engine.note_on(60, 100);
        std::thread::sleep(Duration::from_millis(200));
        engine.note_off(60);
    }

    #[test]
    fn test_missing_soundfont_is_classified() {
        let recorder = Arc::new(Recorder::new());
        let err = AudioEngine::new("/no/such/file.sf2", recorder).unwrap_err();
        assert!(matches!(err, AudioError::SoundFontMissing(_)));
    }
}
