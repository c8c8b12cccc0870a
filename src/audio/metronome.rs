//! Metronome: periodic beat generation independent of the render path.
//!
//! A dedicated timer thread fires once per beat. Each tick either plays a
//! pre-loaded click sample through a fire-and-forget output path, or falls
//! back to a percussion note on the synthesizer when no click files were
//! found next to the executable. The beat counter lives inside the tick
//! closure: it is owned by the timer thread and dies with it, so a restart
//! always begins on the accent.

use std::path::Path;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::OutputStreamHandle;
use rustysynth::Synthesizer;

use crate::midi::PERCUSSION_CHANNEL;

/// Beats per bar; beat 0 carries the accent.
pub const BEATS_PER_BAR: u32 = 4;

/// Percussion notes for the synthesizer fallback click.
const ACCENT_NOTE: i32 = 76;
const REGULAR_NOTE: i32 = 77;
const CLICK_VELOCITY: i32 = 100;

/// How long a fallback click rings before its note-off.
const FALLBACK_CLICK_MS: u64 = 100;

/// Click sample files looked up in the working directory at startup.
const ACCENT_FILE: &str = "metronome_accent.wav";
const REGULAR_FILE: &str = "metronome_beat.wav";

/// Whether `bpm` is inside the accepted open interval (0, 500).
pub fn is_valid_bpm(bpm: u32) -> bool {
    bpm > 0 && bpm < 500
}

/// Tick interval for a tempo: 60000/bpm milliseconds.
pub fn interval_for_bpm(bpm: u32) -> Duration {
    Duration::from_secs_f64(60.0 / bpm as f64)
}

/// Next beat index, wrapping at the bar.
pub fn next_beat(beat: u32) -> u32 {
    (beat + 1) % BEATS_PER_BAR
}

/// Fallback percussion note for a beat.
pub fn fallback_note(accent: bool) -> i32 {
    if accent {
        ACCENT_NOTE
    } else {
        REGULAR_NOTE
    }
}

/// A decoded click sample, shareable across tick tasks.
#[derive(Clone)]
pub struct ClickSound {
    samples: Arc<Vec<f32>>,
    channels: u16,
    sample_rate: u32,
}

impl ClickSound {
    /// Wraps raw interleaved samples.
    pub fn from_samples(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            channels,
            sample_rate,
        }
    }

    /// Loads a click sample from a WAV file, normalizing to f32.
    ///
    /// Returns None (with a log line) when the file is absent or
    /// unreadable; the metronome then uses the synthesizer fallback.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let mut reader = match hound::WavReader::open(path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::warn!("Ignoring click sample {}: {}", path.display(), e);
                return None;
            }
        };
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().filter_map(|s| s.ok()).collect(),
            hound::SampleFormat::Int => {
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .filter_map(|s| s.ok())
                    .map(|s| s as f32 / max)
                    .collect()
            }
        };
        if samples.is_empty() {
            return None;
        }
        Some(Self::from_samples(samples, spec.channels, spec.sample_rate))
    }

    /// A playable copy of the buffer for one fire-and-forget task.
    fn to_buffer(&self) -> SamplesBuffer<f32> {
        SamplesBuffer::new(self.channels, self.sample_rate, self.samples.as_ref().clone())
    }
}

/// The accent/regular click pair, either of which may be missing.
#[derive(Clone, Default)]
pub struct ClickSounds {
    accent: Option<ClickSound>,
    regular: Option<ClickSound>,
}

impl ClickSounds {
    pub fn new(accent: Option<ClickSound>, regular: Option<ClickSound>) -> Self {
        Self { accent, regular }
    }

    /// Loads the click pair from the working directory.
    pub fn load_default() -> Self {
        Self::new(
            ClickSound::load(Path::new(ACCENT_FILE)),
            ClickSound::load(Path::new(REGULAR_FILE)),
        )
    }

    /// The buffer for a beat, or None to use the synthesizer fallback.
    pub fn select(&self, accent: bool) -> Option<&ClickSound> {
        if accent {
            self.accent.as_ref()
        } else {
            self.regular.as_ref()
        }
    }
}

/// A cancellable periodic scheduler.
///
/// `start` replaces any running schedule (stop-before-start, so two
/// callbacks never overlap) and fires the callback immediately, then on
/// every interval until `stop`.
pub trait TickScheduler {
    fn start(&mut self, interval: Duration, tick: Box<dyn FnMut() + Send>);
    fn stop(&mut self);
}

/// Thread-backed scheduler: one worker loops on a channel timeout.
///
/// The stop signal wakes the worker mid-wait, so `stop` returns promptly
/// even at slow tempos.
#[derive(Default)]
pub struct ThreadScheduler {
    stop_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TickScheduler for ThreadScheduler {
    fn start(&mut self, interval: Duration, mut tick: Box<dyn FnMut() + Send>) {
        self.stop();
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::spawn(move || loop {
            tick();
            match stop_rx.recv_timeout(interval) {
                Err(RecvTimeoutError::Timeout) => continue,
                // Stop requested, or the scheduler itself was dropped.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });
        self.stop_tx = Some(stop_tx);
        self.handle = Some(handle);
    }

    fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for ThreadScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The metronome: tempo state plus the resources each tick needs.
pub struct Metronome {
    scheduler: ThreadScheduler,
    clicks: ClickSounds,
    synth: Arc<Mutex<Synthesizer>>,
    output: OutputStreamHandle,
    bpm: u32,
    running: bool,
}

impl Metronome {
    pub fn new(
        synth: Arc<Mutex<Synthesizer>>,
        output: OutputStreamHandle,
        clicks: ClickSounds,
    ) -> Self {
        Self {
            scheduler: ThreadScheduler::new(),
            clicks,
            synth,
            output,
            bpm: 120,
            running: false,
        }
    }

    /// Starts ticking at `bpm`, replacing any running schedule.
    ///
    /// The first tick fires immediately; the beat index restarts at the
    /// accent. `bpm` must already be validated with [`is_valid_bpm`].
    pub fn start(&mut self, bpm: u32) {
        self.bpm = bpm;

        let clicks = self.clicks.clone();
        let synth = Arc::clone(&self.synth);
        let output = self.output.clone();
        let mut beat = 0u32;

        self.scheduler.start(
            interval_for_bpm(bpm),
            Box::new(move || {
                play_tick(beat == 0, &clicks, &synth, &output);
                beat = next_beat(beat);
            }),
        );
        self.running = true;
    }

    /// Stops ticking. An already-playing click is not cut short.
    pub fn stop(&mut self) {
        self.scheduler.stop();
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }
}

/// Plays one metronome tick.
///
/// With a loaded click buffer the sample goes to the output mixer outside
/// the synthesizer render path, sized to its own duration. Otherwise the
/// synthesizer plays a percussion note, with a short-lived task issuing
/// the delayed note-off.
fn play_tick(
    accent: bool,
    clicks: &ClickSounds,
    synth: &Arc<Mutex<Synthesizer>>,
    output: &OutputStreamHandle,
) {
    if let Some(click) = clicks.select(accent) {
        if let Err(e) = output.play_raw(click.to_buffer()) {
            tracing::warn!("Click playback failed: {}", e);
        }
        return;
    }

    let note = fallback_note(accent);
    if let Ok(mut synth) = synth.lock() {
        synth.note_on(PERCUSSION_CHANNEL as i32, note, CLICK_VELOCITY);
    }
    let synth = Arc::clone(synth);
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(FALLBACK_CLICK_MS));
        if let Ok(mut synth) = synth.lock() {
            synth.note_off(PERCUSSION_CHANNEL as i32, note);
        }
    });
}
