//! Audio subsystem: synthesis, output, metronome, and capture.

pub mod engine;
pub mod metronome;
pub mod recorder;

pub use engine::{AudioEngine, AudioError, SAMPLE_RATE};
pub use metronome::Metronome;
pub use recorder::Recorder;
