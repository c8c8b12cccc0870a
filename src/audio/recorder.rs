//! Performance capture to WAV.
//!
//! The recorder is a pure sink: the audio render loop pushes every
//! interleaved block it produces through `write_block`, and the UI thread
//! starts and stops sessions. Both sides share one mutex over the open
//! writer; the active flag is an atomic so an idle recorder costs the
//! render callback a single load.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};

use crate::audio::engine::SAMPLE_RATE;

/// An in-progress capture: the target path and its open writer.
struct ActiveSession {
    path: PathBuf,
    writer: WavWriter<BufWriter<File>>,
}

/// Thread-safe recording sink shared between the UI and audio threads.
///
/// At most one session is active at a time. Starting while active replaces
/// the session; the previous writer is finalized so the file it produced
/// stays a valid WAV.
pub struct Recorder {
    active: AtomicBool,
    session: Mutex<Option<ActiveSession>>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            session: Mutex::new(None),
        }
    }

    /// The fixed capture format: the engine's own render format.
    fn spec() -> WavSpec {
        WavSpec {
            channels: 2,
            sample_rate: SAMPLE_RATE,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        }
    }

    /// Starts a recording session writing to `path`.
    ///
    /// The writer is created before the lock is taken so the render thread
    /// is never blocked on file-system setup. If a session was already
    /// active it is swapped out under the lock and finalized afterwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the output file cannot be created.
    pub fn start(&self, path: PathBuf) -> Result<()> {
        let writer = WavWriter::create(&path, Self::spec())
            .with_context(|| format!("Failed to create recording: {}", path.display()))?;

        let previous = {
            let Ok(mut session) = self.session.lock() else {
                return Ok(());
            };
            let previous = session.replace(ActiveSession { path, writer });
            self.active.store(true, Ordering::Release);
            previous
        };

        if let Some(previous) = previous {
            tracing::warn!(
                "Recording restarted; finalizing previous file {}",
                previous.path.display()
            );
            finalize(previous);
        }
        Ok(())
    }

    /// Stops the active session and finalizes its file.
    ///
    /// Returns the path of the finished recording, or None if nothing was
    /// active. Finalization happens outside the lock.
    pub fn stop(&self) -> Option<PathBuf> {
        let previous = {
            let Ok(mut session) = self.session.lock() else {
                return None;
            };
            self.active.store(false, Ordering::Release);
            session.take()
        };

        previous.map(|session| {
            let path = session.path.clone();
            finalize(session);
            path
        })
    }

    /// Stops the active session and deletes its file.
    ///
    /// Delete failures are logged and swallowed; an abort never surfaces
    /// an error to the performer.
    pub fn abort(&self) -> Option<PathBuf> {
        let path = self.stop()?;
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to delete aborted recording {}: {}", path.display(), e);
            }
        }
        Some(path)
    }

    /// Whether a session is currently capturing.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Appends one interleaved stereo block to the active session.
    ///
    /// Called from the audio render callback. The critical section is the
    /// buffered sample writes only; a write failure deactivates the
    /// session so the callback is not penalized every block.
    pub fn write_block(&self, interleaved: &[f32]) {
        if !self.is_active() {
            return;
        }
        let Ok(mut session) = self.session.lock() else {
            return;
        };
        if let Some(session) = session.as_mut() {
            for &sample in interleaved {
                if let Err(e) = session.writer.write_sample(sample) {
                    tracing::warn!("Recording write failed, stopping capture: {}", e);
                    self.active.store(false, Ordering::Release);
                    break;
                }
            }
        }
    }
}

/// Finalizes a session's writer, patching the WAV header lengths.
fn finalize(session: ActiveSession) {
    if let Err(e) = session.writer.finalize() {
        tracing::warn!(
            "Failed to finalize recording {}: {}",
            session.path.display(),
            e
        );
    }
}

/// Builds a fresh recording path inside `dir`.
pub fn default_recording_path(dir: &Path) -> PathBuf {
    let id = uuid::Uuid::new_v4().simple().to_string();
    dir.join(format!("piano_rec_{}.wav", &id[..8]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_wav_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pianotui_rec_{}_{}.wav", tag, std::process::id()))
    }

    #[test]
    fn test_start_write_stop_produces_valid_wav() {
        let recorder = Recorder::new();
        let path = temp_wav_path("basic");

        recorder.start(path.clone()).unwrap();
        assert!(recorder.is_active());

        let block = vec![0.25f32; 512];
        recorder.write_block(&block);

        let finished = recorder.stop().unwrap();
        assert_eq!(finished, path);
        assert!(!recorder.is_active());

        let reader = hound::WavReader::open(&path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.sample_format, SampleFormat::Float);
        assert_eq!(reader.len(), 512);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_write_without_session_is_noop() {
        let recorder = Recorder::new();
        recorder.write_block(&[0.0; 64]);
        assert!(recorder.stop().is_none());
    }

    #[test]
    fn test_abort_deletes_file() {
        let recorder = Recorder::new();
        let path = temp_wav_path("abort");

        recorder.start(path.clone()).unwrap();
        recorder.write_block(&[0.5f32; 128]);
        recorder.abort();

        assert!(!path.exists());
        assert!(!recorder.is_active());
    }

    #[test]
    fn test_restart_finalizes_previous_file() {
        let recorder = Recorder::new();
        let first = temp_wav_path("first");
        let second = temp_wav_path("second");

        recorder.start(first.clone()).unwrap();
        recorder.write_block(&[0.1f32; 256]);

        // Second start replaces the session; exactly one writer stays open.
        recorder.start(second.clone()).unwrap();
        assert!(recorder.is_active());

        // The replaced file was finalized and parses on its own.
        let reader = hound::WavReader::open(&first).unwrap();
        assert_eq!(reader.len(), 256);

        recorder.write_block(&[0.2f32; 64]);
        recorder.stop();
        let reader = hound::WavReader::open(&second).unwrap();
        assert_eq!(reader.len(), 64);

        std::fs::remove_file(&first).ok();
        std::fs::remove_file(&second).ok();
    }

    #[test]
    fn test_default_recording_path_shape() {
        let path = default_recording_path(Path::new("/tmp"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("piano_rec_"));
        assert!(name.ends_with(".wav"));
    }
}
