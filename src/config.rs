//! Persisted user settings.
//!
//! A small JSON file in the working directory holds the MIDI input device
//! index, the default recording directory, and the ten favorite instrument
//! slots. A missing or unreadable file falls back to defaults; saving is
//! best-effort and reported by the caller.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the settings file, resolved against the working directory.
pub const CONFIG_FILE: &str = "config.json";

/// Number of favorite instrument slots.
pub const FAVORITE_SLOTS: usize = 10;

/// User settings, loaded at startup and written on save/apply actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Index of the external MIDI input device to attach at startup.
    pub midi_input: usize,
    /// Directory recordings are written to; None falls back at use time.
    pub recording_dir: Option<PathBuf>,
    /// Favorite instrument slots. Program 0 doubles as "empty": a slot is
    /// only usable when its id exists in the loaded instrument set.
    pub favorites: [u8; FAVORITE_SLOTS],
}

impl Default for Config {
    fn default() -> Self {
        Self {
            midi_input: 0,
            recording_dir: None,
            favorites: [0; FAVORITE_SLOTS],
        }
    }
}

impl Config {
    /// Loads settings from the default location, falling back to defaults
    /// if the file is missing or unparseable.
    pub fn load() -> Self {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    /// Loads settings from `path`, falling back to defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => match serde_json::from_str(&data) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Ignoring malformed config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Writes settings to `path` as pretty-printed JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, data)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// The directory new recordings land in.
    ///
    /// Falls back to the current directory when no directory is configured
    /// or the configured one no longer exists.
    pub fn recording_dir(&self) -> PathBuf {
        match &self.recording_dir {
            Some(dir) if dir.is_dir() => dir.clone(),
            _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pianotui_config_{}_{}.json", tag, std::process::id()))
    }

    #[test]
    fn test_defaults_when_missing() {
        let config = Config::load_from(Path::new("/nonexistent/config.json"));
        assert_eq!(config.midi_input, 0);
        assert_eq!(config.favorites, [0; FAVORITE_SLOTS]);
        assert!(config.recording_dir.is_none());
    }

    #[test]
    fn test_round_trip() {
        let path = temp_config_path("roundtrip");
        let mut config = Config::default();
        config.midi_input = 2;
        config.favorites[3] = 24;
        config.recording_dir = Some(PathBuf::from("/tmp"));

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path);
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.midi_input, 2);
        assert_eq!(loaded.favorites[3], 24);
        assert_eq!(loaded.recording_dir, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let path = temp_config_path("malformed");
        std::fs::write(&path, "not json {").unwrap();
        let loaded = Config::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.favorites, [0; FAVORITE_SLOTS]);
    }

    #[test]
    fn test_recording_dir_fallback() {
        let mut config = Config::default();
        config.recording_dir = Some(PathBuf::from("/definitely/not/a/real/dir"));
        // Falls back rather than pointing recordings at a missing directory.
        assert_ne!(
            config.recording_dir(),
            PathBuf::from("/definitely/not/a/real/dir")
        );
    }
}
