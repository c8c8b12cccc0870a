//! pianotui - a terminal virtual piano.
//!
//! This library provides the core functionality for the virtual piano app.

pub mod app;
pub mod audio;
pub mod config;
pub mod engine;
pub mod midi;
pub mod ui;

// Re-export commonly used types
pub use app::App;
pub use config::Config;
pub use engine::{EngineEvent, EngineSnapshot, PianoEngine};
pub use midi::KeyId;
