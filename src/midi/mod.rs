//! MIDI vocabulary shared across the engine.
//!
//! Note naming helpers, channel conventions, and the live-input pieces:
//! the computer-keyboard map and the external controller bridge.

pub mod input;
pub mod keymap;

pub use input::MidiInputBridge;
pub use keymap::{semitone_offset, KeyId, KEY_OFFSETS};

/// Standard MIDI note names for display purposes.
/// Maps MIDI note number (0-127) to note name within an octave.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// The channel all keyboard notes and program changes are sent on.
pub const KEYBOARD_CHANNEL: u8 = 0;

/// The General MIDI percussion channel, used for metronome fallback clicks.
pub const PERCUSSION_CHANNEL: u8 = 9;

/// Converts a MIDI note number to a human-readable note name with octave.
///
/// # Arguments
///
/// * `note` - MIDI note number (0-127)
///
/// # Returns
///
/// String representation like "C4" or "F#5"
pub fn note_to_name(note: u8) -> String {
    let octave = (note / 12) as i8 - 1; // MIDI octave convention
    let note_index = (note % 12) as usize;
    format!("{}{}", NOTE_NAMES[note_index], octave)
}

/// Clamps an arbitrary note computation into the valid MIDI range.
///
/// Octave base plus transpose plus key offset can stray outside 0-127;
/// every note is forced into range before it reaches the synthesizer.
pub fn clamp_note(note: i32) -> u8 {
    note.clamp(0, 127) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_to_name() {
        assert_eq!(note_to_name(60), "C4");
        assert_eq!(note_to_name(69), "A4");
        assert_eq!(note_to_name(0), "C-1");
        assert_eq!(note_to_name(127), "G9");
    }

    #[test]
    fn test_clamp_note() {
        assert_eq!(clamp_note(-5), 0);
        assert_eq!(clamp_note(60), 60);
        assert_eq!(clamp_note(175), 127);
    }
}
