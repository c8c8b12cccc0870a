//! Live keyboard note accounting.
//!
//! Tracks which physical keys are held and which notes ride the sustain
//! pedal, and decides which note-on/note-off commands each input event
//! produces. The note number is computed once, at press time; octave or
//! transpose changes while a key is held never retune its release.

use std::collections::{HashMap, HashSet};

use crate::midi::{clamp_note, keymap, KeyId};

/// Default octave base (C3 as the bottom of the main row).
pub const DEFAULT_BASE_OCTAVE: u8 = 48;

/// Highest allowed octave base.
pub const MAX_BASE_OCTAVE: u8 = 108;

/// Transpose limit in semitones, either direction.
pub const MAX_TRANSPOSE: i8 = 12;

/// Pressed/sustained state for the on-screen keyboard.
///
/// Mutated only from the input thread; the audio thread never reads it.
pub struct KeyboardState {
    /// Held keys and the note each one emitted at press time.
    pressed: HashMap<KeyId, u8>,
    /// Notes whose release was deferred by the sustain pedal.
    sustained: HashSet<u8>,
    base_octave: u8,
    transpose: i8,
    sustain: bool,
}

impl Default for KeyboardState {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyboardState {
    pub fn new() -> Self {
        Self {
            pressed: HashMap::new(),
            sustained: HashSet::new(),
            base_octave: DEFAULT_BASE_OCTAVE,
            transpose: 0,
            sustain: false,
        }
    }

    /// Registers a key press.
    ///
    /// Returns the note to start, or None if the key is unmapped or
    /// already held. A note that was ringing on the pedal is taken off
    /// the sustained set so its eventual release is accounted once.
    pub fn key_down(&mut self, key: KeyId) -> Option<u8> {
        let offset = keymap::semitone_offset(key)?;
        if self.pressed.contains_key(&key) {
            return None;
        }
        let note = clamp_note(self.base_octave as i32 + self.transpose as i32 + offset as i32);
        self.sustained.remove(&note);
        self.pressed.insert(key, note);
        Some(note)
    }

    /// Registers a key release.
    ///
    /// Returns the note to stop, or None if the key was not held or the
    /// pedal deferred the release.
    pub fn key_up(&mut self, key: KeyId) -> Option<u8> {
        let note = self.pressed.remove(&key)?;
        if self.sustain {
            self.sustained.insert(note);
            None
        } else {
            Some(note)
        }
    }

    /// Sets the sustain pedal state.
    ///
    /// Releasing the pedal returns every deferred note exactly once and
    /// empties the set; pressing it only raises the flag.
    pub fn set_sustain(&mut self, active: bool) -> Vec<u8> {
        self.sustain = active;
        if active {
            Vec::new()
        } else {
            self.sustained.drain().collect()
        }
    }

    /// Moves the octave base, clamped to [0, 108]. Sounding notes keep
    /// their pitch; only subsequent presses are affected.
    pub fn change_octave(&mut self, delta: i16) -> u8 {
        let base = (self.base_octave as i16 + delta).clamp(0, MAX_BASE_OCTAVE as i16);
        self.base_octave = base as u8;
        self.base_octave
    }

    /// Moves the transpose offset, clamped to [-12, 12].
    pub fn change_transpose(&mut self, delta: i16) -> i8 {
        let transpose =
            (self.transpose as i16 + delta).clamp(-(MAX_TRANSPOSE as i16), MAX_TRANSPOSE as i16);
        self.transpose = transpose as i8;
        self.transpose
    }

    /// Restores the default octave base and zero transpose.
    pub fn reset_navigation(&mut self) {
        self.base_octave = DEFAULT_BASE_OCTAVE;
        self.transpose = 0;
    }

    pub fn base_octave(&self) -> u8 {
        self.base_octave
    }

    pub fn transpose(&self) -> i8 {
        self.transpose
    }

    pub fn sustain_active(&self) -> bool {
        self.sustain
    }

    /// Octave number as announced to the user (MIDI convention).
    pub fn display_octave(&self) -> i8 {
        (self.base_octave / 12) as i8 - 1
    }

    /// Keys currently held, for the on-screen keyboard.
    pub fn pressed_keys(&self) -> impl Iterator<Item = KeyId> + '_ {
        self.pressed.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_note_on_per_press() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_down(KeyId::Char('z')), Some(48));
        // Repeats while held produce nothing.
        assert_eq!(state.key_down(KeyId::Char('z')), None);
        assert_eq!(state.key_down(KeyId::Char('z')), None);
        assert_eq!(state.key_up(KeyId::Char('z')), Some(48));
    }

    #[test]
    fn test_unmapped_key_ignored() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_down(KeyId::Char('a')), None);
        assert_eq!(state.key_up(KeyId::Char('a')), None);
    }

    #[test]
    fn test_note_fixed_at_press_time() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_down(KeyId::Char('z')), Some(48));
        // Retuning while the key is held does not move its release.
        state.change_transpose(3);
        state.change_octave(12);
        assert_eq!(state.key_up(KeyId::Char('z')), Some(48));
    }

    #[test]
    fn test_transpose_applies_to_next_press_and_clamps() {
        let mut state = KeyboardState::new();
        assert_eq!(state.key_down(KeyId::Char('z')), Some(48));
        state.key_up(KeyId::Char('z'));

        assert_eq!(state.change_transpose(1), 1);
        assert_eq!(state.key_down(KeyId::Char('z')), Some(49));
        state.key_up(KeyId::Char('z'));

        for _ in 0..30 {
            state.change_transpose(1);
        }
        assert_eq!(state.transpose(), 12);
        assert_eq!(state.key_down(KeyId::Char('z')), Some(60));
    }

    #[test]
    fn test_octave_clamps_at_both_ends() {
        let mut state = KeyboardState::new();
        for _ in 0..20 {
            state.change_octave(12);
        }
        assert_eq!(state.base_octave(), 108);
        for _ in 0..20 {
            state.change_octave(-12);
        }
        assert_eq!(state.base_octave(), 0);
    }

    #[test]
    fn test_note_clamped_to_midi_range() {
        let mut state = KeyboardState::new();
        for _ in 0..10 {
            state.change_octave(12);
        }
        state.change_transpose(12);
        // 108 + 12 + 55 would be far past the range.
        assert_eq!(state.key_down(KeyId::PageDown), Some(127));
    }

    #[test]
    fn test_sustain_defers_and_releases_each_note_once() {
        let mut state = KeyboardState::new();
        state.set_sustain(true);

        let notes: Vec<u8> = [KeyId::Char('z'), KeyId::Char('x'), KeyId::Char('c')]
            .iter()
            .map(|&k| state.key_down(k).unwrap())
            .collect();

        // Releases under the pedal emit nothing.
        assert_eq!(state.key_up(KeyId::Char('z')), None);
        assert_eq!(state.key_up(KeyId::Char('x')), None);
        assert_eq!(state.key_up(KeyId::Char('c')), None);
        assert_eq!(state.sustained.len(), 3);

        let mut released = state.set_sustain(false);
        released.sort_unstable();
        let mut expected = notes.clone();
        expected.sort_unstable();
        assert_eq!(released, expected);
        assert_eq!(state.sustained.len(), 0);

        // Releasing again produces nothing further.
        assert!(state.set_sustain(false).is_empty());
    }

    #[test]
    fn test_pedal_press_alone_changes_nothing() {
        let mut state = KeyboardState::new();
        state.key_down(KeyId::Char('z'));
        assert!(state.set_sustain(true).is_empty());
        assert_eq!(state.sustained.len(), 0);
    }

    #[test]
    fn test_repressing_sustained_note_rearms_it() {
        let mut state = KeyboardState::new();
        state.set_sustain(true);
        state.key_down(KeyId::Char('z'));
        state.key_up(KeyId::Char('z'));
        assert_eq!(state.sustained.len(), 1);

        // The new press takes the note off the pedal...
        assert_eq!(state.key_down(KeyId::Char('z')), Some(48));
        assert_eq!(state.sustained.len(), 0);

        // ...and its release defers it again, exactly once.
        assert_eq!(state.key_up(KeyId::Char('z')), None);
        assert_eq!(state.sustained.len(), 1);
        assert_eq!(state.set_sustain(false), vec![48]);
    }

    #[test]
    fn test_reset_navigation() {
        let mut state = KeyboardState::new();
        state.change_octave(24);
        state.change_transpose(-5);
        state.reset_navigation();
        assert_eq!(state.base_octave(), DEFAULT_BASE_OCTAVE);
        assert_eq!(state.transpose(), 0);
        assert_eq!(state.display_octave(), 3);
    }
}
