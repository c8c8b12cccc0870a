//! External MIDI controller input.
//!
//! Bridges a hardware (or virtual) MIDI input port straight into the
//! synthesizer: messages are split into channel/status/data bytes and
//! forwarded verbatim, bypassing the on-screen keyboard state entirely.
//! Unsupported status bytes are the synthesizer's problem to ignore.

use std::sync::{Arc, Mutex};

use midir::{MidiInput, MidiInputConnection};
use rustysynth::Synthesizer;

/// Client name reported to the system MIDI service.
const CLIENT_NAME: &str = "pianotui";

/// An open connection from an external MIDI device to the synthesizer.
///
/// Dropping the bridge closes the connection and stops the callback thread.
pub struct MidiInputBridge {
    /// Held for its Drop side effect; the callback owns everything it needs.
    _connection: MidiInputConnection<()>,
    port_name: String,
}

impl MidiInputBridge {
    /// Lists the names of the available MIDI input ports, in index order.
    pub fn port_names() -> Vec<String> {
        match MidiInput::new(CLIENT_NAME) {
            Ok(midi_in) => midi_in
                .ports()
                .iter()
                .map(|p| {
                    midi_in
                        .port_name(p)
                        .unwrap_or_else(|_| "Unknown".to_string())
                })
                .collect(),
            Err(e) => {
                tracing::warn!("MIDI subsystem unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Connects the input port at `index` to the synthesizer.
    ///
    /// The device callback runs on a thread owned by the MIDI backend;
    /// each message is forwarded under the shared synthesizer lock.
    ///
    /// # Errors
    ///
    /// Returns an error string if the MIDI subsystem cannot be opened,
    /// the index is out of range, or the connection fails. Callers treat
    /// all of these as "no bridge attached".
    pub fn connect(index: usize, synth: Arc<Mutex<Synthesizer>>) -> Result<Self, String> {
        let midi_in = MidiInput::new(CLIENT_NAME).map_err(|e| e.to_string())?;
        let ports = midi_in.ports();
        let port = ports
            .get(index)
            .ok_or_else(|| format!("no MIDI input at index {}", index))?;
        let port_name = midi_in
            .port_name(port)
            .unwrap_or_else(|_| "Unknown".to_string());

        let connection = midi_in
            .connect(
                port,
                CLIENT_NAME,
                move |_timestamp, message, _| {
                    if let Some((channel, command, data1, data2)) = split_raw(message) {
                        if let Ok(mut synth) = synth.lock() {
                            synth.process_midi_message(
                                channel as i32,
                                command as i32,
                                data1 as i32,
                                data2 as i32,
                            );
                        }
                    }
                },
                (),
            )
            .map_err(|e| e.to_string())?;

        Ok(Self {
            _connection: connection,
            port_name,
        })
    }

    /// The name of the connected port, for display.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

/// Splits a raw MIDI message into (channel, command, data1, data2).
///
/// The status byte carries the command in its high nibble and the channel
/// in its low nibble; missing data bytes are forwarded as zero. Only an
/// empty message yields None.
pub fn split_raw(message: &[u8]) -> Option<(u8, u8, u8, u8)> {
    let status = *message.first()?;
    let channel = status & 0x0F;
    let command = status & 0xF0;
    let data1 = message.get(1).copied().unwrap_or(0);
    let data2 = message.get(2).copied().unwrap_or(0);
    Some((channel, command, data1, data2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_raw_note_on() {
        // Note On, channel 5, middle C, velocity 100
        assert_eq!(split_raw(&[0x95, 60, 100]), Some((5, 0x90, 60, 100)));
    }

    #[test]
    fn test_split_raw_note_off() {
        assert_eq!(split_raw(&[0x80, 60, 64]), Some((0, 0x80, 60, 64)));
    }

    #[test]
    fn test_split_raw_program_change_two_bytes() {
        // Program change carries a single data byte; data2 defaults to 0.
        assert_eq!(split_raw(&[0xC3, 42]), Some((3, 0xC0, 42, 0)));
    }

    #[test]
    fn test_split_raw_control_change() {
        assert_eq!(split_raw(&[0xB0, 91, 64]), Some((0, 0xB0, 91, 64)));
    }

    #[test]
    fn test_split_raw_empty() {
        assert_eq!(split_raw(&[]), None);
    }

    #[test]
    fn test_split_raw_forwards_unsupported_status() {
        // System messages are still split and forwarded; the synthesizer
        // decides what to do with them.
        assert_eq!(split_raw(&[0xF8]), Some((8, 0xF0, 0, 0)));
    }
}
