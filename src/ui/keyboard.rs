//! On-screen keyboard display.
//!
//! Shows the four key rows with their current notes and highlights the
//! keys being held. Note values follow the octave base and transpose from
//! the snapshot, so the display always matches what a press would play.

use crate::engine::EngineSnapshot;
use crate::midi::{clamp_note, keymap, KeyId};
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

/// Number-row sharps for the upper octave.
const UPPER_SHARPS: &[char] = &['2', '3', '4', '6', '7', '9', '0', '-', '='];
/// Upper letter row.
const UPPER_KEYS: &[char] = &['q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', '[', ']'];
/// Home-row sharps for the lower octave.
const LOWER_SHARPS: &[char] = &['s', 'd', 'g', 'h', 'j', 'l', ';'];
/// Bottom letter row.
const LOWER_KEYS: &[char] = &['z', 'x', 'c', 'v', 'b', 'n', 'm', ',', '.', '/'];

/// Builds one display row of keys with pressed/black-key styling.
fn build_row(keys: &[char], snapshot: &EngineSnapshot) -> Vec<Span<'static>> {
    keys.iter()
        .map(|&key| {
            let key_id = KeyId::Char(key);
            if let Some(offset) = keymap::semitone_offset(key_id) {
                let note = clamp_note(
                    snapshot.base_octave as i32 + snapshot.transpose as i32 + offset as i32,
                );
                let is_black = matches!(note % 12, 1 | 3 | 6 | 8 | 10);
                let is_pressed = snapshot.pressed_keys.contains(&key_id);

                let style = if is_pressed {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::Blue)
                        .add_modifier(Modifier::BOLD)
                } else if is_black {
                    Style::default()
                        .fg(Color::White)
                        .bg(Color::DarkGray)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD)
                };

                Span::styled(format!(" {} ", key.to_ascii_uppercase()), style)
            } else {
                Span::raw(format!(" {} ", key))
            }
        })
        .collect()
}

/// Renders the keyboard panel.
pub fn render_keyboard(frame: &mut Frame, area: Rect, snapshot: &EngineSnapshot) {
    let block = Block::default()
        .title(format!(" Keyboard (Octave: {}) ", snapshot.display_octave))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 4 {
        return;
    }

    let rows = [
        build_row(UPPER_SHARPS, snapshot),
        build_row(UPPER_KEYS, snapshot),
        build_row(LOWER_SHARPS, snapshot),
        build_row(LOWER_KEYS, snapshot),
    ];

    for (i, row) in rows.into_iter().enumerate() {
        let y = inner.y + i as u16;
        if y < inner.y + inner.height {
            frame.render_widget(
                Paragraph::new(Line::from(row)),
                Rect::new(inner.x, y, inner.width, 1),
            );
        }
    }
}
