//! Help overlay rendering.
//!
//! Displays keyboard shortcuts and commands in a modal overlay.

use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use super::centered_rect;

/// Key binding entry for the help display.
struct KeyBinding {
    key: &'static str,
    description: &'static str,
}

const NOTE_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Z - /",
        description: "Lower octave (home row plays the sharps)",
    },
    KeyBinding {
        key: "Q - ]",
        description: "Upper octave (number row plays the sharps)",
    },
    KeyBinding {
        key: "Enter, Backspace...",
        description: "Extended high notes",
    },
    KeyBinding {
        key: "Space",
        description: "Sustain pedal (hold)",
    },
];

const CONTROL_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Left / Right",
        description: "Previous / next instrument",
    },
    KeyBinding {
        key: "Up / Down",
        description: "Octave up / down",
    },
    KeyBinding {
        key: "F1 / F2",
        description: "Transpose down / up",
    },
    KeyBinding {
        key: "F3 / F4",
        description: "Reverb down / up",
    },
    KeyBinding {
        key: "F5",
        description: "Metronome on / off",
    },
    KeyBinding {
        key: "F8",
        description: "Reset octave and transpose",
    },
];

const SESSION_BINDINGS: &[KeyBinding] = &[
    KeyBinding {
        key: "Ctrl+0..9",
        description: "Save current instrument to favorite slot",
    },
    KeyBinding {
        key: "Ctrl+Shift+0..9",
        description: "Load instrument from favorite slot",
    },
    KeyBinding {
        key: "F6",
        description: "Start / stop recording",
    },
    KeyBinding {
        key: "F7",
        description: "Abort recording (delete file)",
    },
    KeyBinding {
        key: "F10",
        description: "Toggle this help",
    },
    KeyBinding {
        key: "Esc",
        description: "Quit",
    },
];

/// Builds the styled lines for one help section.
fn section_lines(title: &'static str, bindings: &[KeyBinding]) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        title,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ))];
    for binding in bindings {
        lines.push(Line::from(vec![
            Span::styled(
                format!("  {:<20}", binding.key),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(binding.description, Style::default().fg(Color::White)),
        ]));
    }
    lines.push(Line::raw(""));
    lines
}

/// Renders the help overlay.
pub fn render_help(frame: &mut Frame, scroll: u16) {
    let area = centered_rect(70, 80, frame.area());
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(" Help: Keyboard Shortcuts ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let mut lines = Vec::new();
    lines.extend(section_lines("NOTES", NOTE_BINDINGS));
    lines.extend(section_lines("CONTROLS", CONTROL_BINDINGS));
    lines.extend(section_lines("SESSION", SESSION_BINDINGS));

    frame.render_widget(
        Paragraph::new(lines).scroll((scroll, 0)),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("[Up/Down]", Style::default().fg(Color::Yellow)),
            Span::styled(" Scroll  ", Style::default().fg(Color::DarkGray)),
            Span::styled("[F10/Esc]", Style::default().fg(Color::Yellow)),
            Span::styled(" Close", Style::default().fg(Color::DarkGray)),
        ])),
        chunks[1],
    );
}
