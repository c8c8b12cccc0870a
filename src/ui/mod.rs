//! Terminal user interface.
//!
//! The UI is a thin display collaborator: everything it shows comes from
//! the engine snapshot and the status line the event stream feeds.

mod dialogs;
mod help;
mod keyboard;

use crate::app::App;
use crate::engine::EngineSnapshot;
use crate::midi::note_to_name;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub use dialogs::render_bpm_dialog;
pub use help::render_help;
pub use keyboard::render_keyboard;

/// Renders the complete UI layout.
///
/// Top to bottom: performance readouts, pedal/metronome/recording state,
/// the on-screen keyboard, and the status line with key hints.
pub fn render(frame: &mut Frame, app: &App) {
    let snapshot = app.engine.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Instrument / octave / transpose / reverb
            Constraint::Length(3), // Pedal / metronome / recording
            Constraint::Min(6),    // Keyboard
            Constraint::Length(1), // Status line
            Constraint::Length(1), // Key hints
        ])
        .split(frame.area());

    render_readouts(frame, chunks[0], &snapshot);
    render_state_row(frame, chunks[1], &snapshot);
    render_keyboard(frame, chunks[2], &snapshot);
    render_status_line(frame, chunks[3], app);
    render_hints(frame, chunks[4]);
}

/// The instrument/octave/transpose/reverb readout bar.
fn render_readouts(frame: &mut Frame, area: Rect, snapshot: &EngineSnapshot) {
    let block = Block::default()
        .title(" pianotui ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut name = snapshot.instrument_name.clone();
    if name.len() > 24 {
        name.truncate(22);
        name.push_str("..");
    }

    let line = Line::from(vec![
        Span::styled(
            format!(" {:03}: {} ", snapshot.instrument, name),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("│", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(
                " Octave: {} ({}) ",
                snapshot.display_octave,
                note_to_name(snapshot.base_octave)
            ),
            Style::default().fg(Color::White),
        ),
        Span::styled("│", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(" Transp: {:+} ", snapshot.transpose),
            Style::default().fg(Color::White),
        ),
        Span::styled("│", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!(" Reverb: {}% ", snapshot.reverb_percent),
            Style::default().fg(Color::White),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
}

/// The pedal/metronome/recording state row.
fn render_state_row(frame: &mut Frame, area: Rect, snapshot: &EngineSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut spans = Vec::new();

    if !snapshot.audio_ready {
        spans.push(Span::styled(
            " AUDIO UNAVAILABLE (keyboard is muted) ",
            Style::default()
                .fg(Color::White)
                .bg(Color::Red)
                .add_modifier(Modifier::BOLD),
        ));
    } else {
        let pedal = if snapshot.sustain {
            Span::styled(
                " PEDAL SUSTAIN ",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD),
            )
        } else {
            Span::styled(" PEDAL FREE ", Style::default().fg(Color::DarkGray))
        };
        spans.push(pedal);
        spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));

        let metronome = if snapshot.metronome_on {
            Span::styled(
                format!(" Metronome: {} BPM ", snapshot.bpm),
                Style::default().fg(Color::Green),
            )
        } else {
            Span::styled(" Metronome: off ", Style::default().fg(Color::DarkGray))
        };
        spans.push(metronome);

        if let Some(port) = &snapshot.midi_port {
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                format!(" MIDI: {} ", port),
                Style::default().fg(Color::Cyan),
            ));
        }

        if snapshot.recording {
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(
                " ● REC ",
                Style::default()
                    .fg(Color::Red)
                    .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
            ));
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), inner);
}

/// The temporary status message, if one is live.
fn render_status_line(frame: &mut Frame, area: Rect, app: &App) {
    if let Some((message, _)) = &app.status_message {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {}", message),
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )),
            area,
        );
    }
}

/// The one-line key binding reminder.
fn render_hints(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(Color::Yellow);
    let desc_style = Style::default().fg(Color::DarkGray);
    let line = Line::from(vec![
        Span::styled(" [Space]", key_style),
        Span::styled(" Pedal ", desc_style),
        Span::styled("[←→]", key_style),
        Span::styled(" Instrument ", desc_style),
        Span::styled("[↑↓]", key_style),
        Span::styled(" Octave ", desc_style),
        Span::styled("[F5]", key_style),
        Span::styled(" Metronome ", desc_style),
        Span::styled("[F6]", key_style),
        Span::styled(" Record ", desc_style),
        Span::styled("[F10]", key_style),
        Span::styled(" Help ", desc_style),
        Span::styled("[Esc]", key_style),
        Span::styled(" Quit", desc_style),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

/// Helper function to center a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
