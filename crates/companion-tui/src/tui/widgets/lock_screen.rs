// Lock screen shown while a configured app waits to be unlocked.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::header::TITLE;
use super::quit_confirm::centered_rect;
use crate::tui::ViewState;

const PANEL_WIDTH: u16 = 44;
const PANEL_HEIGHT: u16 = 10;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let panel = centered_rect(PANEL_WIDTH, PANEL_HEIGHT, area);

    let mut lines = vec![
        Line::from("🔐"),
        Line::from(Span::styled(
            TITLE,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            "Tap to unlock",
            Style::default().fg(Color::Gray),
        )),
        Line::default(),
    ];

    if state.needs_passcode {
        lines.push(Line::from(vec![
            Span::raw("Passcode: "),
            Span::styled(
                mask(&state.unlock_input),
                Style::default().fg(Color::Cyan),
            ),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
        ]));
    }
    lines.push(Line::from(Span::styled(
        "Press Enter to unlock",
        Style::default().fg(Color::DarkGray),
    )));

    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(paragraph, panel);
}

/// One `•` per typed character.
pub fn mask(input: &str) -> String {
    "•".repeat(input.chars().count())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
