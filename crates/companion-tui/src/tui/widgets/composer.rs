// Message composer: single-line input with a placeholder.

use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthChar;

use crate::tui::ViewState;

pub const PLACEHOLDER: &str = "Message your companions...";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let line = if state.composer.is_empty() {
        Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(vec![
            Span::raw(visible_tail(&state.composer, area.width.saturating_sub(3) as usize)),
            Span::styled("▏", Style::default().fg(Color::Cyan)),
        ])
    };

    let border = if state.busy {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let paragraph = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Message"),
    );
    frame.render_widget(paragraph, area);
}

/// The longest suffix of `text` that fits in `width` terminal columns, so the
/// cursor end stays visible.
pub fn visible_tail(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in text.char_indices().rev() {
        used += ch.width().unwrap_or(0);
        if used > width {
            return &text[idx + ch.len_utf8()..];
        }
    }
    text
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
