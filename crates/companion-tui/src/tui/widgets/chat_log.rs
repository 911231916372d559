// Message log: chat history, newest at the bottom.
//
// User messages are labelled "You"; assistant replies carry the twin's emoji
// and name when the gateway said which persona answered. Queued messages get
// a "⏳ Pending sync" marker.

use chrono::{Local, TimeZone};
use companion_core::message::Message;
use ratatui::layout::{Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use ratatui::Frame;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::tui::ViewState;

pub const PENDING_MARKER: &str = "⏳ Pending sync";
pub const THINKING: &str = "Thinking...";
const EMPTY_TEXT: &str = "  No messages yet. Say hello!";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(match &state.gateway_url {
            Some(url) => format!("Chat ({url})"),
            None => "Chat".to_string(),
        });

    if state.messages.is_empty() && !state.busy {
        let paragraph = Paragraph::new(EMPTY_TEXT)
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let inner_width = area.width.saturating_sub(2) as usize;
    let visible_rows = area.height.saturating_sub(2) as usize;

    let mut lines: Vec<Line<'static>> = Vec::new();
    for message in &state.messages {
        lines.extend(message_lines(message, inner_width));
    }
    if state.busy {
        lines.push(Line::from(Span::styled(
            THINKING,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    // Offset counts lines up from the bottom.
    let total = lines.len();
    let max_offset = total.saturating_sub(visible_rows);
    let offset = state.scroll_offset.min(max_offset);
    let end = total - offset;
    let start = end.saturating_sub(visible_rows);

    let visible: Vec<Line<'static>> = lines.drain(start..end).collect();
    frame.render_widget(Paragraph::new(visible).block(block), area);

    if total > visible_rows {
        let mut scrollbar_state = ScrollbarState::new(max_offset).position(max_offset - offset);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Header, wrapped body, optional pending marker, then a blank separator.
pub fn message_lines(message: &Message, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let time = format_time(message.timestamp);
    let header = if message.is_user() {
        Span::styled(
            "You".to_string(),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        Span::styled(
            author_label(message),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        )
    };
    lines.push(Line::from(vec![
        header,
        Span::styled(format!("  {time}"), Style::default().fg(Color::DarkGray)),
    ]));

    let body_style = if message.is_user() {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::Gray)
    };
    for row in wrap(&message.content, width.max(1)) {
        lines.push(Line::from(Span::styled(row, body_style)));
    }

    if message.pending {
        lines.push(Line::from(Span::styled(
            PENDING_MARKER,
            Style::default().fg(Color::Yellow),
        )));
    }

    lines.push(Line::default());
    lines
}

/// "🕯️ Case" / "🔭 Tars", or "Assistant" when no twin was named.
pub fn author_label(message: &Message) -> String {
    match message.twin {
        Some(twin) => format!("{} {}", twin.emoji(), twin.display_name()),
        None => "Assistant".to_string(),
    }
}

fn format_time(timestamp: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp)
        .single()
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Break `text` into rows at most `width` terminal columns wide, preferring
/// spaces. Wide characters (CJK, most emoji) take two columns. Embedded
/// newlines always start a new row.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut rows = Vec::new();
    for paragraph in text.split('\n') {
        let mut row = String::new();
        let mut row_width = 0;
        for word in paragraph.split(' ') {
            let word_width = word.width();
            let needed = if row_width == 0 {
                word_width
            } else {
                row_width + 1 + word_width
            };
            if needed <= width {
                if row_width > 0 {
                    row.push(' ');
                }
                row.push_str(word);
                row_width = needed;
                continue;
            }
            if row_width > 0 {
                rows.push(std::mem::take(&mut row));
            }
            // Hard-split words wider than a full row; the last piece stays
            // open for the next word.
            let mut piece_width = 0;
            for ch in word.chars() {
                let ch_width = ch.width().unwrap_or(0);
                if piece_width > 0 && piece_width + ch_width > width {
                    rows.push(std::mem::take(&mut row));
                    piece_width = 0;
                }
                row.push(ch);
                piece_width += ch_width;
            }
            row_width = piece_width;
        }
        rows.push(row);
    }
    rows
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
