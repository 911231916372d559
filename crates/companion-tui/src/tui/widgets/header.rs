// Header bar: title, pending sync count, gateway health, latest notice.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::tui::ViewState;

pub const TITLE: &str = "OpenClaw Companion";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let (dot, dot_color) = health_indicator(state.gateway_healthy);
    let mut spans = vec![
        Span::styled(format!(" {dot} "), Style::default().fg(dot_color)),
        Span::styled(
            TITLE,
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(text) = pending_label(state.pending_count) {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(text, Style::default().fg(Color::Yellow)));
    }

    if let Some(notice) = &state.notice {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Gray),
        ));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Dot and color for the last health probe. Gray until one has run.
pub fn health_indicator(healthy: Option<bool>) -> (&'static str, Color) {
    match healthy {
        Some(true) => ("●", Color::Green),
        Some(false) => ("●", Color::Red),
        None => ("○", Color::DarkGray),
    }
}

/// "N pending sync", only when something is queued.
pub fn pending_label(count: usize) -> Option<String> {
    (count > 0).then(|| format!("{count} pending sync"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn render_line(state: &ViewState) -> String {
        let backend = ratatui::backend::TestBackend::new(80, 1);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer[(x, 0)].symbol().to_string())
            .collect()
    }

    #[test]
    fn health_indicator_states() {
        assert_eq!(health_indicator(Some(true)), ("●", Color::Green));
        assert_eq!(health_indicator(Some(false)), ("●", Color::Red));
        assert_eq!(health_indicator(None), ("○", Color::DarkGray));
    }

    #[test]
    fn pending_label_hidden_when_zero() {
        assert_eq!(pending_label(0), None);
        assert_eq!(pending_label(3).as_deref(), Some("3 pending sync"));
    }

    #[test]
    fn renders_title_and_pending_count() {
        let state = ViewState {
            pending_count: 2,
            ..ViewState::default()
        };
        let line = render_line(&state);
        assert!(line.contains("OpenClaw Companion"));
        assert!(line.contains("2 pending sync"));
    }

    #[test]
    fn renders_notice() {
        let state = ViewState {
            notice: Some("Gateway unreachable".into()),
            ..ViewState::default()
        };
        assert!(render_line(&state).contains("Gateway unreachable"));
    }
}
