// Setup screen: gateway URL, token, and an optional unlock passcode.

use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::lock_screen::mask;
use super::quit_confirm::centered_rect;
use crate::tui::{SetupField, ViewState};

const PANEL_WIDTH: u16 = 64;
const PANEL_HEIGHT: u16 = 14;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let panel = centered_rect(PANEL_WIDTH, PANEL_HEIGHT, area);
    let form = &state.setup;

    let mut lines = vec![
        Line::from("🔭🕯️").alignment(Alignment::Center),
        Line::from(Span::styled(
            "Welcome!",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        Line::from(Span::styled(
            "Connect to your OpenClaw gateway",
            Style::default().fg(Color::Gray),
        ))
        .alignment(Alignment::Center),
        Line::default(),
        field_line("Gateway URL", &form.gateway_url, form.focus == SetupField::GatewayUrl),
        field_line("Token", &mask(&form.token), form.focus == SetupField::Token),
        field_line(
            "Passcode",
            &mask(&form.passcode),
            form.focus == SetupField::Passcode,
        ),
        Line::default(),
        Line::from(Span::styled(
            "You'll need your gateway URL and token",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "Leave the passcode empty to skip the lock screen",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if let Some(message) = state.error.as_ref().or(state.notice.as_ref()) {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Setup Connection"),
    );
    frame.render_widget(paragraph, panel);
}

/// `> Label: value▏` for the focused field, `  Label: value` otherwise.
fn field_line(label: &str, value: &str, focused: bool) -> Line<'static> {
    let (marker, label_style) = if focused {
        (
            "> ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("  ", Style::default().fg(Color::Gray))
    };

    let mut spans = vec![
        Span::styled(format!("{marker}{label:<12}"), label_style),
        Span::raw(value.to_string()),
    ];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use companion_app::lifecycle::AppPhase;

    fn render_text(state: &ViewState) -> String {
        let backend = ratatui::backend::TestBackend::new(80, 20);
        let mut terminal = ratatui::Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| render(frame, frame.area(), state))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    fn setup() -> ViewState {
        ViewState {
            phase: AppPhase::Setup,
            ..ViewState::default()
        }
    }

    #[test]
    fn renders_welcome_and_fields() {
        let text = render_text(&setup());
        assert!(text.contains("Welcome!"));
        assert!(text.contains("Gateway URL"));
        assert!(text.contains("Token"));
        assert!(text.contains("Passcode"));
    }

    #[test]
    fn url_is_shown_and_secrets_are_masked() {
        let mut state = setup();
        state.setup.gateway_url = "https://gw.example".into();
        state.setup.token = "s3cret".into();
        state.setup.passcode = "2468".into();

        let text = render_text(&state);
        assert!(text.contains("https://gw.example"));
        assert!(!text.contains("s3cret"));
        assert!(!text.contains("2468"));
    }

    #[test]
    fn focused_field_is_marked() {
        let mut state = setup();
        state.setup.focus = SetupField::Token;
        let line = field_line("Token", "", true);
        let text: String = line.spans.iter().map(|s| s.content.as_ref()).collect();
        assert!(text.starts_with("> Token"));
        assert!(render_text(&state).contains("> Token"));
    }

    #[test]
    fn renders_validation_notice() {
        let state = ViewState {
            notice: Some("Please enter both Gateway URL and Token".into()),
            ..setup()
        };
        assert!(render_text(&state).contains("Please enter both Gateway URL and Token"));
    }
}
