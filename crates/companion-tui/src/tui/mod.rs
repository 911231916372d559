// Terminal UI: screens, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors the latest `AppSnapshot` plus the
// text the user is typing. The app orchestrator pushes `UiUpdate` messages
// over an mpsc channel; the TUI applies them and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::time::Duration;

use companion_app::lifecycle::AppPhase;
use companion_app::protocol::{AppSnapshot, UiUpdate, UserCommand};
use companion_core::message::Message;
use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use layout::build_layout;

// ---------------------------------------------------------------------------
// Setup form state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetupField {
    #[default]
    GatewayUrl,
    Token,
    Passcode,
}

impl SetupField {
    pub fn next(self) -> SetupField {
        match self {
            SetupField::GatewayUrl => SetupField::Token,
            SetupField::Token => SetupField::Passcode,
            SetupField::Passcode => SetupField::GatewayUrl,
        }
    }

    pub fn prev(self) -> SetupField {
        match self {
            SetupField::GatewayUrl => SetupField::Passcode,
            SetupField::Token => SetupField::GatewayUrl,
            SetupField::Passcode => SetupField::Token,
        }
    }
}

/// Text typed into the setup screen.
#[derive(Debug, Clone, Default)]
pub struct SetupForm {
    pub gateway_url: String,
    pub token: String,
    pub passcode: String,
    pub focus: SetupField,
}

impl SetupForm {
    pub fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            SetupField::GatewayUrl => &mut self.gateway_url,
            SetupField::Token => &mut self.token,
            SetupField::Passcode => &mut self.passcode,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.gateway_url.trim().is_empty() && !self.token.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state that mirrors the application state for rendering.
pub struct ViewState {
    pub phase: AppPhase,
    /// Error text from the lock or setup screen.
    pub error: Option<String>,
    pub needs_passcode: bool,
    pub messages: Vec<Message>,
    pub pending_count: usize,
    /// A send or flush is waiting on the gateway.
    pub busy: bool,
    pub gateway_healthy: Option<bool>,
    pub gateway_url: Option<String>,
    /// Transient status line text.
    pub notice: Option<String>,
    /// Chat composer contents.
    pub composer: String,
    /// Passcode typed on the lock screen.
    pub unlock_input: String,
    pub setup: SetupForm,
    /// Lines scrolled up from the newest message.
    pub scroll_offset: usize,
    /// Whether the quit confirmation dialog is showing.
    pub confirm_quit: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        ViewState {
            phase: AppPhase::Loading,
            error: None,
            needs_passcode: false,
            messages: Vec::new(),
            pending_count: 0,
            busy: false,
            gateway_healthy: None,
            gateway_url: None,
            notice: None,
            composer: String::new(),
            unlock_input: String::new(),
            setup: SetupForm::default(),
            scroll_offset: 0,
            confirm_quit: false,
        }
    }
}

impl ViewState {
    /// Apply a full state snapshot from the app orchestrator. Typed input is
    /// left alone.
    pub fn apply_snapshot(&mut self, snapshot: AppSnapshot) {
        if snapshot.messages.len() != self.messages.len() {
            // Jump back to the newest message when the log grows.
            self.scroll_offset = 0;
        }
        if snapshot.phase != self.phase {
            self.notice = None;
        }
        self.busy = snapshot.is_busy();
        self.phase = snapshot.phase;
        self.error = snapshot.error;
        self.needs_passcode = snapshot.needs_passcode;
        self.messages = snapshot.messages;
        self.pending_count = snapshot.pending_count;
        self.gateway_healthy = snapshot.gateway_healthy;
        self.gateway_url = snapshot.gateway_url;
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => state.apply_snapshot(*snapshot),
        UiUpdate::Notice(text) => state.notice = Some(text),
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the screen for the current phase.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let area = frame.area();
    match state.phase {
        AppPhase::Loading => render_loading(frame, area),
        AppPhase::Locked => widgets::lock_screen::render(frame, area, state),
        AppPhase::Setup => widgets::setup_form::render(frame, area, state),
        AppPhase::Ready => {
            let layout = build_layout(area);
            widgets::header::render(frame, layout.header, state);
            widgets::chat_log::render(frame, layout.log, state);
            widgets::composer::render(frame, layout.composer, state);
            render_help_bar(frame, layout.help_bar, state.phase);
        }
    }

    if state.confirm_quit {
        widgets::quit_confirm::render(frame, area);
    }
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let rect = widgets::quit_confirm::centered_rect(area.width, 1, area);
    let paragraph = Paragraph::new("Loading...")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(paragraph, rect);
}

/// Key hints for the given screen.
pub fn help_text(phase: AppPhase) -> &'static str {
    match phase {
        AppPhase::Loading => " Esc:Quit",
        AppPhase::Locked => " Enter:Unlock | Esc:Quit",
        AppPhase::Setup => " Tab:Next field | Enter:Save | Esc:Quit",
        AppPhase::Ready => {
            " Enter:Send | Ctrl+R:Retry pending | Ctrl+T:Test connection | PgUp/PgDn:Scroll | Esc:Quit"
        }
    }
}

pub fn render_help_bar(frame: &mut Frame, area: Rect, phase: AppPhase) {
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        help_text(phase),
        Style::default()
            .fg(Color::White)
            .add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, area);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the app shuts down.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal before the default hook prints the panic.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(update) => apply_ui_update(&mut view_state, update),
                    None => {
                        debug!("UI channel closed");
                        break Ok(());
                    }
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            let _ = cmd_tx.send(cmd).await;
                            if quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("terminal input error: {e}");
                        break Err(e.into());
                    }
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(e.into());
                }
            }
        }
    };

    ratatui::restore();
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
