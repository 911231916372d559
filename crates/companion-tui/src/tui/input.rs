// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState edits (typing, scrolling, focus).

use companion_app::lifecycle::AppPhase;
use companion_app::protocol::UserCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;

/// Lines moved by PageUp / PageDown.
const PAGE_SIZE: usize = 10;

pub const MISSING_SETUP_FIELDS: &str = "Please enter both Gateway URL and Token";

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key press should be forwarded to the
/// app orchestrator, `None` when it only changed local state.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Windows reports both press and release; only act on press.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    if view_state.confirm_quit {
        return handle_confirm_quit(key_event, view_state);
    }

    if key_event.code == KeyCode::Esc {
        view_state.confirm_quit = true;
        return None;
    }

    match view_state.phase {
        AppPhase::Loading => None,
        AppPhase::Locked => handle_lock_screen(key_event, view_state),
        AppPhase::Setup => handle_setup(key_event, view_state),
        AppPhase::Ready => handle_chat(key_event, view_state, ctrl),
    }
}

/// `y`/`q` confirm, `n`/Esc cancel, everything else is swallowed.
fn handle_confirm_quit(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Char('q') | KeyCode::Char('Q') => {
            Some(UserCommand::Quit)
        }
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            view_state.confirm_quit = false;
            None
        }
        _ => None,
    }
}

fn handle_lock_screen(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Enter => Some(UserCommand::Unlock {
            response: std::mem::take(&mut view_state.unlock_input),
        }),
        KeyCode::Backspace => {
            view_state.unlock_input.pop();
            None
        }
        KeyCode::Char(c) if view_state.needs_passcode => {
            view_state.unlock_input.push(c);
            None
        }
        _ => None,
    }
}

fn handle_setup(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    let form = &mut view_state.setup;
    match key_event.code {
        KeyCode::Tab | KeyCode::Down => {
            form.focus = form.focus.next();
            None
        }
        KeyCode::BackTab | KeyCode::Up => {
            form.focus = form.focus.prev();
            None
        }
        KeyCode::Backspace => {
            form.focused_mut().pop();
            None
        }
        KeyCode::Char(c) => {
            form.focused_mut().push(c);
            None
        }
        KeyCode::Enter => {
            if !form.is_complete() {
                view_state.notice = Some(MISSING_SETUP_FIELDS.to_string());
                return None;
            }
            let passcode = std::mem::take(&mut form.passcode);
            view_state.notice = None;
            Some(UserCommand::SubmitSetup {
                gateway_url: form.gateway_url.trim().to_string(),
                token: form.token.trim().to_string(),
                passcode: (!passcode.is_empty()).then_some(passcode),
            })
        }
        _ => None,
    }
}

fn handle_chat(key_event: KeyEvent, view_state: &mut ViewState, ctrl: bool) -> Option<UserCommand> {
    if ctrl {
        return match key_event.code {
            KeyCode::Char('r') => Some(UserCommand::RetryPending),
            KeyCode::Char('t') => Some(UserCommand::TestConnection),
            _ => None,
        };
    }

    match key_event.code {
        KeyCode::Enter => {
            // Blank input never leaves the composer.
            if view_state.composer.trim().is_empty() {
                return None;
            }
            view_state.scroll_offset = 0;
            Some(UserCommand::Send(std::mem::take(&mut view_state.composer)))
        }
        KeyCode::Backspace => {
            view_state.composer.pop();
            None
        }
        KeyCode::Char(c) => {
            view_state.composer.push(c);
            None
        }
        KeyCode::Up => {
            scroll_up(view_state, 1);
            None
        }
        KeyCode::Down => {
            scroll_down(view_state, 1);
            None
        }
        KeyCode::PageUp => {
            scroll_up(view_state, PAGE_SIZE);
            None
        }
        KeyCode::PageDown => {
            scroll_down(view_state, PAGE_SIZE);
            None
        }
        KeyCode::End => {
            view_state.scroll_offset = 0;
            None
        }
        _ => None,
    }
}

/// The chat log widget clamps the offset to what is actually scrollable.
fn scroll_up(view_state: &mut ViewState, lines: usize) {
    view_state.scroll_offset = view_state.scroll_offset.saturating_add(lines);
}

fn scroll_down(view_state: &mut ViewState, lines: usize) {
    view_state.scroll_offset = view_state.scroll_offset.saturating_sub(lines);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
