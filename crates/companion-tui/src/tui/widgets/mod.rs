// TUI widget modules, one per screen region.

pub mod chat_log;
pub mod composer;
pub mod header;
pub mod lock_screen;
pub mod quit_confirm;
pub mod setup_form;
