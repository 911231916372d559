// Chat screen layout.
//
// +--------------------------------------------------+
// | Header (1 row)                                    |
// +--------------------------------------------------+
// | Message log (fill)                                |
// +--------------------------------------------------+
// | Composer (3 rows)                                 |
// +--------------------------------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Title, pending count, gateway health, notices.
    pub header: Rect,
    pub log: Rect,
    /// Bordered single-line input.
    pub composer: Rect,
    pub help_bar: Rect,
}

pub fn build_layout(area: Rect) -> AppLayout {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // header
            Constraint::Min(3),    // message log
            Constraint::Length(3), // composer
            Constraint::Length(1), // help bar
        ])
        .split(area);

    AppLayout {
        header: vertical[0],
        log: vertical[1],
        composer: vertical[2],
        help_bar: vertical[3],
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
