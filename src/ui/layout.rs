use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeckLayout {
    pub header: Rect,
    pub history: Rect,
    pub editor: Option<Rect>,
    pub input: Rect,
    pub status: Rect,
}

/// Vertical split: header, main area, one input row, status line. When the
/// editor panel is open the main area is halved horizontally.
pub fn split_deck_layout(area: Rect, editor_open: bool) -> DeckLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    let (history, editor) = if editor_open {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(rows[1]);
        (columns[0], Some(columns[1]))
    } else {
        (rows[1], None)
    };

    DeckLayout {
        header: rows[0],
        history,
        editor,
        input: rows[2],
        status: rows[3],
    }
}
