//! Screen layout calculation

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Areas of the main screen
pub struct AppLayout {
    pub title: Rect,
    pub body: Rect,
    pub status: Rect,
    pub hotkeys: Rect,
}

impl AppLayout {
    pub fn calculate(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(5),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            title: chunks[0],
            body: chunks[1],
            status: chunks[2],
            hotkeys: chunks[3],
        }
    }
}

/// Split the chat body into transcript and input line.
pub fn chat_areas(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);
    (chunks[0], chunks[1])
}

/// A `width` x `height` rectangle centered in `area`, clamped to fit.
pub fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fits_small_areas() {
        let area = Rect::new(0, 0, 40, 10);
        assert_eq!(centered_rect_fixed(20, 4, area), Rect::new(10, 3, 20, 4));
        assert_eq!(centered_rect_fixed(60, 30, area), area);
    }

    #[test]
    fn test_layout_rows() {
        let layout = AppLayout::calculate(Rect::new(0, 0, 80, 24));
        assert_eq!(layout.title.height, 1);
        assert_eq!(layout.body.height, 21);
        assert_eq!(layout.status.y, 22);
        assert_eq!(layout.hotkeys.y, 23);
    }
}
