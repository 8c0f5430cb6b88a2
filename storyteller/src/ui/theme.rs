//! Color theme and styling for the reader TUI

use ratatui::style::{Color, Modifier, Style};
use storyteller_core::{StyleToken, ToastVariant};

/// Reader UI color theme
#[derive(Debug, Clone)]
pub struct ReaderTheme {
    // Base colors
    pub foreground: Color,
    pub border: Color,
    pub border_focused: Color,
    pub highlight: Color,

    // Segment styles
    pub medieval: Color,
    pub futuristic: Color,
    pub horror: Color,

    // Text colors
    pub reader_text: Color,
    pub ending_text: Color,
    pub completed_text: Color,
    pub error_text: Color,
    pub system_text: Color,
}

impl Default for ReaderTheme {
    fn default() -> Self {
        Self {
            foreground: Color::White,
            border: Color::DarkGray,
            border_focused: Color::Cyan,
            highlight: Color::Cyan,

            medieval: Color::Yellow,
            futuristic: Color::LightBlue,
            horror: Color::Red,

            reader_text: Color::Cyan,
            ending_text: Color::Yellow,
            completed_text: Color::Green,
            error_text: Color::LightRed,
            system_text: Color::DarkGray,
        }
    }
}

impl ReaderTheme {
    /// Accent color for a segment style.
    pub fn segment_color(&self, token: StyleToken) -> Color {
        match token {
            StyleToken::Plain => self.foreground,
            StyleToken::Medieval => self.medieval,
            StyleToken::Futuristic => self.futuristic,
            StyleToken::Horror => self.horror,
        }
    }

    /// Style for segment prose.
    pub fn segment_style(&self, token: StyleToken) -> Style {
        let style = Style::default().fg(self.segment_color(token));
        match token {
            StyleToken::Horror => style.add_modifier(Modifier::ITALIC),
            _ => style,
        }
    }

    /// Border style of the reading panel.
    pub fn segment_border(&self, token: StyleToken) -> Style {
        match token {
            StyleToken::Plain => self.border_style(true),
            other => Style::default().fg(self.segment_color(other)),
        }
    }

    pub fn border_style(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.border_focused)
        } else {
            Style::default().fg(self.border)
        }
    }

    pub fn selected_style(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn choice_style(&self) -> Style {
        Style::default().fg(self.reader_text)
    }

    pub fn ending_style(&self) -> Style {
        Style::default()
            .fg(self.ending_text)
            .add_modifier(Modifier::BOLD)
    }

    pub fn completed_style(&self) -> Style {
        Style::default().fg(self.completed_text)
    }

    pub fn system_style(&self) -> Style {
        Style::default().fg(self.system_text)
    }

    pub fn error_style(&self) -> Style {
        Style::default().fg(self.error_text)
    }

    /// Style for a status line message.
    pub fn status_style(&self, variant: ToastVariant) -> Style {
        match variant {
            ToastVariant::Default => Style::default().fg(self.foreground),
            ToastVariant::Destructive => self.error_style().add_modifier(Modifier::BOLD),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_colors() {
        let theme = ReaderTheme::default();
        assert_eq!(theme.segment_color(StyleToken::Medieval), Color::Yellow);
        assert_eq!(theme.segment_color(StyleToken::Futuristic), Color::LightBlue);
        assert_eq!(theme.segment_color(StyleToken::Horror), Color::Red);
        assert_eq!(theme.segment_color(StyleToken::Plain), theme.foreground);
    }

    #[test]
    fn test_plain_segments_use_focused_border() {
        let theme = ReaderTheme::default();
        assert_eq!(theme.segment_border(StyleToken::Plain), theme.border_style(true));
        assert_eq!(
            theme.segment_border(StyleToken::Horror),
            Style::default().fg(Color::Red)
        );
    }

    #[test]
    fn test_destructive_status_is_bold_red() {
        let theme = ReaderTheme::default();
        let style = theme.status_style(ToastVariant::Destructive);
        assert_eq!(style.fg, Some(Color::LightRed));
        assert!(style.add_modifier.contains(Modifier::BOLD));
    }
}
