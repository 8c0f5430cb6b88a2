//! Theme styling decision for the reader.
//!
//! Renderers map the returned token to concrete colors.

use crate::catalog::Theme;

/// Visual treatment a renderer applies to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleToken {
    #[default]
    Plain,
    Medieval,
    Futuristic,
    Horror,
}

/// Pick the style for a segment theme.
///
/// Without dynamic themes every segment renders plain.
pub fn style_token(theme: Theme, dynamic_themes: bool) -> StyleToken {
    if !dynamic_themes {
        return StyleToken::Plain;
    }
    match theme {
        Theme::Medieval => StyleToken::Medieval,
        Theme::Futuristic => StyleToken::Futuristic,
        Theme::Horror => StyleToken::Horror,
        Theme::Default => StyleToken::Plain,
    }
}
