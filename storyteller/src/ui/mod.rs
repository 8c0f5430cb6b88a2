//! UI module for the reader TUI

pub mod layout;
pub mod render;
pub mod theme;

pub use render::render;

/// Overlay types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    Help,
    /// Confirm clearing a completed story before reading it again.
    ConfirmStartOver(String),
}
