//! Shared types used throughout the jotter engine.

use crate::JotterError;

/// A specialized Result type for jotter operations.
pub type Result<T> = std::result::Result<T, JotterError>;

/// Where a click on the display surface landed, as reported by the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// A task marker in plain mode, addressed by its rendered body-block
    /// index. Plain blocks map 1:1 to raw body lines.
    TaskBlock(usize),
    /// A task marker in rich-text mode, addressed by its position in
    /// rendering order. Rich markup restructures lines, so the position is
    /// matched against an independent scan of the raw task lines.
    TaskMarker(usize),
    /// Anywhere else on the display surface.
    Text,
}
