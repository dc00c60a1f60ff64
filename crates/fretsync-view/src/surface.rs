//! Host UI collaborators fed by the sync pipeline.

use fretsync_core::BeatMarker;

use crate::cursor::CursorPosition;
use crate::scroll::{ScrollCommand, ViewportMetrics};

/// Scrollable container around the notation.
pub trait ScrollViewport: Send {
    fn metrics(&self) -> ViewportMetrics;

    /// Apply a scroll. The behavior is a hint.
    fn scroll(&mut self, command: ScrollCommand);
}

/// Draws the playback cursor and the static beat overlay.
pub trait RenderSurface: Send {
    fn move_cursor(&mut self, position: CursorPosition);

    fn draw_markers(&mut self, markers: &[BeatMarker]);
}
