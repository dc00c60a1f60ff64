//! Umbrella error type.

use thiserror::Error;

/// Error type for fretsync sessions.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] fretsync_core::Error),

    #[cfg(feature = "graph")]
    #[error(transparent)]
    Graph(#[from] fretsync_graph::Error),

    /// The session was disposed; it only answers queries from here on.
    #[error("Session disposed")]
    Disposed,
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
