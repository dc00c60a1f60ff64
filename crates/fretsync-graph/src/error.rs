//! Error types for fretsync-graph.

use thiserror::Error;

use crate::host::{NodeId, NodeKind};

/// Failures reported by an [`AudioHost`](crate::AudioHost) or its context.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Audio context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("Failed to create {kind:?} node: {reason}")]
    NodeCreation { kind: NodeKind, reason: String },

    #[error("Failed to connect {from:?}: {reason}")]
    Connection { from: NodeId, reason: String },

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Audio context is closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Host(#[from] HostError),

    #[error("Audio graph is not initialized")]
    NotInitialized,

    #[error("Audio graph has been disposed")]
    Disposed,

    #[error("Unknown effect: {0}")]
    UnknownEffect(String),

    #[error(transparent)]
    Core(#[from] fretsync_core::Error),
}

pub type Result<T> = core::result::Result<T, Error>;
