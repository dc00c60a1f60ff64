//! Contract between the graph manager and the platform audio API.
//!
//! The host owns the real-time rendering thread. The manager only creates
//! nodes, wires them, schedules parameter changes on the context timeline and
//! reads analysis data back; it never assumes a call has taken audible effect.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::AudioGraphConfig;
use crate::error::HostError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    LowShelf,
    Peaking,
    HighShelf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Gain,
    Filter(FilterKind),
    Compressor,
    Delay,
    Convolver,
    Analyser { fft_size: u32 },
}

/// Automatable parameters across node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AudioParam {
    Gain,
    Frequency,
    Q,
    Threshold,
    Knee,
    Ratio,
    Attack,
    Release,
    DelayTime,
    Feedback,
    Mix,
    Decay,
}

/// Where a node's output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Node(NodeId),
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContextState {
    #[default]
    Suspended,
    Running,
    Closed,
}

/// Parameter change placed on the context timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamChange {
    pub value: f64,
    /// Context time (seconds) at which the change starts.
    pub at: f64,
    /// Linear ramp length in seconds; 0 sets the value at `at`.
    pub ramp: f64,
}

impl ParamChange {
    pub fn immediate(value: f64, at: f64) -> Self {
        Self {
            value,
            at,
            ramp: 0.0,
        }
    }

    pub fn ramped(value: f64, at: f64, ramp: f64) -> Self {
        Self {
            value,
            at,
            ramp: ramp.max(0.0),
        }
    }
}

/// Factory for processing contexts.
pub trait AudioHost: Send + Sync + 'static {
    type Context: AudioContext;

    /// Creates a context at the configured sample rate. May complete later
    /// than the caller expects (permission prompts, device wake-up).
    fn create_context(
        &self,
        config: &AudioGraphConfig,
    ) -> impl Future<Output = Result<Self::Context, HostError>> + Send;
}

/// A live processing context. Handles are cheap clones of the same context.
pub trait AudioContext: Clone + Send + Sync + 'static {
    fn sample_rate(&self) -> u32;

    /// Context timeline in seconds. Only advances while running.
    fn current_time(&self) -> f64;

    fn state(&self) -> ContextState;

    fn resume(&self) -> impl Future<Output = Result<(), HostError>> + Send;

    fn create_node(&self, kind: NodeKind) -> Result<NodeId, HostError>;

    fn connect(&self, from: NodeId, to: Endpoint) -> Result<(), HostError>;

    fn schedule_param(
        &self,
        node: NodeId,
        param: AudioParam,
        change: ParamChange,
    ) -> Result<(), HostError>;

    /// Current byte frequency data of an analyser node.
    fn analyser_data(&self, node: NodeId) -> Result<Vec<u8>, HostError>;

    /// Releases the context. Idempotent.
    fn close(&self);
}
