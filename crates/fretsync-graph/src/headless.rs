//! Software audio host with a hand-driven timeline.
//!
//! Runs the full manager lifecycle without an audio device: contexts keep a
//! node graph and parameter ramps, time advances only when told to, and
//! failures or slow context creation and resume can be injected.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use fretsync_core::AtomicDouble;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::config::AudioGraphConfig;
use crate::error::HostError;
use crate::host::{
    AudioContext, AudioHost, AudioParam, ContextState, Endpoint, NodeId, NodeKind, ParamChange,
};

/// Linear ramp between two values on the context timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ParamRamp {
    from: f64,
    to: f64,
    start: f64,
    end: f64,
}

impl ParamRamp {
    fn constant(value: f64) -> Self {
        Self {
            from: value,
            to: value,
            start: 0.0,
            end: 0.0,
        }
    }

    fn value_at(&self, time: f64) -> f64 {
        if time >= self.end {
            // Snap to target once the ramp is done
            self.to
        } else if time <= self.start {
            self.from
        } else {
            let fraction = (time - self.start) / (self.end - self.start);
            self.from + (self.to - self.from) * fraction
        }
    }

    /// Starts a new ramp from wherever this one is at `change.at`.
    fn retarget(&self, change: ParamChange) -> Self {
        Self {
            from: self.value_at(change.at),
            to: change.value,
            start: change.at,
            end: change.at + change.ramp,
        }
    }
}

fn default_value(param: AudioParam) -> f64 {
    match param {
        AudioParam::Gain => 1.0,
        AudioParam::Frequency => 350.0,
        AudioParam::Q => 1.0,
        AudioParam::Threshold => -24.0,
        AudioParam::Knee => 30.0,
        AudioParam::Ratio => 12.0,
        AudioParam::Attack => 0.003,
        AudioParam::Release => 0.25,
        AudioParam::DelayTime
        | AudioParam::Feedback
        | AudioParam::Mix
        | AudioParam::Decay => 0.0,
    }
}

#[derive(Debug)]
struct NodeRecord {
    kind: NodeKind,
    params: HashMap<AudioParam, ParamRamp>,
}

#[derive(Debug, Default)]
struct NodeGraph {
    nodes: Vec<NodeRecord>,
    connections: Vec<(NodeId, Endpoint)>,
}

/// Slot a [`HostGate`] installs its semaphore into.
type GateSlot = Arc<Mutex<Option<Arc<Semaphore>>>>;

async fn pass(gate: Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        // Closed when released
        let _ = gate.acquire().await;
    }
}

#[derive(Debug)]
struct ContextShared {
    sample_rate: u32,
    time: AtomicDouble,
    state: Mutex<ContextState>,
    graph: Mutex<NodeGraph>,
    fail_node: Option<NodeKind>,
    resume_gate: GateSlot,
}

/// Handle to a headless context. Clones share the same context.
#[derive(Debug, Clone)]
pub struct HeadlessContext {
    shared: Arc<ContextShared>,
}

impl HeadlessContext {
    fn new(
        sample_rate: u32,
        initial: ContextState,
        fail_node: Option<NodeKind>,
        resume_gate: GateSlot,
    ) -> Self {
        Self {
            shared: Arc::new(ContextShared {
                sample_rate,
                time: AtomicDouble::new(0.0),
                state: Mutex::new(initial),
                graph: Mutex::new(NodeGraph::default()),
                fail_node,
                resume_gate,
            }),
        }
    }

    /// Moves the timeline forward. No-op unless running.
    pub fn advance(&self, seconds: f64) {
        if *self.shared.state.lock() == ContextState::Running && seconds > 0.0 {
            self.shared.time.advance(seconds);
        }
    }

    pub fn suspend(&self) {
        let mut state = self.shared.state.lock();
        if *state == ContextState::Running {
            *state = ContextState::Suspended;
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.shared.state.lock() == ContextState::Closed
    }

    /// Value of `param` on `node` at the current context time.
    pub fn param_value(&self, node: NodeId, param: AudioParam) -> Option<f64> {
        let now = self.current_time();
        let graph = self.shared.graph.lock();
        let record = graph.nodes.get(node.0 as usize)?;
        Some(
            record
                .params
                .get(&param)
                .map_or(default_value(param), |ramp| ramp.value_at(now)),
        )
    }

    pub fn node_kinds(&self) -> Vec<NodeKind> {
        self.shared
            .graph
            .lock()
            .nodes
            .iter()
            .map(|record| record.kind)
            .collect()
    }

    pub fn find_node(&self, kind: NodeKind) -> Option<NodeId> {
        self.shared
            .graph
            .lock()
            .nodes
            .iter()
            .position(|record| record.kind == kind)
            .map(|index| NodeId(index as u32))
    }

    /// Kinds along the signal path starting at `from`, until the destination
    /// or a node with no outgoing connection.
    pub fn signal_path(&self, from: NodeId) -> Vec<NodeKind> {
        let graph = self.shared.graph.lock();
        let mut path = Vec::new();
        let mut current = Some(from);
        while let Some(node) = current {
            let Some(record) = graph.nodes.get(node.0 as usize) else {
                break;
            };
            if path.len() > graph.nodes.len() {
                break;
            }
            path.push(record.kind);
            current = graph
                .connections
                .iter()
                .find(|(source, _)| *source == node)
                .and_then(|(_, endpoint)| match endpoint {
                    Endpoint::Node(next) => Some(*next),
                    Endpoint::Destination => None,
                });
        }
        path
    }

    pub fn reaches_destination(&self, from: NodeId) -> bool {
        let graph = self.shared.graph.lock();
        let mut current = from;
        for _ in 0..=graph.nodes.len() {
            match graph.connections.iter().find(|(source, _)| *source == current) {
                Some((_, Endpoint::Destination)) => return true,
                Some((_, Endpoint::Node(next))) => current = *next,
                None => return false,
            }
        }
        false
    }

    fn ensure_open(&self) -> Result<(), HostError> {
        if self.is_closed() {
            Err(HostError::Closed)
        } else {
            Ok(())
        }
    }
}

impl AudioContext for HeadlessContext {
    fn sample_rate(&self) -> u32 {
        self.shared.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.shared.time.get()
    }

    fn state(&self) -> ContextState {
        *self.shared.state.lock()
    }

    fn resume(&self) -> impl Future<Output = Result<(), HostError>> + Send {
        let shared = Arc::clone(&self.shared);
        let gate = shared.resume_gate.lock().clone();
        async move {
            pass(gate).await;
            let mut state = shared.state.lock();
            match *state {
                ContextState::Closed => Err(HostError::Closed),
                _ => {
                    *state = ContextState::Running;
                    Ok(())
                }
            }
        }
    }

    fn create_node(&self, kind: NodeKind) -> Result<NodeId, HostError> {
        self.ensure_open()?;
        if self.shared.fail_node == Some(kind) {
            return Err(HostError::NodeCreation {
                kind,
                reason: "injected failure".into(),
            });
        }
        let mut graph = self.shared.graph.lock();
        let id = NodeId(graph.nodes.len() as u32);
        graph.nodes.push(NodeRecord {
            kind,
            params: HashMap::new(),
        });
        Ok(id)
    }

    fn connect(&self, from: NodeId, to: Endpoint) -> Result<(), HostError> {
        self.ensure_open()?;
        let mut graph = self.shared.graph.lock();
        let known = |id: NodeId| (id.0 as usize) < graph.nodes.len();
        if !known(from) {
            return Err(HostError::UnknownNode(from));
        }
        if let Endpoint::Node(target) = to {
            if !known(target) {
                return Err(HostError::UnknownNode(target));
            }
        }
        graph.connections.push((from, to));
        Ok(())
    }

    fn schedule_param(
        &self,
        node: NodeId,
        param: AudioParam,
        change: ParamChange,
    ) -> Result<(), HostError> {
        self.ensure_open()?;
        let mut graph = self.shared.graph.lock();
        let record = graph
            .nodes
            .get_mut(node.0 as usize)
            .ok_or(HostError::UnknownNode(node))?;
        let ramp = record
            .params
            .entry(param)
            .or_insert_with(|| ParamRamp::constant(default_value(param)));
        *ramp = ramp.retarget(change);
        Ok(())
    }

    fn analyser_data(&self, node: NodeId) -> Result<Vec<u8>, HostError> {
        self.ensure_open()?;
        let now = self.current_time();
        let graph = self.shared.graph.lock();
        let fft_size = match graph.nodes.get(node.0 as usize).map(|record| record.kind) {
            Some(NodeKind::Analyser { fft_size }) => fft_size,
            _ => return Err(HostError::UnknownNode(node)),
        };

        // Flat spectrum at the level of the input gain
        let level = graph
            .nodes
            .iter()
            .find(|record| record.kind == NodeKind::Gain)
            .and_then(|record| record.params.get(&AudioParam::Gain))
            .map_or(1.0, |ramp| ramp.value_at(now));
        let byte = (level.clamp(0.0, 1.0) * 255.0).round() as u8;
        Ok(vec![byte; (fft_size / 2) as usize])
    }

    fn close(&self) {
        *self.shared.state.lock() = ContextState::Closed;
    }
}

#[derive(Debug, Default)]
struct HostShared {
    fail_next_context: Mutex<Option<String>>,
    fail_node: Mutex<Option<NodeKind>>,
    creation_gate: GateSlot,
    resume_gate: GateSlot,
    contexts: Mutex<Vec<HeadlessContext>>,
    start_running: bool,
}

/// Holds a host operation pending until released or dropped.
#[derive(Debug)]
pub struct HostGate {
    slot: GateSlot,
    semaphore: Arc<Semaphore>,
}

impl HostGate {
    fn install(slot: &GateSlot) -> Self {
        let semaphore = Arc::new(Semaphore::new(0));
        *slot.lock() = Some(Arc::clone(&semaphore));
        Self {
            slot: Arc::clone(slot),
            semaphore,
        }
    }

    pub fn release(self) {}
}

impl Drop for HostGate {
    fn drop(&mut self) {
        let mut gate = self.slot.lock();
        if gate
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &self.semaphore))
        {
            *gate = None;
        }
        // Wakes every waiter
        self.semaphore.close();
    }
}

/// In-process [`AudioHost`]. Clones share configuration and created contexts.
#[derive(Debug, Clone, Default)]
pub struct HeadlessHost {
    shared: Arc<HostShared>,
}

impl HeadlessHost {
    /// Contexts start suspended, as browsers do before a user gesture.
    pub fn new() -> Self {
        Self::default()
    }

    /// Contexts start already running.
    pub fn running() -> Self {
        Self {
            shared: Arc::new(HostShared {
                start_running: true,
                ..HostShared::default()
            }),
        }
    }

    /// The next `create_context` fails with `message`.
    pub fn fail_next_context(&self, message: impl Into<String>) {
        *self.shared.fail_next_context.lock() = Some(message.into());
    }

    /// Contexts created from now on fail to create nodes of `kind`.
    pub fn fail_node(&self, kind: NodeKind) {
        *self.shared.fail_node.lock() = Some(kind);
    }

    pub fn clear_failures(&self) {
        *self.shared.fail_next_context.lock() = None;
        *self.shared.fail_node.lock() = None;
    }

    /// Makes every `create_context` wait until the returned gate is released.
    pub fn hold_creation(&self) -> HostGate {
        HostGate::install(&self.shared.creation_gate)
    }

    /// Makes every context `resume` wait until the returned gate is released.
    pub fn hold_resume(&self) -> HostGate {
        HostGate::install(&self.shared.resume_gate)
    }

    pub fn contexts_created(&self) -> usize {
        self.shared.contexts.lock().len()
    }

    pub fn open_contexts(&self) -> usize {
        self.shared
            .contexts
            .lock()
            .iter()
            .filter(|context| !context.is_closed())
            .count()
    }

    pub fn last_context(&self) -> Option<HeadlessContext> {
        self.shared.contexts.lock().last().cloned()
    }
}

impl AudioHost for HeadlessHost {
    type Context = HeadlessContext;

    fn create_context(
        &self,
        config: &AudioGraphConfig,
    ) -> impl Future<Output = Result<HeadlessContext, HostError>> + Send {
        let shared = Arc::clone(&self.shared);
        let sample_rate = config.sample_rate;
        let gate = shared.creation_gate.lock().clone();

        async move {
            pass(gate).await;

            if let Some(message) = shared.fail_next_context.lock().take() {
                return Err(HostError::ContextUnavailable(message));
            }

            let initial = if shared.start_running {
                ContextState::Running
            } else {
                ContextState::Suspended
            };
            let fail_node = *shared.fail_node.lock();
            let context = HeadlessContext::new(
                sample_rate,
                initial,
                fail_node,
                Arc::clone(&shared.resume_gate),
            );
            shared.contexts.lock().push(context.clone());
            tracing::debug!(sample_rate, "Created headless audio context");
            Ok(context)
        }
    }
}
