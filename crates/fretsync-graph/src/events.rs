//! Typed lifecycle and parameter events of the audio graph.
//!
//! Listeners register per [`GraphEventKind`]. Each callback runs in its own
//! `catch_unwind`, so one panicking listener never stops the others. Channel
//! subscribers receive every event.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::effects::EffectKind;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    Initialized { sample_rate: u32 },
    Started,
    Stopped,
    Paused,
    VolumeChanged { volume: f64 },
    TempoChanged { bpm: f64 },
    EffectApplied { kind: EffectKind, enabled: bool },
    Error { message: String },
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphEventKind {
    Initialized,
    Started,
    Stopped,
    Paused,
    VolumeChanged,
    TempoChanged,
    EffectApplied,
    Error,
    Disposed,
}

impl GraphEvent {
    pub fn kind(&self) -> GraphEventKind {
        match self {
            GraphEvent::Initialized { .. } => GraphEventKind::Initialized,
            GraphEvent::Started => GraphEventKind::Started,
            GraphEvent::Stopped => GraphEventKind::Stopped,
            GraphEvent::Paused => GraphEventKind::Paused,
            GraphEvent::VolumeChanged { .. } => GraphEventKind::VolumeChanged,
            GraphEvent::TempoChanged { .. } => GraphEventKind::TempoChanged,
            GraphEvent::EffectApplied { .. } => GraphEventKind::EffectApplied,
            GraphEvent::Error { .. } => GraphEventKind::Error,
            GraphEvent::Disposed => GraphEventKind::Disposed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&GraphEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    listeners: HashMap<GraphEventKind, Vec<(ListenerId, Listener)>>,
    channels: Vec<Sender<GraphEvent>>,
    next_id: u64,
}

/// Result of one [`EventBus::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub panicked: usize,
}

#[derive(Default)]
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&self, kind: GraphEventKind, listener: F) -> ListenerId
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner
            .listeners
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn off(&self, kind: GraphEventKind, id: ListenerId) -> bool {
        let mut inner = self.inner.lock();
        let Some(listeners) = inner.listeners.get_mut(&kind) else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Channel receiving every subsequent event.
    pub fn subscribe(&self) -> Receiver<GraphEvent> {
        let (tx, rx) = unbounded();
        self.inner.lock().channels.push(tx);
        rx
    }

    pub fn listener_count(&self, kind: GraphEventKind) -> usize {
        self.inner
            .lock()
            .listeners
            .get(&kind)
            .map_or(0, Vec::len)
    }

    pub fn emit(&self, event: GraphEvent) -> Delivery {
        let kind = event.kind();
        let listeners: SmallVec<[Listener; 4]> = {
            let mut inner = self.inner.lock();
            inner.channels.retain(|tx| tx.send(event.clone()).is_ok());
            inner
                .listeners
                .get(&kind)
                .map(|listeners| listeners.iter().map(|(_, l)| Arc::clone(l)).collect())
                .unwrap_or_default()
        };

        let mut delivery = Delivery::default();
        for listener in listeners {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(&event))) {
                Ok(()) => delivery.delivered += 1,
                Err(_) => {
                    delivery.panicked += 1;
                    tracing::error!(?kind, "Graph event listener panicked");
                }
            }
        }
        delivery
    }

    /// Drops every listener and closes every channel.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.listeners.clear();
        inner.channels.clear();
    }
}
