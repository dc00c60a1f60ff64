//! Transport capability backed by the audio graph.

use std::sync::Arc;

use fretsync_core::PlaybackControls;
use fretsync_graph::{AudioGraphManager, AudioHost};
use tokio::runtime::Handle;

/// Routes store transport calls to an [`AudioGraphManager`].
///
/// `play` is async on the graph side (it may initialize the context first),
/// so it is spawned on `runtime`. Failures are reported through the graph's
/// `Error` event and logged here.
pub struct GraphControls<H: AudioHost> {
    graph: Arc<AudioGraphManager<H>>,
    runtime: Handle,
}

impl<H: AudioHost> GraphControls<H> {
    pub fn new(graph: Arc<AudioGraphManager<H>>, runtime: Handle) -> Self {
        Self { graph, runtime }
    }

    pub fn graph(&self) -> &Arc<AudioGraphManager<H>> {
        &self.graph
    }
}

impl<H: AudioHost> PlaybackControls for GraphControls<H> {
    fn play(&self) {
        let graph = Arc::clone(&self.graph);
        self.runtime.spawn(async move {
            if let Err(err) = graph.start().await {
                tracing::error!(%err, "Failed to start playback");
            }
        });
    }

    fn pause(&self) {
        self.graph.pause();
    }

    fn stop(&self) {
        self.graph.stop();
    }

    fn toggle(&self) {
        if self.graph.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn seek(&self, time: f64) {
        self.graph.seek(time);
    }

    fn set_volume(&self, volume: f64) {
        self.graph.set_volume(volume);
    }
}
