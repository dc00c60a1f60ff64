//! Drives a [`SyncSession`] from a tokio interval.

use std::sync::Arc;
use std::time::Duration;

use fretsync_core::{FrameScheduler, FrameTask, TickControl};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::session::SyncSession;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Per-frame task running the session pipeline until the session is disposed.
struct SessionTask {
    session: Arc<Mutex<SyncSession>>,
}

impl FrameTask for SessionTask {
    fn tick(&mut self, now: Duration) -> TickControl {
        let mut session = self.session.lock();
        if session.is_disposed() {
            return TickControl::Stop;
        }
        session.on_frame(now);
        TickControl::Continue
    }
}

/// Handle to a running frame driver.
pub struct FrameDriver {
    task: JoinHandle<u64>,
}

impl FrameDriver {
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the driver without waiting for the session to be disposed.
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Waits for the driver to finish. Returns the number of frames run, or
    /// `None` if it was aborted.
    pub async fn join(self) -> Option<u64> {
        self.task.await.ok()
    }
}

/// Spawns a task on `runtime` that runs one session frame every `period`.
///
/// Frame timestamps are measured from the moment the driver starts. Missed
/// ticks are skipped rather than bunched. The task ends by itself once the
/// session is disposed.
pub fn spawn_frame_driver(
    runtime: &Handle,
    session: Arc<Mutex<SyncSession>>,
    period: Duration,
) -> FrameDriver {
    let period = period.max(MIN_PERIOD);
    let task = runtime.spawn(async move {
        let mut scheduler = FrameScheduler::new();
        scheduler.schedule(SessionTask { session });

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let origin = Instant::now();

        while !scheduler.is_empty() {
            let at = interval.tick().await;
            scheduler.run_frame(at.saturating_duration_since(origin));
        }

        tracing::debug!(frames = scheduler.frames(), "Frame driver finished");
        scheduler.frames()
    });
    FrameDriver { task }
}
