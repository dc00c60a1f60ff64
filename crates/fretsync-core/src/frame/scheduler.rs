//! Cooperative frame scheduling.
//!
//! A host (display refresh callback, tokio interval, test loop) calls
//! [`FrameScheduler::run_frame`] once per frame. Each task decides whether it
//! wants the next frame by returning [`TickControl`].

use std::time::Duration;

use smallvec::SmallVec;

use super::sampler::{FramePoll, FrameSampler, SamplerHandle};
use super::source::FrameSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// Re-arm for the next frame.
    Continue,
    /// Drop this task; it will not be ticked again.
    Stop,
}

/// Unit of per-frame work.
pub trait FrameTask: Send {
    fn tick(&mut self, now: Duration) -> TickControl;
}

impl<F> FrameTask for F
where
    F: FnMut(Duration) -> TickControl + Send,
{
    fn tick(&mut self, now: Duration) -> TickControl {
        self(now)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// What one call to [`FrameScheduler::run_frame`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub ticked: usize,
    pub finished: SmallVec<[TaskId; 4]>,
}

/// Holds frame tasks and ticks them in registration order.
#[derive(Default)]
pub struct FrameScheduler {
    tasks: Vec<(TaskId, Box<dyn FrameTask>)>,
    next_id: u64,
    frames: u64,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, task: impl FrameTask + 'static) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push((id, Box::new(task)));
        tracing::trace!(?id, "Scheduled frame task");
        id
    }

    /// Cancels a task before its next tick.
    pub fn remove(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|(task_id, _)| *task_id != id);
        self.tasks.len() != before
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.tasks.iter().any(|(task_id, _)| *task_id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Frames run so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Ticks every task once, then drops those that returned [`TickControl::Stop`].
    pub fn run_frame(&mut self, now: Duration) -> FrameReport {
        self.frames += 1;
        let mut report = FrameReport::default();

        for (id, task) in &mut self.tasks {
            report.ticked += 1;
            if task.tick(now) == TickControl::Stop {
                report.finished.push(*id);
            }
        }

        if !report.finished.is_empty() {
            self.tasks.retain(|(id, _)| !report.finished.contains(id));
        }
        report
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

/// Binds a [`FrameSampler`] to the callback that consumes its samples.
///
/// Stays scheduled while the sampler is stopped, so starting it again through
/// its [`SamplerHandle`] resumes delivery. The owner tears the loop down with
/// [`FrameScheduler::remove`].
pub struct FrameLoop<F> {
    sampler: FrameSampler,
    on_sample: F,
    delivered: u64,
}

impl<F> FrameLoop<F>
where
    F: FnMut(&FrameSample) + Send,
{
    pub fn new(sampler: FrameSampler, on_sample: F) -> Self {
        Self {
            sampler,
            on_sample,
            delivered: 0,
        }
    }

    pub fn handle(&self) -> SamplerHandle {
        self.sampler.handle()
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    pub fn sampler_mut(&mut self) -> &mut FrameSampler {
        &mut self.sampler
    }

    /// Samples forwarded to the callback.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl<F> FrameTask for FrameLoop<F>
where
    F: FnMut(&FrameSample) + Send,
{
    fn tick(&mut self, now: Duration) -> TickControl {
        match self.sampler.poll(now) {
            FramePoll::Stopped => TickControl::Continue,
            FramePoll::Idle(reason) => {
                tracing::trace!(?reason, "Frame idle");
                TickControl::Continue
            }
            FramePoll::Sampled(sample) => {
                self.delivered += 1;
                (self.on_sample)(&sample);
                TickControl::Continue
            }
        }
    }
}
