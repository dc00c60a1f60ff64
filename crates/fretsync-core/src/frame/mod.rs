//! Frame sampling loop: reads the audio clock once per display frame.

pub(crate) mod sampler;
pub(crate) mod scheduler;
pub(crate) mod source;

pub use sampler::{FramePoll, FrameSampler, IdleReason, SamplerHandle, SamplerOptions, SamplerState};
pub use scheduler::{FrameLoop, FrameReport, FrameScheduler, FrameTask, TaskId, TickControl};
pub use source::{FrameSample, TimeReading, TimeSource};
