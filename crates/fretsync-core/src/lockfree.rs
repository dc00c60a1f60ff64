//! Lock-free cells read on the frame path while another thread writes them.

use atomic_float::AtomicF64;
use std::sync::atomic::{AtomicBool, Ordering};

/// An `f64` with one writer (the graph, a headless clock) and any number of
/// readers polling it each frame.
#[derive(Debug)]
pub struct AtomicDouble(AtomicF64);

impl AtomicDouble {
    pub fn new(value: f64) -> Self {
        Self(AtomicF64::new(value))
    }

    #[inline]
    pub fn get(&self) -> f64 {
        self.0.load(Ordering::Acquire)
    }

    #[inline]
    pub fn set(&self, value: f64) {
        self.0.store(value, Ordering::Release);
    }

    /// Moves the value forward by `delta` and returns the new value.
    pub fn advance(&self, delta: f64) -> f64 {
        self.0.fetch_add(delta, Ordering::AcqRel) + delta
    }
}

/// Running flag of a frame sampler, shared with its handles.
#[derive(Debug, Default)]
pub struct RunFlag(AtomicBool);

impl RunFlag {
    /// Returns `true` if the flag was lowered before.
    pub fn raise(&self) -> bool {
        !self.0.swap(true, Ordering::AcqRel)
    }

    /// Returns `true` if the flag was raised before.
    pub fn lower(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
