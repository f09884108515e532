//! Shutdown Coordinator
//!
//! A single signal observed cooperatively by the acceptor and every session.
//!
//! ## States
//! ```text
//! Running ──trigger()──> ShuttingDown ──mark_stopped()──> Stopped
//! ```
//! Transitions are compare-and-swap, so triggering twice is a harmless
//! no-op.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Lifecycle state of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ShutdownState {
    Running = 0,
    ShuttingDown = 1,
    Stopped = 2,
}

impl ShutdownState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ShutdownState::Running,
            1 => ShutdownState::ShuttingDown,
            _ => ShutdownState::Stopped,
        }
    }
}

/// Cloneable handle to the shared shutdown state
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(ShutdownState::Running as u8)),
        }
    }

    /// Request shutdown
    ///
    /// Returns `true` only for the call that moved the state out of
    /// `Running`; later calls change nothing and return `false`.
    pub fn trigger(&self) -> bool {
        self.state
            .compare_exchange(
                ShutdownState::Running as u8,
                ShutdownState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Record that the acceptor and sessions have wound down
    pub fn mark_stopped(&self) {
        self.state
            .store(ShutdownState::Stopped as u8, Ordering::Release);
    }

    pub fn state(&self) -> ShutdownState {
        ShutdownState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once shutdown has been requested
    pub fn is_shutting_down(&self) -> bool {
        self.state() != ShutdownState::Running
    }
}
