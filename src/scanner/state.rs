//! Scanner lifecycle state machine.
//!
//! # State Transitions
//! ```text
//! Stopped  → Starting: start()
//! Starting → Running:  watched set loaded, loop spawned
//! Running  → Stopping: stop()
//! Stopping → Running:  start() before the loop noticed the stop
//! Stopping → Stopped:  loop observed the request at the top of a cycle
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use thiserror::Error;

use crate::treasury::store::StoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScannerState {
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl ScannerState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ScannerState::Starting,
            2 => ScannerState::Running,
            3 => ScannerState::Stopping,
            _ => ScannerState::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScannerState::Stopped => "stopped",
            ScannerState::Starting => "starting",
            ScannerState::Running => "running",
            ScannerState::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ScannerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomically updated [`ScannerState`].
#[derive(Debug)]
pub struct AtomicState(AtomicU8);

impl AtomicState {
    pub fn new(state: ScannerState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> ScannerState {
        ScannerState::from_u8(self.0.load(Ordering::SeqCst))
    }

    pub fn store(&self, state: ScannerState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    /// Move `from → to`; on failure returns the actual current state.
    pub fn transition(&self, from: ScannerState, to: ScannerState) -> Result<(), ScannerState> {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .map(|_| ())
            .map_err(ScannerState::from_u8)
    }
}

/// Errors surfaced by the scanner's external surface.
#[derive(Debug, Error)]
pub enum ScannerError {
    /// Caller passed something that is not an address.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// No metrics observed yet for this address.
    #[error("no data for {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ScannerError {
    /// HTTP-equivalent status for a serving layer.
    pub fn status_code(&self) -> u16 {
        match self {
            ScannerError::InvalidAddress(_) => 400,
            ScannerError::NotFound(_) => 404,
            ScannerError::Store(_) => 500,
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
