//! Polling subsystem
//!
//! Drives the steady-state read loop on the negotiated endpoint:
//!
//! 1. [`ReportSource`] - Blocking read with timeout plus release (USB or scripted)
//! 2. [`report_poller`] - `Polling` → `Stopped` state machine
//! 3. [`ReportSink`] - Receives every decoded frame and terminal message
//!
//! # Architecture
//!
//! ```text
//! ReportSource ──► ReportPoller<Polling> ──► decode ──► ReportSink
//!   (100ms timeout)       │
//!                         └─► ReportPoller<Stopped> (endpoint released)
//! ```
//!
//! The loop is single-threaded and synchronous; cancellation is checked once per
//! iteration, so the transfer timeout bounds how long a stop request can wait.

pub mod report_poller;

use chrono::{DateTime, Local};
use std::time::Duration;

use crate::report::{ControllerState, DecodeError};

pub use report_poller::{PollState, PollStats, Polling, ReportPoller, StopReason, Stopped};

/// Timeout for a single interrupt transfer.
pub const TRANSFER_TIMEOUT: Duration = Duration::from_millis(100);

// Transfer errors, split by how the loop reacts to them
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransferError {
    /// No report arrived within the timeout; expected in steady state.
    #[error("Transfer timed out")]
    Timeout,

    #[error("Transfer failed: {0}")]
    Failed(String),
}

/// Endpoint the poller reads reports from.
pub trait ReportSource: Send + 'static {
    /// Size of the read buffer handed to [`ReportSource::read_report`].
    fn max_packet_size(&self) -> usize;

    /// Blocks for at most `timeout`, returning the number of bytes written to `buf`.
    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransferError>;

    /// Gives the endpoint back. Called once when polling stops.
    fn release(&mut self) -> Result<(), TransferError>;
}

/// One successfully decoded report.
#[derive(Debug, Clone)]
pub struct ReportFrame<'a> {
    pub raw: &'a [u8],
    pub state: ControllerState,
    pub received_at: DateTime<Local>,
}

/// Presentation side of the loop.
///
/// Nothing returned from a sink flows back into polling.
pub trait ReportSink: Send + 'static {
    fn on_report(&mut self, frame: &ReportFrame<'_>);

    fn on_decode_error(&mut self, raw: &[u8], error: &DecodeError);

    /// A transfer failed and the loop is about to stop.
    fn on_fatal(&mut self, message: &str);

    fn on_stop(&mut self, _reason: &StopReason) {}
}

// Poller settings
#[derive(Clone, Debug)]
pub struct PollSettings {
    pub transfer_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            transfer_timeout: TRANSFER_TIMEOUT,
            poll_interval: Duration::from_millis(100),
        }
    }
}
