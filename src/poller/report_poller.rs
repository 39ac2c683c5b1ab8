//! Report poller with statum state machine
//!
//! # State Machine
//!
//! ```text
//! Polling ──(cancel | fatal transfer error)──► Stopped(StopReason)
//!    ▲  │
//!    └──┘ (report, timeout, short report)
//! ```
//!
//! Entering `Stopped` releases the endpoint. Because `stop` consumes the
//! `Polling` machine, the release happens exactly once per session.

use chrono::Local;
use statum::{machine, state};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{PollSettings, ReportFrame, ReportSink, ReportSource, TransferError};
use crate::report::decode;

/// Why polling ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The user asked to stop.
    Cancelled,
    /// A non-timeout transfer error.
    TransferFailed(String),
}

// Counters kept for the stop log line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub reports: u64,
    pub timeouts: u64,
    pub empty_reads: u64,
    pub decode_errors: u64,
}

#[state]
#[derive(Debug, Clone)]
pub enum PollState {
    Polling,
    Stopped(StopReason),
}

#[machine]
pub struct ReportPoller<S: PollState> {
    source: Box<dyn ReportSource>,
    sink: Box<dyn ReportSink>,
    settings: PollSettings,
    buffer: Vec<u8>,
    stats: PollStats,
}

impl<S: PollState> ReportPoller<S> {
    pub fn stats(&self) -> PollStats {
        self.stats
    }
}

impl ReportPoller<Polling> {
    pub fn create(
        source: Box<dyn ReportSource>,
        sink: Box<dyn ReportSink>,
        settings: Option<PollSettings>,
    ) -> Self {
        let settings = settings.unwrap_or_default();
        let buffer = vec![0u8; source.max_packet_size()];
        info!(
            "Creating report poller: buffer {} bytes, settings {:?}",
            buffer.len(),
            settings
        );

        Self::new(source, sink, settings, buffer, PollStats::default())
    }

    /// Runs one read-decode step.
    ///
    /// Returns `Some` when the loop has to stop; timeouts, empty reads and short
    /// reports keep it running.
    pub fn poll_once(&mut self) -> Option<StopReason> {
        match self
            .source
            .read_report(&mut self.buffer, self.settings.transfer_timeout)
        {
            Ok(0) => {
                trace!("Empty transfer");
                self.stats.empty_reads += 1;
                None
            }
            Ok(len) => {
                let raw = &self.buffer[..len];
                match decode(raw) {
                    Ok(state) => {
                        debug!("Decoded report ({} bytes): {:?}", len, state);
                        self.stats.reports += 1;
                        self.sink.on_report(&ReportFrame {
                            raw,
                            state,
                            received_at: Local::now(),
                        });
                    }
                    Err(e) => {
                        warn!("Skipping report: {}", e);
                        self.stats.decode_errors += 1;
                        self.sink.on_decode_error(raw, &e);
                    }
                }
                None
            }
            Err(TransferError::Timeout) => {
                trace!("Transfer timed out");
                self.stats.timeouts += 1;
                None
            }
            Err(TransferError::Failed(detail)) => {
                error!("USB Error: {}", detail);
                self.sink.on_fatal(&detail);
                Some(StopReason::TransferFailed(detail))
            }
        }
    }

    /// Polls until cancelled or a transfer fails, then stops.
    pub fn run(mut self, cancel: &CancellationToken) -> ReportPoller<Stopped> {
        info!("Reading input data");

        let reason = loop {
            if cancel.is_cancelled() {
                info!("Cancellation requested");
                break StopReason::Cancelled;
            }

            if let Some(reason) = self.poll_once() {
                break reason;
            }

            // Bounds CPU usage between transfers
            if !self.settings.poll_interval.is_zero() {
                std::thread::sleep(self.settings.poll_interval);
            }
        };

        self.stop(reason)
    }

    /// Releases the endpoint and transitions to `Stopped`.
    ///
    /// Release failures are logged only; `reason` is kept as the exit reason.
    pub fn stop(mut self, reason: StopReason) -> ReportPoller<Stopped> {
        match self.source.release() {
            Ok(()) => debug!("Endpoint released"),
            Err(e) => warn!("Ignoring failure while releasing endpoint: {}", e),
        }

        info!(
            "Poller stopped ({:?}): {} reports, {} timeouts, {} empty reads, {} short reports",
            reason,
            self.stats.reports,
            self.stats.timeouts,
            self.stats.empty_reads,
            self.stats.decode_errors
        );
        self.sink.on_stop(&reason);

        self.transition_with(reason)
    }
}

impl ReportPoller<Stopped> {
    pub fn reason(&self) -> StopReason {
        self.get_state_data()
            .cloned()
            .unwrap_or(StopReason::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ControllerState, DecodeError};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Default)]
    struct Log {
        states: Vec<ControllerState>,
        decode_errors: usize,
        fatal: Vec<String>,
        releases: usize,
    }

    struct Scripted {
        steps: VecDeque<Result<Vec<u8>, TransferError>>,
        log: Arc<Mutex<Log>>,
    }

    impl ReportSource for Scripted {
        fn max_packet_size(&self) -> usize {
            32
        }

        fn read_report(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize, TransferError> {
            match self.steps.pop_front() {
                Some(Ok(bytes)) => {
                    buf[..bytes.len()].copy_from_slice(&bytes);
                    Ok(bytes.len())
                }
                Some(Err(e)) => Err(e),
                None => Err(TransferError::Timeout),
            }
        }

        fn release(&mut self) -> Result<(), TransferError> {
            self.log.lock().expect("log lock").releases += 1;
            Err(TransferError::Failed("interface busy".into()))
        }
    }

    struct Recorder(Arc<Mutex<Log>>);

    impl ReportSink for Recorder {
        fn on_report(&mut self, frame: &ReportFrame<'_>) {
            self.0.lock().expect("log lock").states.push(frame.state);
        }

        fn on_decode_error(&mut self, _raw: &[u8], _error: &DecodeError) {
            self.0.lock().expect("log lock").decode_errors += 1;
        }

        fn on_fatal(&mut self, message: &str) {
            self.0.lock().expect("log lock").fatal.push(message.to_string());
        }
    }

    fn poller(steps: Vec<Result<Vec<u8>, TransferError>>) -> (ReportPoller<Polling>, Arc<Mutex<Log>>) {
        let log = Arc::new(Mutex::new(Log::default()));
        let source = Scripted {
            steps: steps.into(),
            log: log.clone(),
        };
        let settings = PollSettings {
            transfer_timeout: Duration::from_millis(1),
            poll_interval: Duration::ZERO,
        };
        let poller = ReportPoller::create(
            Box::new(source),
            Box::new(Recorder(log.clone())),
            Some(settings),
        );
        (poller, log)
    }

    #[test]
    fn short_report_does_not_stop() {
        let (mut poller, log) = poller(vec![Ok(vec![0u8; 8]), Ok(vec![0u8; 15])]);
        assert_eq!(poller.poll_once(), None);
        assert_eq!(poller.poll_once(), None);

        let log = log.lock().expect("log lock");
        assert_eq!(log.decode_errors, 1);
        assert_eq!(log.states.len(), 1);
        assert_eq!(poller.stats().decode_errors, 1);
    }

    #[test]
    fn empty_read_is_ignored() {
        let (mut poller, log) = poller(vec![Ok(Vec::new())]);
        assert_eq!(poller.poll_once(), None);
        assert!(log.lock().expect("log lock").states.is_empty());
        assert_eq!(poller.stats().empty_reads, 1);
    }

    #[test]
    fn release_failure_keeps_stop_reason() {
        let (poller, log) = poller(vec![Err(TransferError::Failed("pipe error".into()))]);
        let stopped = poller.run(&CancellationToken::new());

        assert_eq!(stopped.reason(), StopReason::TransferFailed("pipe error".into()));
        let log = log.lock().expect("log lock");
        assert_eq!(log.releases, 1);
        assert_eq!(log.fatal, vec!["pipe error".to_string()]);
    }

    #[test]
    fn cancelled_before_first_read() {
        let (poller, log) = poller(vec![Ok(vec![0u8; 15])]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stopped = poller.run(&cancel);
        assert_eq!(stopped.reason(), StopReason::Cancelled);
        assert_eq!(stopped.stats().reports, 0);
        assert_eq!(log.lock().expect("log lock").releases, 1);
    }
}
