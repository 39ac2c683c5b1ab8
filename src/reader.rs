//! Reader Handle - setup and hosting of the polling loop
//!
//! Ties the stages together in order:
//!
//! ```text
//! open_context ─► locate ─► negotiate ─► ReportPoller<Polling> ─► ReportPoller<Stopped>
//! ```
//!
//! Device and endpoint are passed forward by value; nothing is kept in shared state.
//! Setup errors end the program before any polling happens.

use rusb::Context;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::ReaderSettings;
use crate::device::{
    locate, locator::open_context, negotiate, DeviceIdentity, DeviceSummary, InterruptEndpoint,
    LocateError, SetupError,
};
use crate::poller::{PollSettings, ReportPoller, ReportSink, StopReason};

/// Errors that can occur while preparing or hosting a reader session
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Locate error: {0}")]
    Locate(#[from] LocateError),

    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Polling task failed: {0}")]
    Task(#[from] JoinError),
}

/// An opened, negotiated gamepad ready for polling.
pub struct ReaderHandle {
    endpoint: InterruptEndpoint<Context>,
    settings: PollSettings,
}

impl ReaderHandle {
    /// Locates `identity` and negotiates its interrupt-IN endpoint.
    ///
    /// # Errors
    ///
    /// * [`ReaderError::Locate`] - No libusb backend, or the device is not attached
    /// * [`ReaderError::Setup`] - Configuration or endpoint selection failed
    pub fn open(identity: DeviceIdentity, settings: &ReaderSettings) -> Result<Self, ReaderError> {
        info!("Opening reader for {} with settings: {:?}", identity, settings);

        let context = open_context()?;
        let handle = locate(&context, identity)?;
        let endpoint = negotiate(handle, identity)?;
        debug!(
            "Negotiated endpoint 0x{:02x} on interface {}",
            endpoint.descriptor().address,
            endpoint.interface()
        );

        Ok(Self {
            endpoint,
            settings: settings.poll_settings(),
        })
    }

    pub fn summary(&self) -> &DeviceSummary {
        self.endpoint.summary()
    }

    /// Runs the polling loop on a blocking worker until `cancel` fires or a
    /// transfer fails.
    pub async fn run(
        self,
        sink: Box<dyn ReportSink>,
        cancel: CancellationToken,
    ) -> Result<StopReason, ReaderError> {
        let poller = ReportPoller::create(Box::new(self.endpoint), sink, Some(self.settings));

        info!("Spawning polling task");
        let stopped = tokio::task::spawn_blocking(move || poller.run(&cancel)).await?;
        Ok(stopped.reason())
    }
}
