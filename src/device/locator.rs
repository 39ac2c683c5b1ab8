use rusb::{Context, DeviceHandle, UsbContext};
use tracing::{debug, error, info, warn};

use super::DeviceIdentity;

// Locator errors
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("Target device {0} not found")]
    NotFound(DeviceIdentity),

    #[error("No USB backend available: {0}")]
    Backend(String),
}

/// Creates the libusb context used for the whole session.
pub fn open_context() -> Result<Context, LocateError> {
    match Context::new() {
        Ok(context) => {
            debug!("Initialized libusb context");
            Ok(context)
        }
        Err(e) => {
            error!("Failed to initialize libusb: {}", e);
            Err(LocateError::Backend(e.to_string()))
        }
    }
}

/// Opens the first device on the bus exposing `identity`.
///
/// Devices whose descriptor cannot be read are skipped rather than failing the scan.
pub fn locate<T: UsbContext>(
    context: &T,
    identity: DeviceIdentity,
) -> Result<DeviceHandle<T>, LocateError> {
    info!("Looking for device {}", identity);

    let devices = context
        .devices()
        .map_err(|e| LocateError::Backend(format!("Failed to list USB devices: {}", e)))?;
    debug!("Scanning {} USB devices", devices.len());

    for device in devices.iter() {
        let descriptor = match device.device_descriptor() {
            Ok(d) => d,
            Err(e) => {
                debug!(
                    "Skipping device on bus {} address {}: {}",
                    device.bus_number(),
                    device.address(),
                    e
                );
                continue;
            }
        };

        if descriptor.vendor_id() != identity.vendor_id
            || descriptor.product_id() != identity.product_id
        {
            continue;
        }

        info!(
            "Device found on bus {} address {}",
            device.bus_number(),
            device.address()
        );
        return device.open().map_err(|e| {
            warn!("Matching device could not be opened: {}", e);
            LocateError::Backend(format!("Failed to open {}: {}", identity, e))
        });
    }

    warn!("Target device {} not found", identity);
    Err(LocateError::NotFound(identity))
}
