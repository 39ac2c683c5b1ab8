//! Endpoint negotiation
//!
//! Activates the device's default configuration, scans every interface for the
//! first interrupt-IN endpoint and claims the interface that owns it. The claimed
//! interface is released again by the polling loop on shutdown.

use std::time::Duration;

use rusb::{DeviceHandle, UsbContext};
use tracing::{debug, info, warn};

use super::{DeviceIdentity, DeviceSummary, EndpointDescriptor, InterfaceSummary};
use crate::poller::{ReportSource, TransferError};

// Negotiation errors
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("Could not find suitable endpoint")]
    NoSuitableEndpoint,

    #[error("USB error during setup: {0}")]
    UsbFailure(String),
}

impl From<rusb::Error> for SetupError {
    fn from(e: rusb::Error) -> Self {
        SetupError::UsbFailure(e.to_string())
    }
}

/// Returns the first interrupt-IN endpoint together with its interface number.
///
/// Interfaces and endpoints are visited in descriptor order; later matches are ignored.
/// Endpoints advertising a zero max packet size cannot carry a report and are skipped.
pub fn select_endpoint(interfaces: &[InterfaceSummary]) -> Option<(u8, EndpointDescriptor)> {
    interfaces.iter().find_map(|interface| {
        interface
            .endpoints
            .iter()
            .find(|endpoint| endpoint.is_interrupt_in() && endpoint.max_packet_size > 0)
            .map(|endpoint| (interface.number, *endpoint))
    })
}

/// Claimed interrupt-IN endpoint of the opened gamepad.
pub struct InterruptEndpoint<T: UsbContext> {
    handle: DeviceHandle<T>,
    interface: u8,
    descriptor: EndpointDescriptor,
    summary: DeviceSummary,
}

impl<T: UsbContext> InterruptEndpoint<T> {
    pub fn descriptor(&self) -> &EndpointDescriptor {
        &self.descriptor
    }

    pub fn interface(&self) -> u8 {
        self.interface
    }

    pub fn summary(&self) -> &DeviceSummary {
        &self.summary
    }
}

/// Prepares `handle` for interrupt transfers.
///
/// Sets the default configuration (a no-op when it is already active), picks the
/// endpoint via [`select_endpoint`] and claims its interface.
///
/// # Errors
///
/// * [`SetupError::NoSuitableEndpoint`] - No interface exposes an interrupt-IN endpoint
/// * [`SetupError::UsbFailure`] - Any libusb failure while configuring or scanning
pub fn negotiate<T: UsbContext>(
    handle: DeviceHandle<T>,
    identity: DeviceIdentity,
) -> Result<InterruptEndpoint<T>, SetupError> {
    let device = handle.device();
    let default_config = device.config_descriptor(0)?.number();

    match handle.active_configuration() {
        Ok(active) if active == default_config => {
            debug!("Configuration {} already active", active);
        }
        _ => {
            info!("Setting configuration {}", default_config);
            handle.set_active_configuration(default_config)?;
        }
    }

    let config = device.active_config_descriptor()?;
    let interfaces: Vec<InterfaceSummary> = config
        .interfaces()
        .map(|interface| InterfaceSummary {
            number: interface.number(),
            endpoints: interface
                .descriptors()
                .flat_map(|setting| {
                    setting
                        .endpoint_descriptors()
                        .map(|endpoint| EndpointDescriptor {
                            address: endpoint.address(),
                            max_packet_size: endpoint.max_packet_size(),
                            transfer_type: endpoint.transfer_type().into(),
                            direction: endpoint.direction().into(),
                        })
                        .collect::<Vec<_>>()
                })
                .collect(),
        })
        .collect();

    for interface in &interfaces {
        debug!(
            "Interface {}: {} endpoints",
            interface.number,
            interface.endpoints.len()
        );
        for endpoint in &interface.endpoints {
            debug!(
                "  Endpoint 0x{:02x}: {} transfer_type_bits=0x{:02x} max_packet_size={}",
                endpoint.address,
                endpoint.direction,
                endpoint.transfer_type_bits(),
                endpoint.max_packet_size
            );
        }
    }

    let (interface, descriptor) = match select_endpoint(&interfaces) {
        Some(found) => found,
        None => {
            warn!("No interrupt IN endpoint among {} interfaces", interfaces.len());
            return Err(SetupError::NoSuitableEndpoint);
        }
    };
    info!(
        "Using endpoint 0x{:02x} on interface {} (max packet size {})",
        descriptor.address, interface, descriptor.max_packet_size
    );

    if let Err(e) = handle.set_auto_detach_kernel_driver(true) {
        debug!("Kernel driver auto-detach unavailable: {}", e);
    }
    handle.claim_interface(interface)?;
    debug!("Claimed interface {}", interface);

    let summary = DeviceSummary {
        identity,
        bus: device.bus_number(),
        address: device.address(),
        configuration: config.number(),
        interfaces,
        selected: Some(descriptor),
    };

    Ok(InterruptEndpoint {
        handle,
        interface,
        descriptor,
        summary,
    })
}

/// Splits libusb errors into the timeout class and everything else.
pub fn transfer_error(e: rusb::Error) -> TransferError {
    match e {
        rusb::Error::Timeout => TransferError::Timeout,
        other => TransferError::Failed(other.to_string()),
    }
}

impl<T: UsbContext + 'static> ReportSource for InterruptEndpoint<T> {
    fn max_packet_size(&self) -> usize {
        usize::from(self.descriptor.max_packet_size)
    }

    fn read_report(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransferError> {
        self.handle
            .read_interrupt(self.descriptor.address, buf, timeout)
            .map_err(transfer_error)
    }

    fn release(&mut self) -> Result<(), TransferError> {
        self.handle
            .release_interface(self.interface)
            .map_err(|e| TransferError::Failed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{Direction, TransferType};

    fn endpoint(address: u8, transfer_type: TransferType, direction: Direction) -> EndpointDescriptor {
        EndpointDescriptor {
            address,
            max_packet_size: 32,
            transfer_type,
            direction,
        }
    }

    #[test]
    fn picks_first_interrupt_in_across_interfaces() {
        let interfaces = vec![
            InterfaceSummary {
                number: 0,
                endpoints: vec![endpoint(0x01, TransferType::Interrupt, Direction::Out)],
            },
            InterfaceSummary {
                number: 1,
                endpoints: vec![
                    endpoint(0x82, TransferType::Bulk, Direction::In),
                    endpoint(0x83, TransferType::Interrupt, Direction::In),
                ],
            },
            InterfaceSummary {
                number: 2,
                endpoints: vec![endpoint(0x84, TransferType::Interrupt, Direction::In)],
            },
        ];

        let (interface, selected) = select_endpoint(&interfaces).expect("endpoint expected");
        assert_eq!(interface, 1);
        assert_eq!(selected.address, 0x83);
    }

    #[test]
    fn zero_size_endpoint_is_skipped() {
        let mut empty = endpoint(0x81, TransferType::Interrupt, Direction::In);
        empty.max_packet_size = 0;
        let interfaces = vec![
            InterfaceSummary {
                number: 0,
                endpoints: vec![empty],
            },
            InterfaceSummary {
                number: 1,
                endpoints: vec![endpoint(0x82, TransferType::Interrupt, Direction::In)],
            },
        ];

        let (interface, selected) = select_endpoint(&interfaces).expect("endpoint expected");
        assert_eq!(interface, 1);
        assert_eq!(selected.address, 0x82);

        assert!(select_endpoint(&interfaces[..1]).is_none());
    }

    #[test]
    fn timeout_is_the_only_recoverable_error() {
        assert_eq!(transfer_error(rusb::Error::Timeout), TransferError::Timeout);
        for fatal in [rusb::Error::Pipe, rusb::Error::NoDevice, rusb::Error::Io] {
            assert!(
                matches!(transfer_error(fatal), TransferError::Failed(_)),
                "{fatal:?} must stop polling"
            );
        }
        assert_eq!(
            transfer_error(rusb::Error::NoDevice),
            TransferError::Failed(rusb::Error::NoDevice.to_string())
        );
    }

    #[test]
    fn no_interrupt_in_yields_none() {
        let interfaces = vec![InterfaceSummary {
            number: 0,
            endpoints: vec![
                endpoint(0x01, TransferType::Interrupt, Direction::Out),
                endpoint(0x81, TransferType::Bulk, Direction::In),
            ],
        }];
        assert!(select_endpoint(&interfaces).is_none());
        assert!(select_endpoint(&[]).is_none());
    }
}
