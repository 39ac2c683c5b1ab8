//! USB device access for the gamepad
//!
//! Two setup stages run before any report is read:
//!
//! 1. [`locator`] - Finds and opens the device by vendor/product id
//! 2. [`negotiator`] - Activates the configuration and picks the interrupt-IN endpoint
//!
//! # Architecture
//!
//! ```text
//! DeviceIdentity ──► Locator ──► DeviceHandle ──► Negotiator ──► InterruptEndpoint
//!                    (rusb)                       (config + claim)
//! ```
//!
//! The resulting [`negotiator::InterruptEndpoint`] is handed to the polling loop,
//! which owns it until shutdown.

pub mod locator;
pub mod negotiator;

use std::fmt;

pub use locator::{locate, LocateError};
pub use negotiator::{negotiate, select_endpoint, transfer_error, InterruptEndpoint, SetupError};

/// Vendor/product pair identifying the supported gamepad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// The gamepad this tool decodes (Microsoft Corp. controller layout).
pub const TARGET_DEVICE: DeviceIdentity = DeviceIdentity {
    vendor_id: 0x045e,
    product_id: 0x028e,
};

// Transfer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferType {
    Control,
    Isochronous,
    Bulk,
    Interrupt,
}

impl From<rusb::TransferType> for TransferType {
    fn from(value: rusb::TransferType) -> Self {
        match value {
            rusb::TransferType::Control => TransferType::Control,
            rusb::TransferType::Isochronous => TransferType::Isochronous,
            rusb::TransferType::Bulk => TransferType::Bulk,
            rusb::TransferType::Interrupt => TransferType::Interrupt,
        }
    }
}

// Endpoint direction, seen from the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl From<rusb::Direction> for Direction {
    fn from(value: rusb::Direction) -> Self {
        match value {
            rusb::Direction::In => Direction::In,
            rusb::Direction::Out => Direction::Out,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::In => write!(f, "IN"),
            Direction::Out => write!(f, "OUT"),
        }
    }
}

/// One endpoint as reported by the configuration descriptor.
///
/// Resolved once during negotiation and read-only for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub max_packet_size: u16,
    pub transfer_type: TransferType,
    pub direction: Direction,
}

impl EndpointDescriptor {
    /// Whether this endpoint can carry gamepad input reports.
    pub fn is_interrupt_in(&self) -> bool {
        self.direction == Direction::In && self.transfer_type == TransferType::Interrupt
    }

    /// Transfer type bits (`bmAttributes & 0x03`); sync and usage bits are not kept.
    pub fn transfer_type_bits(&self) -> u8 {
        match self.transfer_type {
            TransferType::Control => 0x00,
            TransferType::Isochronous => 0x01,
            TransferType::Bulk => 0x02,
            TransferType::Interrupt => 0x03,
        }
    }
}

// All endpoints of one interface (alternate settings flattened)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSummary {
    pub number: u8,
    pub endpoints: Vec<EndpointDescriptor>,
}

/// Diagnostic view of the opened device, printed once before polling starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSummary {
    pub identity: DeviceIdentity,
    pub bus: u8,
    pub address: u8,
    pub configuration: u8,
    pub interfaces: Vec<InterfaceSummary>,
    pub selected: Option<EndpointDescriptor>,
}

impl fmt::Display for DeviceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Device information ({}):", self.identity)?;
        writeln!(f, "Bus: {}", self.bus)?;
        writeln!(f, "Address: {}", self.address)?;
        writeln!(f, "Configuration: {}", self.configuration)?;
        for interface in &self.interfaces {
            writeln!(f)?;
            writeln!(f, "Interface {}:", interface.number)?;
            for endpoint in &interface.endpoints {
                writeln!(f, "  Endpoint 0x{:02x}:", endpoint.address)?;
                writeln!(f, "  Direction: {}", endpoint.direction)?;
                writeln!(f, "  Transfer type bits: 0x{:02x}", endpoint.transfer_type_bits())?;
                writeln!(f, "  Max packet size: {}", endpoint.max_packet_size)?;
                if self.selected.as_ref() == Some(endpoint) {
                    writeln!(f, "  Using this endpoint for input")?;
                }
            }
        }
        Ok(())
    }
}
