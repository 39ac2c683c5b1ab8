//! Reads interrupt reports from a USB gamepad and decodes them into a
//! [`report::ControllerState`].
//!
//! ```text
//! device::locate ──► device::negotiate ──► poller::ReportPoller ──► report::decode ──► ReportSink
//! ```

pub mod config;
pub mod device;
pub mod poller;
pub mod presentation;
pub mod reader;
pub mod report;
