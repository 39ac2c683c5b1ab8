//! Report decoding for the gamepad's fixed input layout
//!
//! [`decoder::decode`] is a pure function from raw bytes to a
//! [`controller_state::ControllerState`]; it holds no state between calls.

pub mod controller_state;
pub mod decoder;

pub use controller_state::{Buttons, ControllerState, DPad, Special, StickPosition};
pub use decoder::{axis_percent, decode, trigger_percent, DecodeError, REPORT_LEN};
