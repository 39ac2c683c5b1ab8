//! Input report decoding (15-byte interrupt report).
//!
//! # Report layout
//! | Offset | Size | Field              | Encoding                              |
//! |--------|------|--------------------|---------------------------------------|
//! | 2      | u8   | d-pad, start/select| low nibble d-pad, bits 4–5 buttons    |
//! | 3      | u8   | buttons            | L1 R1 Mode _ A B X Y (bit 0 → 7)      |
//! | 4      | u8   | left trigger       | 0–255 → 0–100 %                       |
//! | 5      | u8   | right trigger      | 0–255 → 0–100 %                       |
//! | 6–7    | i16  | left stick X       | low byte first, big-endian value      |
//! | 8–9    | i16  | left stick Y       | "                                     |
//! | 10–11  | i16  | right stick X      | "                                     |
//! | 12–13  | i16  | right stick Y      | "                                     |
//! | 14     | u8   | turbo/clear        | bit 5 turbo, bit 6 clear              |
//!
//! Bytes 0–1 and anything past offset 14 are not interpreted.

use super::controller_state::{Buttons, ControllerState, DPad, Special, StickPosition};

/// Minimum report length in bytes.
pub const REPORT_LEN: usize = 15;

const DPAD_MASK: u8 = 0x0F;

/// Positive full-scale of a stick axis.
pub const AXIS_POSITIVE_FULL_SCALE: f64 = 32768.0;

/// Negative full-scale of a stick axis (magnitude).
pub const AXIS_NEGATIVE_FULL_SCALE: f64 = 32767.0;

// Byte 2, upper nibble
const SYSTEM_BUTTON_BITS: [(u8, Buttons); 2] = [(0x10, Buttons::START), (0x20, Buttons::SELECT)];

// Byte 3; bit 3 is unused
const FACE_BUTTON_BITS: [(u8, Buttons); 7] = [
    (0x01, Buttons::L1),
    (0x02, Buttons::R1),
    (0x04, Buttons::MODE),
    (0x10, Buttons::A),
    (0x20, Buttons::B),
    (0x40, Buttons::X),
    (0x80, Buttons::Y),
];

/// Errors returned by [`decode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("report too short: got {got} bytes, need {need}")]
    Truncated { got: usize, need: usize },
}

/// Decodes one raw report into a [`ControllerState`].
///
/// Longer buffers are accepted; only the first [`REPORT_LEN`] bytes are read.
/// Bits without a meaning in the layout are ignored.
pub fn decode(report: &[u8]) -> Result<ControllerState, DecodeError> {
    if report.len() < REPORT_LEN {
        return Err(DecodeError::Truncated {
            got: report.len(),
            need: REPORT_LEN,
        });
    }

    Ok(ControllerState {
        dpad: DPad::from_bits_truncate(report[2] & DPAD_MASK),
        buttons: collect_bits(report[2], &SYSTEM_BUTTON_BITS)
            | collect_bits(report[3], &FACE_BUTTON_BITS),
        left_trigger: trigger_percent(report[4]),
        right_trigger: trigger_percent(report[5]),
        left_stick: StickPosition {
            x: axis_percent(report[6], report[7]),
            y: axis_percent(report[8], report[9]),
        },
        right_stick: StickPosition {
            x: axis_percent(report[10], report[11]),
            y: axis_percent(report[12], report[13]),
        },
        special: Special::from_bits_truncate(report[14]),
    })
}

fn collect_bits(byte: u8, table: &[(u8, Buttons)]) -> Buttons {
    table
        .iter()
        .filter(|(mask, _)| byte & mask != 0)
        .fold(Buttons::empty(), |acc, (_, button)| acc | *button)
}

/// Trigger byte as a percentage.
pub fn trigger_percent(value: u8) -> f64 {
    f64::from(value) / 255.0 * 100.0
}

/// Stick axis as a percentage.
///
/// The two bytes form a big-endian `i16` (`high`, `low`). Positive values scale
/// against 32768, negative ones against 32767, matching what the hardware
/// reports at the end stops. The single value -32768 would land just past
/// -100 and is clamped.
pub fn axis_percent(low: u8, high: u8) -> f64 {
    let value = i16::from_be_bytes([high, low]);
    let percent = match value {
        0 => 0.0,
        v if v > 0 => f64::from(v) / AXIS_POSITIVE_FULL_SCALE * 100.0,
        v => f64::from(v) / AXIS_NEGATIVE_FULL_SCALE * 100.0,
    };
    percent.clamp(-100.0, 100.0)
}
