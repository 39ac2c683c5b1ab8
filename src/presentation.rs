//! Console rendering of decoded reports
//!
//! Each frame redraws the terminal with a hex dump of the raw bytes followed by
//! the decoded controls:
//!
//! ```text
//! Raw data: 00 14 01 10 80 40 00 00 00 00 00 00 00 00 20
//! ------------------------------------------------------------
//! Crosskey: Up
//! Buttons pressed: A
//! Left Stick: X:    0.0% | Y:    0.0%
//! Right Stick: X:    0.0% | Y:    0.0%
//! L2 Trigger:  50.2%
//! R2 Trigger:  25.1%
//! Special Buttons: Turbo
//! ```

use std::fmt::Write as _;
use std::io::{self, Write};

use tracing::warn;

use crate::config::DisplaySettings;
use crate::poller::{ReportFrame, ReportSink, StopReason};
use crate::report::{ControllerState, DecodeError};

const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// Space-separated lowercase hex bytes.
pub fn hex_dump(raw: &[u8]) -> String {
    raw.iter()
        .map(|byte| format!("{:02x}", byte))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text block for one decoded report, without the screen-clear prefix.
pub fn render_state(raw: Option<&[u8]>, state: &ControllerState) -> String {
    let mut out = String::new();

    if let Some(raw) = raw {
        let _ = writeln!(out, "Raw data: {}", hex_dump(raw));
    }
    let _ = writeln!(out, "{}", "-".repeat(60));

    let crosskey = state.dpad.labels();
    if !crosskey.is_empty() {
        let _ = writeln!(out, "Crosskey: {}", crosskey.join("-"));
    }

    let buttons = state.buttons.labels();
    let _ = writeln!(
        out,
        "Buttons pressed: {}",
        if buttons.is_empty() {
            "None".to_string()
        } else {
            buttons.join(", ")
        }
    );

    let _ = writeln!(
        out,
        "Left Stick: X: {:6.1}% | Y: {:6.1}%",
        state.left_stick.x, state.left_stick.y
    );
    let _ = writeln!(
        out,
        "Right Stick: X: {:6.1}% | Y: {:6.1}%",
        state.right_stick.x, state.right_stick.y
    );
    // "%" counts toward the six-column trigger field
    let _ = writeln!(out, "L2 Trigger: {:5.1}%", state.left_trigger);
    let _ = writeln!(out, "R2 Trigger: {:5.1}%", state.right_trigger);

    let special = state.special.labels();
    if !special.is_empty() {
        let _ = writeln!(out, "Special Buttons: {}", special.join(", "));
    }

    out
}

/// [`ReportSink`] printing to stdout.
#[derive(Debug, Clone, Default)]
pub struct ConsoleSink {
    settings: DisplaySettings,
}

impl ConsoleSink {
    pub fn new(settings: DisplaySettings) -> Self {
        Self { settings }
    }

    fn print(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = stdout.write_all(text.as_bytes()).and_then(|_| stdout.flush()) {
            warn!("Failed to write to console: {}", e);
        }
    }
}

impl ReportSink for ConsoleSink {
    fn on_report(&mut self, frame: &ReportFrame<'_>) {
        let mut text = String::new();
        if self.settings.clear_screen {
            text.push_str(CLEAR_SCREEN);
        }
        let raw = self.settings.show_raw.then_some(frame.raw);
        text.push_str(&render_state(raw, &frame.state));
        let _ = writeln!(
            text,
            "Received at {}",
            frame.received_at.format("%H:%M:%S.%3f")
        );
        self.print(&text);
    }

    fn on_decode_error(&mut self, raw: &[u8], error: &DecodeError) {
        self.print(&format!(
            "Error processing data: {} (raw: {})\n",
            error,
            hex_dump(raw)
        ));
    }

    fn on_fatal(&mut self, message: &str) {
        self.print(&format!("USB Error: {}\n", message));
    }

    fn on_stop(&mut self, reason: &StopReason) {
        if *reason == StopReason::Cancelled {
            self.print("\nStopping...\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::decode;

    #[test]
    fn hex_dump_is_lowercase_pairs() {
        assert_eq!(hex_dump(&[0x00, 0xAB, 0x7f]), "00 ab 7f");
        assert_eq!(hex_dump(&[]), "");
    }

    #[test]
    fn renders_pressed_controls() {
        let raw = [
            0x00, 0x14, 0x09, 0x10, 0x80, 0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x20,
        ];
        let state = decode(&raw).expect("valid report");
        let text = render_state(Some(&raw), &state);

        assert!(text.starts_with("Raw data: 00 14 09 10 80 40"));
        assert!(text.contains("Crosskey: Up-Right\n"));
        assert!(text.contains("Buttons pressed: A\n"));
        assert!(text.contains("Left Stick: X:    0.0% | Y:    0.0%\n"));
        assert!(text.contains("L2 Trigger:  50.2%\n"));
        assert!(text.contains("R2 Trigger:  25.1%\n"));
        assert!(text.contains("Special Buttons: Turbo\n"));
    }

    #[test]
    fn trigger_field_is_six_columns_wide() {
        let mut state = ControllerState::default();
        state.left_trigger = 100.0;
        state.right_trigger = 0.0;
        let text = render_state(None, &state);
        assert!(text.contains("L2 Trigger: 100.0%\n"));
        assert!(text.contains("R2 Trigger:   0.0%\n"));
    }

    #[test]
    fn start_and_a_are_listed_in_order() {
        let mut raw = [0u8; 15];
        raw[2] = 0x11;
        raw[3] = 0x10;
        let state = decode(&raw).expect("valid report");
        assert!(render_state(None, &state).contains("Buttons pressed: Start, A\n"));
    }

    #[test]
    fn neutral_state_omits_optional_lines() {
        let text = render_state(None, &ControllerState::default());
        assert!(!text.contains("Raw data"));
        assert!(!text.contains("Crosskey"));
        assert!(!text.contains("Special Buttons"));
        assert!(text.contains("Buttons pressed: None\n"));
    }
}
