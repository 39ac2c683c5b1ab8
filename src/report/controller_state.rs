use bitflags::bitflags;

bitflags! {
    /// Pressed directions. Diagonals are two flags at once.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct DPad: u8 {
        const UP = 1 << 0;
        const DOWN = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Buttons: u16 {
        const START = 1 << 0;
        const SELECT = 1 << 1;
        const L1 = 1 << 2;
        const R1 = 1 << 3;
        const MODE = 1 << 4;
        const A = 1 << 5;
        const B = 1 << 6;
        const X = 1 << 7;
        const Y = 1 << 8;
    }
}

bitflags! {
    /// Auxiliary buttons, stored with their bit positions from report byte 14.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct Special: u8 {
        const TURBO = 0x20;
        const CLEAR = 0x40;
    }
}

pub const DPAD_LABELS: [(DPad, &str); 4] = [
    (DPad::UP, "Up"),
    (DPad::DOWN, "Down"),
    (DPad::LEFT, "Left"),
    (DPad::RIGHT, "Right"),
];

pub const BUTTON_LABELS: [(Buttons, &str); 9] = [
    (Buttons::START, "Start"),
    (Buttons::SELECT, "Select"),
    (Buttons::L1, "L1"),
    (Buttons::R1, "R1"),
    (Buttons::MODE, "Mode"),
    (Buttons::A, "A"),
    (Buttons::B, "B"),
    (Buttons::X, "X"),
    (Buttons::Y, "Y"),
];

pub const SPECIAL_LABELS: [(Special, &str); 2] =
    [(Special::TURBO, "Turbo"), (Special::CLEAR, "Clear")];

// Collects the labels of every flag contained in `set`, in table order
fn labels<F: bitflags::Flags + Copy>(set: F, table: &[(F, &'static str)]) -> Vec<&'static str> {
    table
        .iter()
        .filter(|(flag, _)| set.contains(*flag))
        .map(|(_, label)| *label)
        .collect()
}

impl DPad {
    pub fn labels(self) -> Vec<&'static str> {
        labels(self, &DPAD_LABELS)
    }
}

impl Buttons {
    pub fn labels(self) -> Vec<&'static str> {
        labels(self, &BUTTON_LABELS)
    }
}

impl Special {
    pub fn labels(self) -> Vec<&'static str> {
        labels(self, &SPECIAL_LABELS)
    }
}

/// Stick deflection in percent, each axis within -100.0 … 100.0.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickPosition {
    pub x: f64,
    pub y: f64,
}

/// Decoded snapshot of a single report.
///
/// Plain value: one is produced per report and replaced by the next, nothing
/// refers back to earlier states.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerState {
    pub dpad: DPad,
    pub buttons: Buttons,
    pub left_stick: StickPosition,
    pub right_stick: StickPosition,
    /// Percent, 0.0 … 100.0
    pub left_trigger: f64,
    /// Percent, 0.0 … 100.0
    pub right_trigger: f64,
    pub special: Special,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            dpad: DPad::empty(),
            buttons: Buttons::empty(),
            left_stick: StickPosition::default(),
            right_stick: StickPosition::default(),
            left_trigger: 0.0,
            right_trigger: 0.0,
            special: Special::empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_table_order() {
        assert_eq!((DPad::RIGHT | DPad::UP).labels(), vec!["Up", "Right"]);
        assert_eq!((Buttons::Y | Buttons::START).labels(), vec!["Start", "Y"]);
        assert_eq!(Special::all().labels(), vec!["Turbo", "Clear"]);
        assert!(DPad::empty().labels().is_empty());
    }

    #[test]
    fn default_state_is_neutral() {
        let state = ControllerState::default();
        assert!(state.dpad.is_empty());
        assert!(state.buttons.is_empty());
        assert!(state.special.is_empty());
        assert_eq!(state.left_stick, StickPosition { x: 0.0, y: 0.0 });
        assert_eq!(state.right_trigger, 0.0);
    }
}
