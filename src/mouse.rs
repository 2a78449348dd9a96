//! Mouse state, and its encoding as a Microsoft serial mouse packet.
//!
//! The Microsoft serial mouse sends 3 bytes per movement:
//! ```text
//! Byte 0: 0 1 L R Y7 Y6 X7 X6
//! Byte 1: 0 0 X5 X4 X3 X2 X1 X0
//! Byte 2: 0 0 Y5 Y4 Y3 Y2 Y1 Y0
//! ```
//! Bit 6 of byte 0 marks the start of a packet.  There is no room for the
//! middle button or wheel, which are tracked but never sent.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use bitflags::bitflags;

bitflags! {
    /// Button bits of a USB HID boot protocol mouse report.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const LEFT = 0x01;
        const RIGHT = 0x02;
        const MIDDLE = 0x04;
    }
}

/// Minimum length of a boot protocol mouse report (buttons, X, Y).
pub const BOOT_REPORT_MIN_LEN: usize = 3;

/// Movement and buttons as reported by the USB mouse, before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawMouseReport {
    pub buttons: u8,
    pub x: i32,
    pub y: i32,
    pub wheel: i32,
}

impl RawMouseReport {
    /// Parse a USB HID boot protocol mouse report.
    ///
    /// Layout is buttons, X, Y, then optionally wheel and pan.  Pan is
    /// ignored.  Returns `None` if the report is too short.
    pub fn from_boot_report(data: &[u8]) -> Option<Self> {
        if data.len() < BOOT_REPORT_MIN_LEN {
            return None;
        }
        Some(Self {
            buttons: data[0],
            x: i32::from(data[1] as i8),
            y: i32::from(data[2] as i8),
            wheel: data.get(3).map_or(0, |w| i32::from(*w as i8)),
        })
    }
}

/// Which of the 3 packet bytes to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketByte {
    First = 0,
    Second = 1,
    Third = 2,
}

impl PacketByte {
    /// All packet bytes, in the order they are sent.
    pub const ALL: [PacketByte; 3] = [PacketByte::First, PacketByte::Second, PacketByte::Third];
}

/// The current mouse state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MouseState {
    x: i8,
    y: i8,
    wheel: i8,
    left: bool,
    right: bool,
    middle: bool,
}

// Clamp, rather than truncate, so a fast movement doesn't wrap round into a
// movement the other way.
fn clamp_i8(value: i32) -> i8 {
    value.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
}

impl MouseState {
    /// Creates an empty mouse state - no movement, no buttons.
    pub const fn new() -> Self {
        Self {
            x: 0,
            y: 0,
            wheel: 0,
            left: false,
            right: false,
            middle: false,
        }
    }

    /// Replace the state with a new report.
    pub fn import(&mut self, report: &RawMouseReport) {
        let buttons = MouseButtons::from_bits_truncate(report.buttons);
        self.x = clamp_i8(report.x);
        self.y = clamp_i8(report.y);
        self.wheel = clamp_i8(report.wheel);
        self.left = buttons.contains(MouseButtons::LEFT);
        self.right = buttons.contains(MouseButtons::RIGHT);
        self.middle = buttons.contains(MouseButtons::MIDDLE);
    }

    pub fn x(&self) -> i8 {
        self.x
    }

    pub fn y(&self) -> i8 {
        self.y
    }

    pub fn wheel(&self) -> i8 {
        self.wheel
    }

    pub fn left(&self) -> bool {
        self.left
    }

    pub fn right(&self) -> bool {
        self.right
    }

    pub fn middle(&self) -> bool {
        self.middle
    }

    /// The first byte: 01 LR Y[7:6] X[7:6]
    pub fn first_byte(&self) -> u8 {
        let x = self.x as u8;
        let y = self.y as u8;
        0b0100_0000
            | (u8::from(self.left) << 5)
            | (u8::from(self.right) << 4)
            | (((y >> 6) & 0b11) << 2)
            | ((x >> 6) & 0b11)
    }

    /// The second byte: 00 X[5:0]
    pub fn second_byte(&self) -> u8 {
        self.x as u8 & 0b0011_1111
    }

    /// The third byte: 00 Y[5:0]
    pub fn third_byte(&self) -> u8 {
        self.y as u8 & 0b0011_1111
    }

    /// Encode one byte of the packet, from the state as it is now.
    pub fn packet_byte(&self, byte: PacketByte) -> u8 {
        match byte {
            PacketByte::First => self.first_byte(),
            PacketByte::Second => self.second_byte(),
            PacketByte::Third => self.third_byte(),
        }
    }

    /// Encode the whole packet.
    pub fn packet(&self) -> [u8; 3] {
        PacketByte::ALL.map(|byte| self.packet_byte(byte))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(buttons: u8, x: i32, y: i32, wheel: i32) -> MouseState {
        let mut state = MouseState::new();
        state.import(&RawMouseReport {
            buttons,
            x,
            y,
            wheel,
        });
        state
    }

    #[test]
    fn import_clamps_to_i8() {
        assert_eq!(state(0, 127, 0, 0).x(), 127);
        assert_eq!(state(0, 200, 0, 0).x(), 127);
        assert_eq!(state(0, -300, 0, 0).x(), -128);
        assert_eq!(state(0, 0, 1000, 0).y(), 127);
        assert_eq!(state(0, 0, -129, 0).y(), -128);
        assert_eq!(state(0, 0, 0, -5000).wheel(), -128);
        assert_eq!(state(0, -128, 0, 0).x(), -128);
    }

    #[test]
    fn import_decodes_buttons() {
        let s = state(0x05, 0, 0, 0);
        assert!(s.left());
        assert!(!s.right());
        assert!(s.middle());

        // Unknown button bits are ignored.
        let s = state(0xFA, 0, 0, 0);
        assert!(!s.left());
        assert!(s.right());
        assert!(!s.middle());
    }

    #[test]
    fn packet_layout() {
        // L=1 R=0, X=-64 (0xC0), Y=64 (0x40)
        // byte0 = 0100_0000 | 0010_0000 | (01 << 2) | 11 = 0x67
        let s = state(MouseButtons::LEFT.bits(), -64, 64, 0);
        assert_eq!(s.packet(), [0x67, 0x00, 0x00]);
    }

    #[test]
    fn packet_low_bits() {
        // R=1, X=5, Y=-3 (0xFD)
        let s = state(MouseButtons::RIGHT.bits(), 5, -3, 0);
        assert_eq!(s.first_byte(), 0b0101_1100);
        assert_eq!(s.second_byte(), 0x05);
        assert_eq!(s.third_byte(), 0x3D);
    }

    #[test]
    fn middle_and_wheel_not_encoded() {
        let plain = state(0, 10, 10, 0);
        let extra = state(MouseButtons::MIDDLE.bits(), 10, 10, 7);
        assert_eq!(plain.packet(), extra.packet());
    }

    #[test]
    fn only_first_byte_has_sync_bit() {
        let s = state(0x03, -1, -1, 0);
        let packet = s.packet();
        assert_eq!(packet[0] & 0x40, 0x40);
        assert_eq!(packet[1] & 0xC0, 0);
        assert_eq!(packet[2] & 0xC0, 0);
    }

    #[test]
    fn boot_report_parsing() {
        assert_eq!(RawMouseReport::from_boot_report(&[0x01, 0x05]), None);

        let r = RawMouseReport::from_boot_report(&[0x01, 0x05, 0xFB]).unwrap();
        assert_eq!(
            r,
            RawMouseReport {
                buttons: 1,
                x: 5,
                y: -5,
                wheel: 0
            }
        );

        let r = RawMouseReport::from_boot_report(&[0x00, 0x80, 0x7F, 0xFF, 0x01]).unwrap();
        assert_eq!(r.x, -128);
        assert_eq!(r.y, 127);
        assert_eq!(r.wheel, -1);
    }
}
