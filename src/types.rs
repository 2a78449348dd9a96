//! This module contains general types used by pico-isa-mouse.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// Direction of a group of GPIOs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input, which is also how we release (tri-state) a bus line.
    In,

    /// Output, driving the bus line.
    Out,
}

// Implement Format so Direction can be formatted by defmt.
#[cfg(feature = "defmt")]
impl defmt::Format for Direction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Direction::In => defmt::write!(f, "IN"),
            Direction::Out => defmt::write!(f, "OUT"),
        }
    }
}
