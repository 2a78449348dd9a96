//! Error types.
//!
//! There are two classes of error:
//! - [`ConfigError`] - a fatal problem with the pin, port or clock
//!   configuration, found once at start of day.  The firmware refuses to
//!   drive the bus with a bad configuration.
//! - [`BusError`] - a runtime handshake timeout.  These are survivable: the
//!   current byte (and the rest of its packet) is dropped and the next mouse
//!   report carries on.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// Fatal configuration errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A pin range shares one or more lines with a range claimed earlier.
    /// `overlap` is the mask of the clashing lines.
    PinOverlap { first: u8, last: u8, overlap: u32 },

    /// A pin range is empty (`first > last`) or extends past the last GPIO.
    InvalidRange { first: u8, last: u8 },

    /// The target port can't be seen on the address lines we read.  Either
    /// it is too wide, or it has one of its two low bits set while those
    /// lines are reserved for an external debug UART.
    MisalignedPort { port: u16 },

    /// No system PLL settings give exactly this clock frequency.
    UnsupportedClock { khz: u32 },

    /// The core voltage can only be overridden on the RP2040.
    UnsupportedVoltage,
}

/// Non-fatal bus handshake errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// The host never started a read of our port within the budget.
    NoReadCycle,

    /// The host never released the IO read strobe after we drove the data
    /// lines.  The data lines have been released anyway.
    ReadStrobeStuck,
}
