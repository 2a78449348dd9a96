//! This file provides bank-wide GPIO access.
//!
//! The ISA bus handshake has to sample and drive many lines at once, within
//! tens of nanoseconds, so we don't go through per-pin objects once the pins
//! are set up.  Instead everything goes through [`GpioPort`], whose
//! operations each map onto a single SIO register access on the RP2040 and
//! RP235x.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::bus::pins::PinGroup;
use crate::types::Direction;

/// Whole-bank GPIO operations.  Every mask-based operation must be applied
/// to all lines in the mask in one go, so the bus never sees a partially
/// updated group.
pub trait GpioPort {
    /// Set up the GPIOs in `group` for software control, in the given
    /// direction.  Only called at start of day.
    fn init_group(&mut self, group: &PinGroup, direction: Direction);

    /// Read the level of every GPIO in the bank.
    fn read_all(&mut self) -> u32;

    /// Drive the lines in `mask` high.
    fn set_mask(&mut self, mask: u32);

    /// Drive the lines in `mask` low.
    fn clear_mask(&mut self, mask: u32);

    /// Drive the lines in `mask` to the corresponding bits of `value`,
    /// leaving other lines alone.
    fn put_masked(&mut self, mask: u32, value: u32);

    /// Switch the direction of the lines in `mask`.
    fn set_direction_masked(&mut self, mask: u32, direction: Direction);
}

#[cfg(feature = "embedded")]
pub use sio::SioPort;

#[cfg(feature = "embedded")]
mod sio {
    use embassy_rp::gpio::{AnyPin, Flex, Pull};
    use embassy_rp::pac::SIO;

    use super::GpioPort;
    use crate::bus::pins::PinGroup;
    use crate::constants::NUM_GPIOS;
    use crate::types::Direction;

    const NUM_GPIOS_USIZE: usize = NUM_GPIOS as usize;

    /// [`GpioPort`] for bank 0 on the Pico, using the SIO block.
    ///
    /// Pins are handed to this object at start of day.  When a group is
    /// initialised, its pins are turned into [`Flex`] objects, which sets the
    /// pins to SIO control, and these are kept for the lifetime of the
    /// object - dropping them would disconnect the pins.
    pub struct SioPort {
        pins: [Option<AnyPin>; NUM_GPIOS_USIZE],
        flex: [Option<Flex<'static>>; NUM_GPIOS_USIZE],
    }

    impl SioPort {
        pub fn new(pins: [AnyPin; NUM_GPIOS_USIZE]) -> Self {
            Self {
                pins: pins.map(Some),
                flex: [const { None }; NUM_GPIOS_USIZE],
            }
        }

        /// Take a pin which hasn't been put into a group, for other uses,
        /// such as the status LED.
        pub fn take_pin(&mut self, index: u8) -> Option<AnyPin> {
            self.pins.get_mut(index as usize).and_then(Option::take)
        }
    }

    impl GpioPort for SioPort {
        fn init_group(&mut self, group: &PinGroup, direction: Direction) {
            for index in group.first()..=group.last() {
                let index = index as usize;
                let Some(pin) = self.pins[index].take() else {
                    // The pin allocator should make this impossible.
                    panic!("GPIO {} already taken", index);
                };
                let mut flex = Flex::new(pin);
                flex.set_pull(Pull::None);
                match direction {
                    Direction::In => flex.set_as_input(),
                    Direction::Out => flex.set_as_output(),
                }
                self.flex[index] = Some(flex);
            }
        }

        #[inline(always)]
        fn read_all(&mut self) -> u32 {
            SIO.gpio_in(0).read()
        }

        #[inline(always)]
        fn set_mask(&mut self, mask: u32) {
            SIO.gpio_out(0).value_set().write_value(mask);
        }

        #[inline(always)]
        fn clear_mask(&mut self, mask: u32) {
            SIO.gpio_out(0).value_clr().write_value(mask);
        }

        #[inline(always)]
        fn put_masked(&mut self, mask: u32, value: u32) {
            // Toggle exactly the masked bits which differ, in one write.
            let current = SIO.gpio_out(0).value().read();
            SIO.gpio_out(0)
                .value_xor()
                .write_value((current ^ value) & mask);
        }

        #[inline(always)]
        fn set_direction_masked(&mut self, mask: u32, direction: Direction) {
            match direction {
                Direction::Out => SIO.gpio_oe(0).value_set().write_value(mask),
                Direction::In => SIO.gpio_oe(0).value_clr().write_value(mask),
            }
        }
    }
}
