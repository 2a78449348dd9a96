//! Handles displaying status of the device on the LED.
//!
//! The LED is lit at start of day, and then toggles every time a mouse
//! report arrives, so moving the mouse makes it flicker.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embedded_hal::digital::OutputPin;

/// Status LED.
pub struct StatusLed<P> {
    /// The GPIO pin connected to the LED
    led: P,

    /// Current LED state (on or off)
    led_state: bool,
}

impl<P: OutputPin> StatusLed<P> {
    /// Creates a new StatusLed, with the LED on.
    pub fn new(led: P) -> Self {
        let mut status = Self {
            led,
            led_state: false,
        };
        status.set(true);
        status
    }

    pub fn is_on(&self) -> bool {
        self.led_state
    }

    /// Show activity by flipping the LED.
    pub fn toggle(&mut self) {
        self.set(!self.led_state);
    }

    pub fn set(&mut self, on: bool) {
        // A failure to drive an LED isn't worth worrying about.
        let _ = if on {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        self.led_state = on;
    }
}
