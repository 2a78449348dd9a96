//! This module contains constants for pico-isa-mouse.
//!
//! Most of these are defaults, which are gathered into the configuration
//! objects in [`crate::config`].  Tests build their own configurations.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_time::Duration;
use static_assertions::const_assert;

//
// ISA bus
//

/// The I/O port the emulated serial mouse answers on.  0x2E8 is COM4, which
/// is unlikely to clash with a real serial port in the target machine.
pub const IO_ADDR: u16 = 0x2E8;

// When address lines 0 and 1 are reserved for an external debug UART, those
// lines always read as 0, so the port must be 4-byte aligned.
#[cfg(feature = "serial-debug")]
const_assert!(IO_ADDR & 0b11 == 0);

/// There is a minimum 85ns delay between the data write and IORDY being
/// released.  This is very important - values too low or too high won't
/// work.  On a Pentium system 50-100ns per step worked, 4 steps is used.
pub const WRITE_SETTLE_NS: u32 = 4 * 85;

/// How many times we re-sample the bus waiting for the host to release IOR
/// after it has latched our data.
pub const READY_RELEASE_BUDGET: u32 = 1024;

/// How many times we sample the bus waiting for the host to read our port,
/// after raising IRQ, before giving up on the byte.
pub const READ_CYCLE_BUDGET: u32 = 10_000;

/// How long IRQ stays low after a byte has been abandoned, before we return.
pub const ABANDON_HOLD_NS: u32 = 100;

//
// Pin constants
//
// The source code serves as the master list of pin assignments for the
// hardware.
//

/// Address lines A0-A11.
pub const ADDR_PINS: (u8, u8) = (0, 11);

/// IRQ line.
pub const IRQ_PIN: u8 = 12;

/// MEMR strobe.
pub const MEMR_PIN: u8 = 13;

/// MEMW strobe.
pub const MEMW_PIN: u8 = 14;

/// Data lines D0-D7.
pub const DATA_PINS: (u8, u8) = (15, 22);

/// Status LED pin on the Pico.
pub const STATUS_LED_PIN: u8 = 25;

/// IOR strobe.
pub const IOR_PIN: u8 = 26;

/// IOW strobe.
pub const IOW_PIN: u8 = 27;

/// IOCHRDY (ready) line.
pub const IORDY_PIN: u8 = 28;

/// Total number of GPIOs in the bank we drive.
pub const NUM_GPIOS: u8 = 30;

const_assert!(IORDY_PIN < NUM_GPIOS);
const_assert!(DATA_PINS.1 - DATA_PINS.0 == 7);

//
// Clocks
//

/// The system clock frequency.  The cycle counting delays are calibrated
/// against this, so it must match what the clocks are configured to.
#[cfg(not(feature = "pico2"))]
pub const SYS_CLOCK_HZ: u32 = 125_000_000;
#[cfg(feature = "pico2")]
pub const SYS_CLOCK_HZ: u32 = 150_000_000;

/// The crystal fitted to the Pico and Pico 2, in kHz.
pub const XOSC_KHZ: u32 = 12_000;

/// How long to spin after changing the core voltage, before raising the
/// clock.  At least 10ms, even at the fastest the ring oscillator runs.
pub const VREG_SETTLE_CYCLES: u32 = 1_000_000;

//
// Poll loop and watchdog timers
//

/// How often the USB host stack is serviced.
pub const USB_POLL_PERIOD: Duration = Duration::from_millis(1);

/// How long the poll loop pauses between checks of whether it is time to
/// service the USB host stack.
pub const POLL_LOOP_TIMER: Duration = Duration::from_micros(100);

/// Watchdog timer - the watchdog resets the system if it isn't fed at
/// least this frequently.  The USB host stack has been seen to be flaky, and
/// this is how we recover.
pub const WATCHDOG_TIMER: Duration = Duration::from_secs(1);

const_assert!(USB_POLL_PERIOD.as_ticks() < WATCHDOG_TIMER.as_ticks());

//
// USB HID
//

/// Maximum HID report size we accept from the USB host stack.
pub const MAX_REPORT_LEN: usize = 64;

/// Number of host stack events that can be outstanding between being raised
/// by the stack and being dispatched by the poll loop.
pub const HOST_EVENT_QUEUE_LEN: usize = 4;
