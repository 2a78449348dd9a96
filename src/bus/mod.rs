//! This module implements the card's side of the ISA bus.
//!
//! [`IsaBus`] owns the pin groups for each ISA signal we see, and provides:
//! - snapshot based reads of the bus, and
//! - the signal level operations needed for the read cycle handshake.
//!
//! A note about snapshots.  None of the field getters ([`IsaBus::addr`],
//! [`IsaBus::io_read`], etc) read the bus.  [`IsaBus::capture_snapshot`]
//! reads every line with a single register read and caches it, and the
//! getters pick fields out of that cached value.  This is partly for speed,
//! but mostly so that several fields examined for one decision (IOR went
//! low, and what was on the address lines at that moment) come from the same
//! instant.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

pub mod pins;

use embedded_hal::delay::DelayNs;

use crate::constants::{
    ADDR_PINS, DATA_PINS, IOR_PIN, IORDY_PIN, IOW_PIN, IRQ_PIN, MEMR_PIN, MEMW_PIN,
    READY_RELEASE_BUDGET, WRITE_SETTLE_NS,
};
use crate::error::{BusError, ConfigError};
use crate::infra::gpio::GpioPort;
use crate::types::Direction;
use pins::{PinAllocator, PinGroup};

/// Number of low address lines left to an external debug UART when
/// `serial-debug` is enabled.  They are never set up or driven by the bus,
/// and read as 0.
pub const DEBUG_ADDR_LINES: u8 = 2;

/// The pin groups for every ISA signal we use.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusPinConfig {
    pub addr: PinGroup,
    pub data: PinGroup,
    pub irq: PinGroup,
    pub mem_read: PinGroup,
    pub mem_write: PinGroup,
    pub io_read: PinGroup,
    pub io_write: PinGroup,
    pub ready: PinGroup,

    /// Lines which are in a group's range but are not ours to read, and are
    /// forced to 0 in every snapshot.
    pub reserved: u32,
}

/// Line numbers for each ISA signal, before they have been checked and
/// turned into [`PinGroup`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusPinLayout {
    pub addr: (u8, u8),
    pub data: (u8, u8),
    pub irq: u8,
    pub mem_read: u8,
    pub mem_write: u8,
    pub io_read: u8,
    pub io_write: u8,
    pub ready: u8,

    /// Whether the lowest [`DEBUG_ADDR_LINES`] address lines are reserved for
    /// an external debug UART.
    pub debug_uart_on_addr: bool,
}

/// The card's pinout.
impl Default for BusPinLayout {
    fn default() -> Self {
        Self {
            addr: ADDR_PINS,
            data: DATA_PINS,
            irq: IRQ_PIN,
            mem_read: MEMR_PIN,
            mem_write: MEMW_PIN,
            io_read: IOR_PIN,
            io_write: IOW_PIN,
            ready: IORDY_PIN,
            debug_uart_on_addr: cfg!(feature = "serial-debug"),
        }
    }
}

impl BusPinLayout {
    /// Check the layout, and build the pin groups.  Fails if any two signals
    /// share a line.
    pub fn build(&self) -> Result<BusPinConfig, ConfigError> {
        let mut alloc = PinAllocator::new();
        let addr = alloc.claim("Addr", self.addr.0, self.addr.1)?;
        let data = alloc.claim("Data", self.data.0, self.data.1)?;
        let irq = alloc.claim_pin("IRQ", self.irq)?;
        let mem_read = alloc.claim_pin("MemR", self.mem_read)?;
        let mem_write = alloc.claim_pin("MemW", self.mem_write)?;
        let io_read = alloc.claim_pin("IOR", self.io_read)?;
        let io_write = alloc.claim_pin("IOW", self.io_write)?;
        let ready = alloc.claim_pin("IORDY", self.ready)?;

        let reserved = if self.debug_uart_on_addr {
            match addr.without_low(DEBUG_ADDR_LINES) {
                Some(upper) => addr.mask() & !upper.mask(),
                None => {
                    return Err(ConfigError::InvalidRange {
                        first: self.addr.0,
                        last: self.addr.1,
                    });
                }
            }
        } else {
            0
        };

        Ok(BusPinConfig {
            addr,
            data,
            irq,
            mem_read,
            mem_write,
            io_read,
            io_write,
            ready,
            reserved,
        })
    }
}

/// Timings and loop bounds used by the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusTiming {
    /// Delay between driving the data lines and releasing IORDY.
    pub write_settle_ns: u32,

    /// Bus samples to wait for IOR to be released after a write.
    pub ready_release_budget: u32,

    /// Bus samples to wait for a read of our port after raising IRQ.
    pub read_cycle_budget: u32,

    /// How long to hold off after abandoning a byte.
    pub abandon_hold_ns: u32,
}

impl Default for BusTiming {
    fn default() -> Self {
        Self {
            write_settle_ns: WRITE_SETTLE_NS,
            ready_release_budget: READY_RELEASE_BUDGET,
            read_cycle_budget: crate::constants::READ_CYCLE_BUDGET,
            abandon_hold_ns: crate::constants::ABANDON_HOLD_NS,
        }
    }
}

/// One reading of every line on the bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusSnapshot(u32);

impl BusSnapshot {
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// The value of a group's lines in this snapshot.
    #[inline(always)]
    pub fn field(&self, group: &PinGroup) -> u32 {
        group.extract(self.0)
    }
}

/// The ISA bus, as seen from the card.
pub struct IsaBus<G, D> {
    port: G,
    delay: D,
    pins: BusPinConfig,
    timing: BusTiming,
    snapshot: BusSnapshot,
}

impl<G: GpioPort, D: DelayNs> IsaBus<G, D> {
    /// Set up the bus pins.  Every ISA line starts as an input - we only
    /// drive lines during the parts of the handshake which need it.
    pub fn new(mut port: G, delay: D, pins: BusPinConfig, timing: BusTiming) -> Self {
        let addr = match pins.addr.without_low(DEBUG_ADDR_LINES) {
            // Don't touch the address lines the debug UART is using.
            Some(upper) if pins.reserved != 0 => upper,
            _ => pins.addr,
        };

        for group in [
            &addr,
            &pins.data,
            &pins.irq,
            &pins.mem_read,
            &pins.mem_write,
            &pins.io_read,
            &pins.io_write,
            &pins.ready,
        ] {
            info!(
                "Setting up GPIO {=str} {}-{} Mask={:#x} {}",
                group.name(),
                group.first(),
                group.last(),
                group.mask(),
                Direction::In
            );
            port.init_group(group, Direction::In);
        }

        Self {
            port,
            delay,
            pins,
            timing,
            snapshot: BusSnapshot::default(),
        }
    }

    pub fn pins(&self) -> &BusPinConfig {
        &self.pins
    }

    pub fn timing(&self) -> &BusTiming {
        &self.timing
    }

    /// Access the spin delay, for hold-offs which aren't part of a bus
    /// cycle.
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Give back the GPIO port and delay.
    pub fn release(self) -> (G, D) {
        (self.port, self.delay)
    }

    /// Read the state of the whole bus.  You must call this before any of the
    /// field getters, which only look at the last snapshot.
    #[inline(always)]
    pub fn capture_snapshot(&mut self) -> BusSnapshot {
        self.snapshot = BusSnapshot(self.port.read_all() & !self.pins.reserved);
        self.snapshot
    }

    /// Returns the snapshot taken by [`Self::capture_snapshot`].  This does
    /// _not_ read the bus.
    #[inline(always)]
    pub fn snapshot(&self) -> BusSnapshot {
        self.snapshot
    }

    // WARNING: None of these getters read the bus!

    #[inline(always)]
    pub fn addr(&self) -> u32 {
        self.snapshot.field(&self.pins.addr)
    }

    #[inline(always)]
    pub fn data(&self) -> u32 {
        self.snapshot.field(&self.pins.data)
    }

    #[inline(always)]
    pub fn irq(&self) -> bool {
        self.snapshot.field(&self.pins.irq) != 0
    }

    #[inline(always)]
    pub fn mem_read(&self) -> bool {
        self.snapshot.field(&self.pins.mem_read) != 0
    }

    #[inline(always)]
    pub fn mem_write(&self) -> bool {
        self.snapshot.field(&self.pins.mem_write) != 0
    }

    #[inline(always)]
    pub fn io_read(&self) -> bool {
        self.snapshot.field(&self.pins.io_read) != 0
    }

    #[inline(always)]
    pub fn io_write(&self) -> bool {
        self.snapshot.field(&self.pins.io_write) != 0
    }

    #[inline(always)]
    pub fn ready(&self) -> bool {
        self.snapshot.field(&self.pins.ready) != 0
    }

    /// Pull IORDY low, telling the host to insert wait states.
    #[inline(always)]
    pub fn deassert_ready(&mut self) {
        let mask = self.pins.ready.mask();
        self.port.set_direction_masked(mask, Direction::Out);
        self.port.clear_mask(mask);
    }

    /// Drive IORDY high, letting the host complete the cycle.  The level is
    /// set before the direction so we never glitch low.
    #[inline(always)]
    pub fn assert_ready(&mut self) {
        let mask = self.pins.ready.mask();
        self.port.set_mask(mask);
        self.port.set_direction_masked(mask, Direction::Out);
    }

    /// Raise IRQ, telling the host there's data to read.
    #[inline(always)]
    pub fn assert_irq(&mut self) {
        let mask = self.pins.irq.mask();
        self.port.set_direction_masked(mask, Direction::Out);
        self.port.set_mask(mask);
    }

    /// Drop IRQ and stop driving it.
    #[inline(always)]
    pub fn deassert_irq(&mut self) {
        let mask = self.pins.irq.mask();
        self.port.clear_mask(mask);
        self.port.set_direction_masked(mask, Direction::In);
    }

    /// The data phase of a read cycle of our port: put `value` on the data
    /// bus, let the host latch it, and get off the bus again.
    ///
    /// The caller must have pulled IORDY low.  Returns
    /// [`BusError::ReadStrobeStuck`] if the host didn't release IOR within
    /// the budget - the data lines are still released in that case.
    pub fn write_cycle(&mut self, value: u8) -> Result<(), BusError> {
        let data = self.pins.data;

        // Switch the data pins to outputs and drive the value.
        self.port.set_direction_masked(data.mask(), Direction::Out);
        self.port.put_masked(data.mask(), data.place(u32::from(value)));

        // *** This is very important!!! ***
        // Too short or too long and the host won't read the data reliably.
        self.delay.delay_ns(self.timing.write_settle_ns);

        // Data is valid - let the host finish the cycle.
        self.assert_ready();

        // Keep the data on the bus until IOR goes high again.
        let mut result = Err(BusError::ReadStrobeStuck);
        for _ in 0..self.timing.ready_release_budget {
            self.capture_snapshot();
            if self.io_read() {
                result = Ok(());
                break;
            }
        }
        if result.is_err() {
            warn!(
                "IOR still low after {} samples - releasing data bus",
                self.timing.ready_release_budget
            );
        }

        // Detach from the data bus.
        self.port.set_direction_masked(data.mask(), Direction::In);

        result
    }
}
