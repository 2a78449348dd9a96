//! Configuration of the card.
//!
//! Everything here is fixed for the life of the firmware.  The defaults come
//! from [`crate::constants`]; tests and hardware test binaries build their
//! own.  The clock override is applied to the hardware by
//! `infra::clocks::embassy_config`, before `embassy_rp::init()`.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_time::Duration;

use crate::bus::{BusPinConfig, BusPinLayout, BusTiming, DEBUG_ADDR_LINES};
use crate::constants::{IO_ADDR, SYS_CLOCK_HZ, USB_POLL_PERIOD, WATCHDOG_TIMER};
use crate::error::ConfigError;
use crate::infra::clocks::{ClockOverride, sys_pll};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    /// The I/O port the mouse answers on.
    pub port: u16,

    /// Replaces the default system clock (and maybe core voltage).  The
    /// spin delays are calibrated from whichever clock is in effect - see
    /// [`BridgeConfig::sys_clock_hz`].
    pub clock: Option<ClockOverride>,

    /// How often the USB host stack is serviced.
    pub poll_interval: Duration,

    /// How long the poll loop can go without feeding the watchdog.
    pub watchdog_timeout: Duration,

    pub pins: BusPinLayout,
    pub timing: BusTiming,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: IO_ADDR,
            clock: None,
            poll_interval: USB_POLL_PERIOD,
            watchdog_timeout: WATCHDOG_TIMER,
            pins: BusPinLayout::default(),
            timing: BusTiming::default(),
        }
    }
}

impl BridgeConfig {
    /// The system clock frequency the board runs at with this configuration.
    pub fn sys_clock_hz(&self) -> u32 {
        self.clock
            .as_ref()
            .map_or(SYS_CLOCK_HZ, ClockOverride::sys_clock_hz)
    }

    /// Check the configuration, returning the bus pin groups if it's good.
    pub fn validate(&self) -> Result<BusPinConfig, ConfigError> {
        let pins = self.pins.build()?;

        // The port has to be representable on the address lines we read.
        let visible = pins.addr.mask() & !pins.reserved;
        if pins.addr.place(u32::from(self.port)) & !visible != 0
            || u32::from(self.port) >> pins.addr.width() != 0
        {
            return Err(ConfigError::MisalignedPort { port: self.port });
        }
        if let Some(clock) = &self.clock {
            if sys_pll(clock).is_none() {
                return Err(ConfigError::UnsupportedClock {
                    khz: clock.sys_clock_khz,
                });
            }
            if clock.voltage.is_some() && cfg!(feature = "pico2") {
                return Err(ConfigError::UnsupportedVoltage);
            }
        }

        debug_assert!(self.pins.debug_uart_on_addr || pins.reserved == 0);
        debug_assert!(pins.reserved.count_ones() <= u32::from(DEBUG_ADDR_LINES));

        Ok(pins)
    }
}
