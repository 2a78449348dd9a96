//! This file implements the timing primitives used by pico-isa-mouse.
//!
//! There are two quite different needs:
//! - The bus handshake needs delays of a few hundred nanoseconds, which must
//!   be tight spins.  embassy-time can't go below its 1MHz tick rate, so we
//!   count clock cycles instead - see [`CycleDelay`].
//! - The poll loop and watchdog deal in milliseconds, and need to be driven
//!   by a mock clock in tests.  They share `task-watchdog`'s `Clock` trait -
//!   see [`BridgeClock`](crate::infra::watchdog::BridgeClock).

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

/// Number of clock cycles needed to cover `ns` nanoseconds at `clock_hz`,
/// rounded up.  This won't be precise at the very shortest delays, as each
/// cycle takes ~8ns on the Pico and ~6ns on the Pico 2, but rounding up means
/// we never delay for less than asked.
pub const fn cycles_for_ns(ns: u32, clock_hz: u32) -> u32 {
    let cycles = (ns as u64 * clock_hz as u64).div_ceil(1_000_000_000);
    if cycles > u32::MAX as u64 {
        u32::MAX
    } else {
        cycles as u32
    }
}

/// A spinning nanosecond delay, calibrated to the system clock frequency.
///
/// This never yields - it burns cycles on the current core, which is what we
/// want in the middle of a bus cycle.
#[cfg(feature = "embedded")]
#[derive(Debug, Clone, Copy)]
pub struct CycleDelay {
    clock_hz: u32,
}

#[cfg(feature = "embedded")]
impl CycleDelay {
    pub const fn new(clock_hz: u32) -> Self {
        Self { clock_hz }
    }
}

#[cfg(feature = "embedded")]
impl embedded_hal::delay::DelayNs for CycleDelay {
    #[inline(always)]
    fn delay_ns(&mut self, ns: u32) {
        // Use cortex_m assembly to burn exactly that number of cycles
        cortex_m::asm::delay(cycles_for_ns(ns, self.clock_hz));
    }
}
