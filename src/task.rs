//! Implements the poll loop.
//!
//! Threading and tasks model
//!
//! There's only one.  Everything - servicing the USB host stack, handling
//! its events, and the bus handshake for each mouse packet - runs to
//! completion, in order, from [`PollLoop::poll`].  There is nothing to lock,
//! and a packet can never be built from a half-updated mouse state.
//!
//! The bus handshake bounds all of its own loops, but the USB host stack's
//! task function may not return at all.  That is caught by the watchdog:
//! the poll loop's task is fed at the start of each serviced poll, and
//! checked once that poll's events have been handled.  If it never returns
//! the hardware watchdog isn't fed, and if it returns late the check fails.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::bridge::MouseBridge;
use crate::infra::gpio::GpioPort;
use task_watchdog::{Clock, HardwareWatchdog, ResetReason};

use crate::infra::watchdog::{BridgeClock, TaskId, WatchdogType};
use crate::usb::UsbHost;

/// Result of one call to [`PollLoop::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollStatus {
    /// Not yet time to service the USB host stack.
    Idle,

    /// The USB host stack was serviced and this many events handled.
    Serviced(usize),

    /// The poll took too long and starved the watchdog.  The caller must
    /// reset the device, with [`PollLoop::trigger_reset`].
    Starved,
}

/// The top level loop.
pub struct PollLoop<H, W, C>
where
    W: HardwareWatchdog<C>,
    C: Clock,
{
    host: H,
    watchdog: WatchdogType<W, C>,
    clock: C,
    interval: Duration,
    last_poll: Option<Instant>,
}

impl<H, W, C> PollLoop<H, W, C>
where
    H: UsbHost,
    W: HardwareWatchdog<C>,
    C: BridgeClock,
{
    /// Create the poll loop, and start the watchdog.  `watchdog` must have
    /// [`TaskId::PollLoop`] registered - see
    /// [`create_watchdog`](crate::infra::watchdog::create_watchdog).
    pub fn new(
        host: H,
        mut watchdog: WatchdogType<W, C>,
        clock: C,
        interval: Duration,
    ) -> Self {
        watchdog.start();
        Self {
            host,
            watchdog,
            clock,
            interval,
            last_poll: None,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn watchdog_mut(&mut self) -> &mut WatchdogType<W, C> {
        &mut self.watchdog
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Get the reason for the last reset.
    pub fn reset_reason(&self) -> Option<ResetReason> {
        self.watchdog.reset_reason()
    }

    /// Reset the device.
    pub fn trigger_reset(&mut self) -> ! {
        self.watchdog.trigger_reset()
    }

    /// If the poll interval has passed, service the USB host stack and handle
    /// every event it raised, all within one watchdog feed.
    pub fn poll<G, D, P>(&mut self, bridge: &mut MouseBridge<G, D, P>) -> PollStatus
    where
        G: GpioPort,
        D: DelayNs,
        P: OutputPin,
    {
        let now = self.clock.now();
        if let Some(last) = self.last_poll {
            if now.saturating_duration_since(last) < self.interval {
                return PollStatus::Idle;
            }
        }
        self.last_poll = Some(now);

        self.watchdog.feed(&TaskId::PollLoop);

        self.host.task();
        let mut handled = 0;
        while let Some(event) = self.host.next_event() {
            let outcome = bridge.handle_event(&mut self.host, event);
            trace!("Event outcome: {}", outcome);
            handled += 1;
        }

        // Feeds the hardware watchdog, unless this poll took too long.
        if self.watchdog.check() {
            PollStatus::Starved
        } else {
            PollStatus::Serviced(handled)
        }
    }
}
