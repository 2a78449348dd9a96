//! Contains the liveness watchdog, which resets the device if the poll loop
//! stops running.
//!
//! The USB host stack has been seen to lock up.  When it does, the poll
//! loop stops feeding the watchdog and the device resets, which is the only
//! way to recover.  The policing is done by `task-watchdog`: the poll loop
//! is its only task, fed at the start of each serviced poll and checked at
//! the end, so a poll which took longer than the timeout is spotted in
//! software, rather than a late feed rescuing a stack that is misbehaving.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_time::{Duration, Instant};
use task_watchdog::{Clock, HardwareWatchdog, Id, ResetReason, Watchdog, WatchdogConfig};

use crate::config::BridgeConfig;

#[cfg(feature = "embedded")]
pub use task_watchdog::EmbassyClock;
#[cfg(feature = "embedded")]
pub use task_watchdog::embassy_rp::RpWatchdog;

/// The tasks which are policed by the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskId {
    /// The [`PollLoop`](crate::task::PollLoop).  The TinyUSB task function
    /// runs inside it, so this also polices the USB host stack.
    PollLoop = 0,

    /// The number of tasks policed by the watchdog.
    Num,
}
impl Id for TaskId {}
pub const NUM_TASK_IDS: usize = TaskId::Num as usize;

/// A clock the watchdog and the poll loop can both use - one which deals in
/// embassy-time types.
pub trait BridgeClock: Clock<Instant = Instant, Duration = Duration> {}
impl<C: Clock<Instant = Instant, Duration = Duration>> BridgeClock for C {}

// Create a type alias for the Watchdog to make it easier to use.
pub type WatchdogType<W, C> = Watchdog<TaskId, NUM_TASK_IDS, W, C>;

/// A helper function to create the watchdog, with the poll loop registered.
/// The watchdog isn't started - [`PollLoop::new`](crate::task::PollLoop::new)
/// does that.
pub fn create_watchdog<W, C>(
    hw_watchdog: W,
    clock: C,
    config: &BridgeConfig,
) -> WatchdogType<W, C>
where
    W: HardwareWatchdog<C>,
    C: BridgeClock,
{
    // The software check happens once per poll, so the hardware watchdog
    // only fires if the poll loop stops altogether.
    let wd_config = WatchdogConfig {
        hardware_timeout: config.watchdog_timeout,
        check_interval: config.poll_interval,
    };

    let mut watchdog = Watchdog::new(hw_watchdog, wd_config, clock);
    if watchdog
        .register_task(&TaskId::PollLoop, config.watchdog_timeout)
        .is_err()
    {
        // Can only happen if NUM_TASK_IDS is wrong.
        error!("Failed to register poll loop with watchdog");
    }
    watchdog
}

/// Describes why the device last reset.
pub fn reset_reason_str(reason: Option<ResetReason>) -> &'static str {
    match reason {
        Some(ResetReason::Forced) => "forced",
        Some(ResetReason::TimedOut) => "watchdog timer",
        None => "power on or reset pin",
    }
}

/// Log why the device last reset.
pub fn log_reset_reason(reason: Option<ResetReason>) {
    info!("Last reset reason: {=str}", reset_reason_str(reason));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_reasons_described() {
        assert_eq!(reset_reason_str(Some(ResetReason::Forced)), "forced");
        assert_eq!(
            reset_reason_str(Some(ResetReason::TimedOut)),
            "watchdog timer"
        );
        assert_eq!(reset_reason_str(None), "power on or reset pin");
    }

    #[test]
    fn poll_loop_is_the_only_task() {
        assert_eq!(NUM_TASK_IDS, 1);
    }
}
