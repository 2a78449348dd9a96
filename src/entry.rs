//! Start of day for the firmware.  The binary's `main()` calls
//! [`common_main`], which sets everything up and then runs the poll loop
//! forever.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embassy_executor::Spawner;
use embassy_rp::gpio::{Level, Output};
use embassy_time::Timer;

use crate::bridge::MouseBridge;
use crate::bus::IsaBus;
use crate::config::BridgeConfig;
use crate::constants::{POLL_LOOP_TIMER, STATUS_LED_PIN};
use crate::infra::display::StatusLed;
use crate::infra::clocks::embassy_config;
use crate::infra::watchdog::{EmbassyClock, RpWatchdog, create_watchdog, log_reset_reason};
use crate::protocol::PacketSender;
use crate::task::{PollLoop, PollStatus};
use crate::usb::tinyusb::TinyUsbHost;
use crate::util::built::log_fw_info;
use crate::util::time::CycleDelay;

/// Hand every bank 0 GPIO in `$p` (the embassy-rp peripherals) to a new
/// [`SioPort`](crate::infra::gpio::SioPort).  Pins which don't end up in a
/// bus group can be taken back with `take_pin`.
#[macro_export]
macro_rules! sio_port {
    ($p:ident) => {
        $crate::sio_port!(
            @pins $p, PIN_0, PIN_1, PIN_2, PIN_3, PIN_4, PIN_5, PIN_6, PIN_7, PIN_8, PIN_9,
            PIN_10, PIN_11, PIN_12, PIN_13, PIN_14, PIN_15, PIN_16, PIN_17, PIN_18, PIN_19,
            PIN_20, PIN_21, PIN_22, PIN_23, PIN_24, PIN_25, PIN_26, PIN_27, PIN_28, PIN_29
        )
    };
    (@pins $p:ident, $($pin:ident),*) => {
        $crate::infra::gpio::SioPort::new([$(::embassy_rp::gpio::AnyPin::from($p.$pin)),*])
    };
}

/// Main entry point for the firmware.
pub async fn common_main(_spawner: Spawner, bin_name: &'static str) -> ! {
    info!("-----");
    info!("pico-isa-mouse");
    info!("Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>");
    info!("-----");

    log_fw_info(bin_name);

    // Check the configuration before touching the clocks or any pins.  A bad
    // configuration is a build problem, so there's no recovering from it.
    let config = BridgeConfig::default();
    let pins = match config.validate() {
        Ok(pins) => pins,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            panic!("Invalid configuration");
        }
    };

    let p = embassy_rp::init(embassy_config(config.clock.as_ref()));

    let mut port = crate::sio_port!(p);

    // The LED isn't part of the bus, so take it out before the bus is set
    // up.
    let Some(led_pin) = port.take_pin(STATUS_LED_PIN) else {
        panic!("Status LED pin unavailable");
    };
    let status_led = StatusLed::new(Output::new(led_pin, Level::Low));

    let bus = IsaBus::new(
        port,
        CycleDelay::new(config.sys_clock_hz()),
        pins,
        config.timing,
    );
    let sender = PacketSender::new(bus, config.port);
    info!("Serial mouse on I/O port {:#x}", sender.port());
    let mut bridge = MouseBridge::new(sender, status_led);

    let Some(host) = TinyUsbHost::new(p.USB) else {
        panic!("Failed to start USB host");
    };

    let watchdog = create_watchdog(RpWatchdog::new(p.WATCHDOG), EmbassyClock, &config);
    let mut poll_loop = PollLoop::new(host, watchdog, EmbassyClock, config.poll_interval);
    log_reset_reason(poll_loop.reset_reason());

    info!("Entering poll loop");
    loop {
        if poll_loop.poll(&mut bridge) == PollStatus::Starved {
            poll_loop.trigger_reset();
        }
        Timer::after(POLL_LOOP_TIMER).await;
    }
}

/// Called by the binary's defmt panic handler.
pub fn defmt_panic_handler() -> ! {
    panic!("defmt panic");
}

/// Called by the binary's core panic handler.  Logs the panic, then waits
/// for the watchdog to reset the device.
pub fn panic_handler(info: &core::panic::PanicInfo) -> ! {
    error!("Panic: {}", defmt::Display2Format(info));
    loop {
        cortex_m::asm::nop();
    }
}
