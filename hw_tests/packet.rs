//! test_packet
//!
//! Tests the bus handshake, without needing a USB mouse.  Repeatedly offers
//! a fixed mouse packet to the host - left button down, moving right and
//! down - and logs whether each one was read.  Run a serial mouse test
//! program on the host, configured for the card's I/O port and IRQ, and the
//! pointer should drift to the bottom right.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt::{info, warn};
use embassy_executor::Spawner;
use embassy_time::Timer;
use pico_isa_mouse::bus::IsaBus;
use pico_isa_mouse::config::BridgeConfig;
use pico_isa_mouse::infra::clocks::embassy_config;
use pico_isa_mouse::mouse::{MouseState, RawMouseReport};
use pico_isa_mouse::protocol::PacketSender;
use pico_isa_mouse::util::time::CycleDelay;
use {defmt_rtt as _, panic_probe as _};

pub const DELAY_MS: u64 = 250;

// Left button, X +5, Y +3.
const TEST_REPORT: [u8; 3] = [0x01, 0x05, 0x03];

#[embassy_executor::main]
async fn main(_spawner: Spawner) -> ! {
    info!("pico-isa-mouse test packet");

    let config = BridgeConfig::default();
    let pins = match config.validate() {
        Ok(pins) => pins,
        Err(e) => defmt::panic!("Invalid configuration: {}", e),
    };

    let p = embassy_rp::init(embassy_config(config.clock.as_ref()));
    let port = pico_isa_mouse::sio_port!(p);
    let bus = IsaBus::new(
        port,
        CycleDelay::new(config.sys_clock_hz()),
        pins,
        config.timing,
    );
    let mut sender = PacketSender::new(bus, config.port);

    let mut mouse = MouseState::new();
    if let Some(report) = RawMouseReport::from_boot_report(&TEST_REPORT) {
        mouse.import(&report);
    }
    info!("Test packet {:#x} on port {:#x}", mouse.packet(), sender.port());

    let mut sent = 0u32;
    let mut dropped = 0u32;
    loop {
        match sender.send_packet(&mouse) {
            Ok(()) => sent += 1,
            Err(e) => {
                dropped += 1;
                warn!("Packet not read: {}", e);
            }
        }
        if (sent + dropped) % 16 == 0 {
            info!("Sent {} packets, {} dropped", sent, dropped);
        }
        Timer::after_millis(DELAY_MS).await;
    }
}
