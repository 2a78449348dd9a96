//! pico-isa-mouse firmware.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![no_std]
#![no_main]

use defmt_rtt as _;
use pico_isa_mouse::{defmt_panic_handler, panic_handler};

#[embassy_executor::main]
async fn main(spawner: embassy_executor::Spawner) -> ! {
    pico_isa_mouse::common_main(spawner, env!("CARGO_BIN_NAME")).await
}

// Custom defmt panic handler
#[defmt::panic_handler]
fn defmt_panic() -> ! {
    defmt_panic_handler()
}

// Custom core panic handler
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    panic_handler(info)
}
