//! pico-isa-mouse
//!
//! This implements an ISA card which lets a USB mouse be used with a PC
//! which only has an ISA bus.
//!
//! A USB mouse is plugged into the Pico's USB port, which runs as a USB host.
//! Each report from the mouse is converted into a 3 byte Microsoft serial
//! mouse packet, and each byte is handed to the PC by raising IRQ and then
//! answering the read of the card's I/O port, inserting wait states with
//! IORDY while the data is put on the bus.
//!
//! The library builds without the `embedded` feature, which leaves out the
//! RP2040/RP235x specific code, so the bus handshake, packet encoding and
//! event handling can be tested on the host.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![cfg_attr(not(test), no_std)]

// Provide some feature guidance when compiling the library.
#[cfg(all(feature = "pico", feature = "pico2"))]
compile_error!("Features 'pico' and 'pico2' cannot be enabled simultaneously");
#[cfg(all(feature = "embedded", not(any(feature = "pico", feature = "pico2"))))]
compile_error!("Either 'pico' or 'pico2' feature must be enabled for a firmware build");

// This must come first, so the logging macros are visible to every module.
#[macro_use]
mod fmt;

// Declare all of this library's modules.
pub mod bridge;
pub mod bus;
pub mod config;
pub mod constants;
#[cfg(feature = "embedded")]
pub mod entry;
pub mod error;
pub mod infra;
pub mod mouse;
pub mod protocol;
pub mod task;
pub mod types;
pub mod usb;
pub mod util;

#[cfg(feature = "embedded")]
pub use entry::{common_main, defmt_panic_handler, panic_handler};

// Extra binary information that picotool can read.
#[cfg(feature = "embedded")]
#[unsafe(link_section = ".bi_entries")]
#[used]
pub static PICOTOOL_ENTRIES: [embassy_rp::binary_info::EntryAddr; 4] = [
    embassy_rp::binary_info::rp_program_name!(c"pico-isa-mouse by piers.rocks"),
    embassy_rp::binary_info::rp_program_description!(
        c"An ISA card which presents a USB mouse to the PC as a Microsoft serial mouse."
    ),
    embassy_rp::binary_info::rp_cargo_version!(),
    embassy_rp::binary_info::rp_program_build_attribute!(),
];

// A note about statics
//
// There is only one that matters: the queue the USB host stack's callbacks
// push events into, in `usb::tinyusb`.  The callbacks are called from inside
// `tuh_task()`, which is called from the poll loop, so in practice there is
// never contention, but the queue is still behind a blocking Mutex with a
// CriticalSectionRawMutex, as the callbacks are `extern "C"` functions and
// cannot be handed a reference to anything.
//
// Everything else is owned by the poll loop, which is built in
// `entry::common_main` and never returns.
