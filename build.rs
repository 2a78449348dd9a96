//! This build script handles:
//! - Exposing build-time information to the application.
//! - Copying `memory.x` to the output directory to allow the firmware to be
//!   created.
//! - Linking the external TinyUSB host stack into the firmware.
//!
//! ## Build-time information
//!
//! Written by `built` for every build, including host test builds.
//!
//! ## `memory.x` file handling
//!
//! This build script copies the appropriate memory.x file from the `link/`
//! dir into a directory where the linker can find it at link time.  This is
//! only done for board builds (the `pico` or `pico2` feature), so the
//! library can still be built and tested on the host.
//!
//! ## TinyUSB
//!
//! The USB host stack is not part of this crate.  Board builds link a
//! prebuilt `libtinyusb.a` (built for the target with HID host support),
//! found in the directory named by `TINYUSB_LIB_DIR`.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

// memory.x handling derived from embassy-rs examples.

use std::env;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

fn main() {
    // Expose build-time information to the application.

    // Re-run this build script if anything in git changes.
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/");

    // Re-run this build script of DEFMT_LOG changes.
    println!("cargo:rerun-if-env-changed=DEFMT_LOG");

    // Get built-time information
    built::write_built_file().expect("Failed to acquire build-time information");

    // RP2040 and RP235X use different memory.x files.  Ensure the build
    // script is re-run if the appropriate memory.x file changes.  Note that
    // neither file should be called memory.x, as then the linker will pick up
    // that file from our root directory, instead of the version we put in
    // OUT_DIR, below.
    let pico = env::var_os("CARGO_FEATURE_PICO").is_some();
    let pico2 = env::var_os("CARGO_FEATURE_PICO2").is_some();
    let memory_x: &[u8] = if pico {
        println!("cargo:rerun-if-changed=link/memory.rp2040.x");
        include_bytes!("link/memory.rp2040.x")
    } else if pico2 {
        println!("cargo:rerun-if-changed=link/memory.rp235x.x");
        include_bytes!("link/memory.rp235x.x")
    } else {
        // Host build - nothing to link.
        return;
    };

    // Put `memory.x` in our output directory and ensure it's on the linker
    // search path.
    let out = &PathBuf::from(env::var_os("OUT_DIR").unwrap());
    File::create(out.join("memory.x"))
        .unwrap()
        .write_all(memory_x)
        .unwrap();
    println!("cargo:rustc-link-search={}", out.display());

    // Link the TinyUSB host stack.
    println!("cargo:rerun-if-env-changed=TINYUSB_LIB_DIR");
    if let Some(dir) = env::var_os("TINYUSB_LIB_DIR") {
        println!("cargo:rustc-link-search={}", PathBuf::from(dir).display());
    }
    println!("cargo:rustc-link-lib=static=tinyusb");

    // Set embassy linker arguments for the binary.
    println!("cargo:rustc-link-arg=-v");
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    println!("cargo:rustc-link-arg-bins=-Tdevice.x");

    // Only RP2040 uses this linker file.
    if pico {
        println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    }
}
