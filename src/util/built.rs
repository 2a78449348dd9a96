//! This file handles build-time information.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

// Import the build-time information from the `built.rs` output file generated
// during the build process by `build.rs`.
mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

// Expose package version so it can be used in the application.
pub use built_info::PKG_VERSION;

/// Git version, or "unknown" if built outside a git checkout.
pub fn git_version() -> &'static str {
    built_info::GIT_VERSION.unwrap_or("unknown")
}

/// Log build-time information to the console.
pub fn log_fw_info(bin_name: &str) {
    // General information
    info!("{=str} running {=str}", built_info::PKG_NAME, bin_name);
    info!("Author: {=str}", built_info::PKG_AUTHORS);
    info!("Version: {=str}", built_info::PKG_VERSION);

    // Git information
    info!("Git commit: {=str}", built_info::GIT_COMMIT_HASH.unwrap_or("unknown"));
    info!("Git dirty: {}", built_info::GIT_DIRTY.unwrap_or(false));
    info!("Git version: {=str}", git_version());

    // Build information
    info!("Built: {=str}", built_info::BUILT_TIME_UTC);
    info!("Rust version: {=str}", built_info::RUSTC_VERSION);
    info!("Target triple: {=str}", built_info::TARGET);
    info!("Build profile: {=str}", built_info::PROFILE);
    info!("Enabled features: {=str}", built_info::FEATURES_LOWERCASE_STR);
}
