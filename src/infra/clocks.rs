//! System clock and core voltage overrides.
//!
//! By default the board runs at the embassy-rp default clock.  A
//! [`ClockOverride`] under- or overclocks it, optionally changing the core
//! voltage first.  The PLL settings are found the same way the Pico SDK's
//! `set_sys_clock_khz` does, so any frequency the SDK accepts is accepted
//! here.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::constants::XOSC_KHZ;

/// PLL VCO limits, in kHz.
const VCO_MIN_KHZ: u32 = 750_000;
const VCO_MAX_KHZ: u32 = 1_600_000;

/// PLL feedback divider limits.
const FBDIV_MIN: u16 = 16;
const FBDIV_MAX: u16 = 320;

/// Largest PLL post divider.
const POST_DIV_MAX: u8 = 7;

/// RP2040 core voltage.  The discriminant is the regulator's VSEL value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreVoltage {
    V0_85 = 0b0110,
    V0_90 = 0b0111,
    V0_95 = 0b1000,
    V1_00 = 0b1001,
    V1_05 = 0b1010,
    /// The power on default.
    V1_10 = 0b1011,
    V1_15 = 0b1100,
    V1_20 = 0b1101,
    V1_25 = 0b1110,
    V1_30 = 0b1111,
}

impl CoreVoltage {
    pub const fn vsel(self) -> u8 {
        self as u8
    }

    pub const fn millivolts(self) -> u16 {
        // 50mV steps up from 0.85V.
        850 + (self.vsel() - CoreVoltage::V0_85.vsel()) as u16 * 50
    }
}

/// Replaces the default system clock, and optionally the core voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockOverride {
    /// The system clock frequency, in kHz.
    pub sys_clock_khz: u32,

    /// Set before the clock is changed, if present.  RP2040 only.
    pub voltage: Option<CoreVoltage>,
}

impl ClockOverride {
    pub const fn sys_clock_hz(&self) -> u32 {
        self.sys_clock_khz.saturating_mul(1000)
    }
}

/// System PLL settings for a particular output frequency.  The reference
/// divider is always 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SysPll {
    pub fbdiv: u16,
    pub post_div1: u8,
    pub post_div2: u8,
}

impl SysPll {
    /// Find PLL settings giving exactly `khz` from a `xosc_khz` crystal.
    ///
    /// Searches from the highest VCO frequency down, then from the largest
    /// first post divider down, as the Pico SDK does.  Returns `None` if
    /// `khz` can't be hit exactly.
    pub fn for_freq_khz(xosc_khz: u32, khz: u32) -> Option<Self> {
        if khz == 0 {
            return None;
        }
        for fbdiv in (FBDIV_MIN..=FBDIV_MAX).rev() {
            let vco_khz = u32::from(fbdiv) * xosc_khz;
            if !(VCO_MIN_KHZ..=VCO_MAX_KHZ).contains(&vco_khz) {
                continue;
            }
            for post_div1 in (1..=POST_DIV_MAX).rev() {
                for post_div2 in (1..=post_div1).rev() {
                    let div = u32::from(post_div1) * u32::from(post_div2);
                    if vco_khz % div == 0 && vco_khz / div == khz {
                        return Some(Self {
                            fbdiv,
                            post_div1,
                            post_div2,
                        });
                    }
                }
            }
        }
        None
    }

    /// The frequency this produces from a `xosc_khz` crystal.
    pub const fn output_khz(&self, xosc_khz: u32) -> u32 {
        self.fbdiv as u32 * xosc_khz / (self.post_div1 as u32 * self.post_div2 as u32)
    }
}

/// The PLL settings for `clock`, from the board's crystal.
pub fn sys_pll(clock: &ClockOverride) -> Option<SysPll> {
    SysPll::for_freq_khz(XOSC_KHZ, clock.sys_clock_khz)
}

#[cfg(feature = "embedded")]
pub use rp::embassy_config;

#[cfg(feature = "embedded")]
mod rp {
    use embassy_rp::clocks::{ClockConfig, PllConfig};
    use embassy_rp::config::Config;

    use super::{ClockOverride, CoreVoltage, sys_pll};
    use crate::constants::XOSC_KHZ;

    /// Build the embassy-rp configuration, applying `clock` if there is one.
    ///
    /// Any voltage change is made here, before the clock is raised by
    /// `embassy_rp::init()`.  `clock` must already have been validated.
    pub fn embassy_config(clock: Option<&ClockOverride>) -> Config {
        let Some(clock) = clock else {
            return Config::default();
        };

        if let Some(voltage) = clock.voltage {
            set_core_voltage(voltage);
        }

        let mut clocks = ClockConfig::crystal(XOSC_KHZ * 1000);
        match (clocks.xosc.as_mut(), sys_pll(clock)) {
            (Some(xosc), Some(pll)) => {
                xosc.sys_pll = Some(PllConfig {
                    refdiv: 1,
                    fbdiv: pll.fbdiv,
                    post_div1: pll.post_div1,
                    post_div2: pll.post_div2,
                });
                info!("System clock {}kHz", clock.sys_clock_khz);
            }
            _ => warn!(
                "No PLL settings for {}kHz, using default clock",
                clock.sys_clock_khz
            ),
        }

        Config::new(clocks)
    }

    #[cfg(feature = "pico")]
    fn set_core_voltage(voltage: CoreVoltage) {
        embassy_rp::pac::VREG_AND_CHIP_RESET
            .vreg()
            .modify(|w| w.set_vsel(voltage.vsel()));

        // Let the regulator settle before the clock goes up.
        cortex_m::asm::delay(crate::constants::VREG_SETTLE_CYCLES);
        info!("Core voltage {}mV", voltage.millivolts());
    }

    // Validation rejects a voltage override on the RP235x.
    #[cfg(not(feature = "pico"))]
    fn set_core_voltage(voltage: CoreVoltage) {
        warn!("Ignoring core voltage {}mV", voltage.millivolts());
    }
}
