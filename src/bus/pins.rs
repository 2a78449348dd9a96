//! Contiguous groups of bus-facing GPIOs.
//!
//! A [`PinGroup`] is a range of GPIOs, with a precomputed mask, so that a
//! whole group can be read, driven or switched direction with a single
//! register write.  Groups are only handed out by a [`PinAllocator`], which
//! refuses to give out the same line twice - two groups sharing a line could
//! drive the ISA bus in ways the card was never designed to.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::constants::NUM_GPIOS;
use crate::error::ConfigError;

/// An inclusive range of GPIOs, and the mask covering them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinGroup {
    name: &'static str,
    first: u8,
    last: u8,
    mask: u32,
}

impl PinGroup {
    // Only the allocator creates groups, having checked the range.
    const fn new(name: &'static str, first: u8, last: u8) -> Self {
        let width = (last - first + 1) as u32;
        let mask = if width >= 32 {
            u32::MAX
        } else {
            ((1u32 << width) - 1) << first
        };
        Self {
            name,
            first,
            last,
            mask,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn first(&self) -> u8 {
        self.first
    }

    pub fn last(&self) -> u8 {
        self.last
    }

    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Number of lines in this group.
    pub fn width(&self) -> u8 {
        self.last - self.first + 1
    }

    /// Extract this group's value from a word containing every line.
    #[inline(always)]
    pub fn extract(&self, lines: u32) -> u32 {
        (lines & self.mask) >> self.first
    }

    /// Shift a value into this group's position.  Bits which don't fit in
    /// the group are discarded.
    #[inline(always)]
    pub fn place(&self, value: u32) -> u32 {
        (value << self.first) & self.mask
    }

    /// Returns a copy of this group without its lowest `count` lines.  Used
    /// when some lines of a range are lent to something else.
    pub fn without_low(&self, count: u8) -> Option<Self> {
        let first = self.first.checked_add(count)?;
        if first > self.last {
            return None;
        }
        Some(Self::new(self.name, first, self.last))
    }
}

/// Hands out [`PinGroup`]s, making sure no line is in more than one group.
///
/// The allocator lives for as long as the pin configuration is being built,
/// and is then dropped - there is no global record of which pins are used.
#[derive(Debug, Default)]
pub struct PinAllocator {
    claimed: u32,
}

impl PinAllocator {
    pub fn new() -> Self {
        Self { claimed: 0 }
    }

    /// Claim the inclusive range `first..=last`.
    pub fn claim(
        &mut self,
        name: &'static str,
        first: u8,
        last: u8,
    ) -> Result<PinGroup, ConfigError> {
        if first > last || last >= NUM_GPIOS {
            return Err(ConfigError::InvalidRange { first, last });
        }

        let group = PinGroup::new(name, first, last);
        let overlap = self.claimed & group.mask;
        if overlap != 0 {
            return Err(ConfigError::PinOverlap {
                first,
                last,
                overlap,
            });
        }

        self.claimed |= group.mask;
        Ok(group)
    }

    /// Claim a single pin.
    pub fn claim_pin(&mut self, name: &'static str, pin: u8) -> Result<PinGroup, ConfigError> {
        self.claim(name, pin, pin)
    }

    /// Mask of every line claimed so far.
    pub fn claimed(&self) -> u32 {
        self.claimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_mask_is_contiguous() {
        let mut alloc = PinAllocator::new();
        let data = alloc.claim("data", 15, 22).unwrap();
        assert_eq!(data.mask(), 0x007F_8000);
        assert_eq!(data.width(), 8);

        let irq = alloc.claim_pin("irq", 12).unwrap();
        assert_eq!(irq.mask(), 1 << 12);
        assert_eq!(irq.first(), irq.last());
    }

    #[test]
    fn extract_and_place_use_group_position() {
        let mut alloc = PinAllocator::new();
        let data = alloc.claim("data", 15, 22).unwrap();
        assert_eq!(data.place(0xA5), 0xA5 << 15);
        assert_eq!(data.extract(0xA5 << 15 | 0x7FFF), 0xA5);
        // Too-wide values are truncated to the group.
        assert_eq!(data.place(0x1A5), 0xA5 << 15);
    }

    #[test]
    fn overlapping_claim_is_rejected() {
        let mut alloc = PinAllocator::new();
        alloc.claim("addr", 0, 11).unwrap();
        let err = alloc.claim("irq", 11, 12).unwrap_err();
        assert_eq!(
            err,
            ConfigError::PinOverlap {
                first: 11,
                last: 12,
                overlap: 1 << 11,
            }
        );

        // The failed claim didn't register anything.
        assert!(alloc.claim_pin("irq", 12).is_ok());
    }

    #[test]
    fn default_layout_is_pairwise_disjoint() {
        use crate::constants::*;

        let mut alloc = PinAllocator::new();
        let groups = [
            alloc.claim("addr", ADDR_PINS.0, ADDR_PINS.1).unwrap(),
            alloc.claim("data", DATA_PINS.0, DATA_PINS.1).unwrap(),
            alloc.claim_pin("irq", IRQ_PIN).unwrap(),
            alloc.claim_pin("memr", MEMR_PIN).unwrap(),
            alloc.claim_pin("memw", MEMW_PIN).unwrap(),
            alloc.claim_pin("ior", IOR_PIN).unwrap(),
            alloc.claim_pin("iow", IOW_PIN).unwrap(),
            alloc.claim_pin("iordy", IORDY_PIN).unwrap(),
        ];
        for (ii, a) in groups.iter().enumerate() {
            for b in &groups[ii + 1..] {
                assert_eq!(a.mask() & b.mask(), 0, "{} and {}", a.name(), b.name());
            }
        }
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        let mut alloc = PinAllocator::new();
        assert_eq!(
            alloc.claim("bad", 5, 4),
            Err(ConfigError::InvalidRange { first: 5, last: 4 })
        );
        assert_eq!(
            alloc.claim_pin("bad", NUM_GPIOS),
            Err(ConfigError::InvalidRange {
                first: NUM_GPIOS,
                last: NUM_GPIOS
            })
        );
        assert_eq!(alloc.claimed(), 0);
    }

    #[test]
    fn without_low_drops_lines() {
        let mut alloc = PinAllocator::new();
        let addr = alloc.claim("addr", 0, 11).unwrap();
        let upper = addr.without_low(2).unwrap();
        assert_eq!(upper.first(), 2);
        assert_eq!(upper.mask(), 0xFFC);
        assert!(addr.without_low(12).is_none());
    }
}
