//! This module implements the serial mouse read cycle handshake.
//!
//! For each byte of a mouse packet we:
//! - raise IRQ, so the host's serial mouse driver comes and reads our port,
//! - watch for IOR going low with our port on the address lines,
//! - hold the host off with IORDY while we put the byte on the data bus,
//! - let the host complete the cycle, and get off the bus.
//!
//! Everything is a tight polling loop, with a bounded number of iterations,
//! so a host that never reads the port can't hang us.  A byte which isn't
//! read in time is dropped, along with the rest of its packet.  We don't
//! retry - the next mouse report will supersede it, and retrying part way
//! through a packet could leave the host's driver out of step.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embedded_hal::delay::DelayNs;

use crate::bus::IsaBus;
use crate::error::BusError;
use crate::infra::gpio::GpioPort;
use crate::mouse::{MouseState, PacketByte};

/// Detects high to low transitions across a series of samples of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallingEdge {
    last: bool,
}

impl FallingEdge {
    /// Start detecting, from an initial sample.
    pub fn new(initial: bool) -> Self {
        Self { last: initial }
    }

    /// Feed the next sample.  Returns true if the line has gone from high
    /// (last sample) to low (this sample).
    #[inline(always)]
    pub fn sample(&mut self, level: bool) -> bool {
        let fell = self.last && !level;
        self.last = level;
        fell
    }
}

/// Sends mouse packets to the host, one handshake per byte.
pub struct PacketSender<G, D> {
    bus: IsaBus<G, D>,
    port: u16,
}

impl<G: GpioPort, D: DelayNs> PacketSender<G, D> {
    /// Create a sender answering reads of I/O port `port`.
    pub fn new(bus: IsaBus<G, D>, port: u16) -> Self {
        Self { bus, port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bus(&self) -> &IsaBus<G, D> {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut IsaBus<G, D> {
        &mut self.bus
    }

    /// Sends one byte of the mouse packet.  Busy loops until the host reads
    /// our port, and then puts the byte on the bus.  IRQ is always dropped
    /// before returning.
    ///
    /// The byte is encoded from `mouse` at the moment the host reads it.
    pub fn send_byte(&mut self, mouse: &MouseState, byte: PacketByte) -> Result<(), BusError> {
        self.bus.assert_irq();

        self.bus.capture_snapshot();
        let mut ior = FallingEdge::new(self.bus.io_read());
        let budget = self.bus.timing().read_cycle_budget;

        for _ in 0..budget {
            self.bus.capture_snapshot();
            if !ior.sample(self.bus.io_read()) {
                continue;
            }

            // IOR has gone low.  The address comes from the same snapshot.
            // A read of another device's port is nothing to do with us.
            if self.bus.addr() != u32::from(self.port) {
                continue;
            }

            // Lower IORDY as soon as possible to buy some time, then drop IRQ.
            self.bus.deassert_ready();
            self.bus.deassert_irq();

            let value = mouse.packet_byte(byte);
            if let Err(e) = self.bus.write_cycle(value) {
                // The host has had the data - it just hasn't finished the
                // cycle.  Nothing more we can do, so carry on.
                warn!("Byte {} of packet: {}", byte, e);
            }

            // Make sure we don't hang the system by leaving IORDY low.
            self.bus.assert_ready();
            return Ok(());
        }

        // The host never read from us, so give up on this byte.
        self.bus.deassert_irq();
        let hold = self.bus.timing().abandon_hold_ns;
        self.bus.delay().delay_ns(hold);
        Err(BusError::NoReadCycle)
    }

    /// Sends all 3 bytes of the mouse packet.  If a byte isn't read by the
    /// host, the rest of the packet is dropped.
    pub fn send_packet(&mut self, mouse: &MouseState) -> Result<(), BusError> {
        for byte in PacketByte::ALL {
            if let Err(e) = self.send_byte(mouse, byte) {
                warn!(
                    "Abandoned packet at byte {} after {} samples: {}",
                    byte,
                    self.bus.timing().read_cycle_budget,
                    e
                );
                return Err(e);
            }
        }
        trace!("Sent packet {:#x}", mouse.packet());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::FallingEdge;

    fn edges(samples: &[bool]) -> Vec<usize> {
        let mut edge = FallingEdge::new(samples[0]);
        samples
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(ii, level)| edge.sample(*level).then_some(ii))
            .collect()
    }

    #[test]
    fn single_falling_edge() {
        // 1,1,0,1 - one edge, between the 2nd and 3rd samples.
        assert_eq!(edges(&[true, true, false, true]), vec![2]);
    }

    #[test]
    fn no_edge_when_starting_low() {
        assert!(edges(&[false, false, false]).is_empty());
        assert!(edges(&[false, true, true]).is_empty());
    }

    #[test]
    fn each_edge_counted_once() {
        assert_eq!(
            edges(&[true, false, false, true, false, true, true, false]),
            vec![1, 4, 7]
        );
    }
}
