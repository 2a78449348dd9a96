//! Connects USB mouse events to the ISA bus.
//!
//! [`MouseBridge::handle_event`] is called by the poll loop for every event
//! raised by the USB host stack.  For a mouse report it updates the mouse
//! state and then sends the whole packet to the host, before returning - so
//! a packet is always built from a complete report, and there is never more
//! than one packet in flight.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::infra::display::StatusLed;
use crate::infra::gpio::GpioPort;
use crate::mouse::{MouseState, RawMouseReport};
use crate::protocol::PacketSender;
use crate::usb::{HidInterface, HostEvent, ReportRequestGuard, UsbHost};

/// What was done with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventOutcome {
    /// A mouse was mounted or unmounted.
    MouseMounted,
    MouseUnmounted,

    /// A mouse report was sent to the host in full.
    PacketSent,

    /// A mouse report was received, but the host didn't read all of it.
    PacketDropped,

    /// The event wasn't for a mouse, or the report couldn't be parsed.
    Ignored,
}

/// Owns the mouse state and the bus, and handles USB host events.
pub struct MouseBridge<G, D, P> {
    sender: PacketSender<G, D>,
    mouse: MouseState,
    led: StatusLed<P>,
}

impl<G: GpioPort, D: DelayNs, P: OutputPin> MouseBridge<G, D, P> {
    pub fn new(sender: PacketSender<G, D>, led: StatusLed<P>) -> Self {
        Self {
            sender,
            mouse: MouseState::new(),
            led,
        }
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn sender(&self) -> &PacketSender<G, D> {
        &self.sender
    }

    pub fn led(&self) -> &StatusLed<P> {
        &self.led
    }

    /// Handle one event from the USB host stack.  Whatever happens, the next
    /// report is requested from the event's interface exactly once before
    /// this returns.
    ///
    /// Whether the interface is a mouse is taken from the event, not asked
    /// of the host, as an unmounted interface no longer has a protocol.
    pub fn handle_event<H: UsbHost>(&mut self, host: &mut H, event: HostEvent) -> EventOutcome {
        let _guard = match event {
            HostEvent::Unmounted(itf) => ReportRequestGuard::closing(host, itf),
            _ => ReportRequestGuard::new(host, event.interface()),
        };
        match event {
            HostEvent::Mounted(itf) => Self::mounted(itf),
            HostEvent::Unmounted(itf) => Self::unmounted(itf),
            HostEvent::Report(itf, report) => self.report(itf, &report),
        }
    }

    fn mounted(itf: HidInterface) -> EventOutcome {
        if !itf.is_mouse() {
            debug!("Ignoring mount of non-mouse HID {}:{}", itf.dev_addr, itf.instance);
            return EventOutcome::Ignored;
        }
        info!("Mouse mount {}:{}", itf.dev_addr, itf.instance);
        EventOutcome::MouseMounted
    }

    fn unmounted(itf: HidInterface) -> EventOutcome {
        if !itf.is_mouse() {
            return EventOutcome::Ignored;
        }
        info!("Mouse unmount {}:{}", itf.dev_addr, itf.instance);
        EventOutcome::MouseUnmounted
    }

    fn report(&mut self, itf: HidInterface, report: &[u8]) -> EventOutcome {
        if !itf.is_mouse() {
            return EventOutcome::Ignored;
        }

        let Some(raw) = RawMouseReport::from_boot_report(report) else {
            warn!("Short mouse report: {} bytes", report.len());
            return EventOutcome::Ignored;
        };

        // Populate the mouse state with the new report.
        self.mouse.import(&raw);
        trace!("Mouse data: {}", self.mouse);

        // Blink LED to show activity.
        self.led.toggle();

        match self.sender.send_packet(&self.mouse) {
            Ok(()) => EventOutcome::PacketSent,
            Err(_) => EventOutcome::PacketDropped,
        }
    }
}
