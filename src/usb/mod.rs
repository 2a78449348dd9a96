//! The interface to the USB host stack.
//!
//! The USB host stack is not part of this crate - we only rely on it to
//! enumerate the mouse and hand us its reports.  The stack is driven by
//! calling [`UsbHost::task`] from the poll loop; anything that happened
//! during that call is then collected as [`HostEvent`]s with
//! [`UsbHost::next_event`] and dispatched, in order, before the poll loop
//! moves on.
//!
//! The stack only delivers the next report from a HID interface once it has
//! been asked to.  Whatever happens handling an event, the next report must
//! be requested exactly once, or the mouse goes quiet.  The
//! [`ReportRequestGuard`] makes that happen.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#[cfg(feature = "embedded")]
pub mod tinyusb;

use core::ops::{Deref, DerefMut};
use heapless::Vec;

use crate::constants::MAX_REPORT_LEN;

/// A HID interface on a device attached to the USB host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidInterface {
    /// USB device address.
    pub dev_addr: u8,

    /// HID instance (interface) number on that device.
    pub instance: u8,

    /// The interface's boot protocol, read when the event was raised.  The
    /// stack forgets it as soon as the interface is closed, so by the time
    /// an unmount is handled it can no longer be asked.
    pub protocol: HidProtocol,
}

impl HidInterface {
    pub fn is_mouse(&self) -> bool {
        self.protocol == HidProtocol::Mouse
    }
}

/// The boot interface protocol of a HID interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidProtocol {
    None,
    Keyboard,
    Mouse,
}

impl From<u8> for HidProtocol {
    fn from(value: u8) -> Self {
        match value {
            1 => HidProtocol::Keyboard,
            2 => HidProtocol::Mouse,
            _ => HidProtocol::None,
        }
    }
}

/// A raw HID report.
pub type Report = Vec<u8, MAX_REPORT_LEN>;

/// Copy a report from the stack.  Anything beyond the boot protocol fields
/// is of no interest, so a report too long for a [`Report`] is truncated.
pub fn truncated_report(data: &[u8]) -> Report {
    let take = data.len().min(MAX_REPORT_LEN);
    // Can't fail, as take is within capacity.
    Report::from_slice(&data[..take]).unwrap_or_default()
}

/// Something that happened in the USB host stack.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HostEvent {
    /// A HID interface has been enumerated.
    Mounted(HidInterface),

    /// A HID interface has gone away.
    Unmounted(HidInterface),

    /// A HID interface has sent a report.
    Report(HidInterface, Report),
}

impl HostEvent {
    pub fn interface(&self) -> HidInterface {
        match self {
            HostEvent::Mounted(itf) | HostEvent::Unmounted(itf) | HostEvent::Report(itf, _) => {
                *itf
            }
        }
    }
}

/// The USB host stack, as used by this crate.
pub trait UsbHost {
    /// Service the stack.  May raise any number of events.
    fn task(&mut self);

    /// Take the next event raised by the stack, oldest first.
    fn next_event(&mut self) -> Option<HostEvent>;

    /// Ask the stack for the next report from a HID interface.  Returns
    /// false if the stack refused.
    fn receive_report(&mut self, interface: HidInterface) -> bool;
}

/// Requests the next report from a HID interface when dropped.
///
/// Create one at the start of handling an event, and every way out of the
/// handler - including early returns - requests the next report exactly
/// once.  The guard derefs to the host, so the handler can keep using it.
pub struct ReportRequestGuard<'a, H: UsbHost> {
    host: &'a mut H,
    interface: HidInterface,
    closing: bool,
}

impl<'a, H: UsbHost> ReportRequestGuard<'a, H> {
    pub fn new(host: &'a mut H, interface: HidInterface) -> Self {
        Self {
            host,
            interface,
            closing: false,
        }
    }

    /// As [`ReportRequestGuard::new`], for an interface which has gone away.
    /// The request is still made, but the stack is expected to refuse it.
    pub fn closing(host: &'a mut H, interface: HidInterface) -> Self {
        Self {
            host,
            interface,
            closing: true,
        }
    }

    pub fn interface(&self) -> HidInterface {
        self.interface
    }
}

impl<H: UsbHost> Deref for ReportRequestGuard<'_, H> {
    type Target = H;

    fn deref(&self) -> &H {
        self.host
    }
}

impl<H: UsbHost> DerefMut for ReportRequestGuard<'_, H> {
    fn deref_mut(&mut self) -> &mut H {
        self.host
    }
}

impl<H: UsbHost> Drop for ReportRequestGuard<'_, H> {
    fn drop(&mut self) {
        let requested = self.host.receive_report(self.interface);
        if !requested && self.closing {
            debug!(
                "No more reports from closed {}:{}",
                self.interface.dev_addr, self.interface.instance
            );
        } else if !requested {
            error!(
                "Error requesting report from {}:{}",
                self.interface.dev_addr, self.interface.instance
            );
        }
    }
}
