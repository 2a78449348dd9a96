//! Binding to the TinyUSB host stack.
//!
//! TinyUSB is linked in as a static library (see `build.rs`), built for the
//! RP2040/RP235x with host mode and the HID class driver enabled.  It calls
//! back into us when a HID interface is mounted or unmounted, and when a
//! report arrives.  All of those callbacks happen inside `tuh_task_ext()`,
//! so within [`UsbHost::task`].  They queue a [`HostEvent`], which the poll
//! loop then takes with [`UsbHost::next_event`].
//!
//! If the queue is full when a report arrives the report is dropped, but the
//! next one is still requested, or the mouse would never be heard from
//! again.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use core::cell::RefCell;
use core::slice;

use embassy_rp::interrupt;
use embassy_rp::interrupt::InterruptExt;
use embassy_rp::peripherals::USB;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use heapless::Deque;

use super::{HidInterface, HidProtocol, HostEvent, UsbHost, truncated_report};
use crate::constants::HOST_EVENT_QUEUE_LEN;

// The root hub port TinyUSB runs the host on.
const RHPORT: u8 = 0;

unsafe extern "C" {
    fn tuh_init(rhport: u8) -> bool;
    fn tuh_task_ext(timeout_ms: u32, in_isr: bool);
    fn tuh_int_handler(rhport: u8, in_isr: bool);
    fn tuh_hid_interface_protocol(dev_addr: u8, idx: u8) -> u8;
    fn tuh_hid_receive_report(dev_addr: u8, idx: u8) -> bool;
}

type EventQueue = Deque<HostEvent, HOST_EVENT_QUEUE_LEN>;

// Events raised by TinyUSB's callbacks, waiting for the poll loop.
static EVENTS: Mutex<CriticalSectionRawMutex, RefCell<EventQueue>> =
    Mutex::new(RefCell::new(Deque::new()));

// Returns the event back if the queue is full.
fn push_event(event: HostEvent) -> Result<(), HostEvent> {
    EVENTS.lock(|events| events.borrow_mut().push_back(event))
}

/// The TinyUSB host stack.  Only one can exist, as it takes the USB
/// peripheral.
pub struct TinyUsbHost {
    _usb: USB,
}

impl TinyUsbHost {
    /// Start the USB host stack.  Returns None if TinyUSB failed to
    /// initialise.
    pub fn new(usb: USB) -> Option<Self> {
        // SAFETY: TinyUSB owns the USB controller from here, and we hold the
        // peripheral so nothing else can.
        if !unsafe { tuh_init(RHPORT) } {
            error!("TinyUSB host init failed");
            return None;
        }

        // TinyUSB's interrupt handler is called from ours.
        interrupt::USBCTRL_IRQ.unpend();
        // SAFETY: The handler only calls into TinyUSB, which is initialised.
        unsafe { interrupt::USBCTRL_IRQ.enable() };

        info!("USB host started on port {}", RHPORT);
        Some(Self { _usb: usb })
    }
}

impl UsbHost for TinyUsbHost {
    fn task(&mut self) {
        // With no RTOS TinyUSB doesn't block waiting for events, whatever
        // the timeout.
        // SAFETY: Only ever called from the poll loop.
        unsafe { tuh_task_ext(u32::MAX, false) };
    }

    fn next_event(&mut self) -> Option<HostEvent> {
        EVENTS.lock(|events| events.borrow_mut().pop_front())
    }

    fn receive_report(&mut self, interface: HidInterface) -> bool {
        // SAFETY: TinyUSB checks the address and instance itself.
        unsafe { tuh_hid_receive_report(interface.dev_addr, interface.instance) }
    }
}

#[interrupt]
unsafe fn USBCTRL_IRQ() {
    unsafe { tuh_int_handler(RHPORT, true) };
}

//
// TinyUSB callbacks
//

// Must be called from a callback.  Once an interface is closed TinyUSB
// forgets its protocol, so it has to be read while the callback still has
// the interface.
fn hid_interface(dev_addr: u8, idx: u8) -> HidInterface {
    // SAFETY: TinyUSB checks the address and instance itself.
    let protocol = unsafe { tuh_hid_interface_protocol(dev_addr, idx) };
    HidInterface {
        dev_addr,
        instance: idx,
        protocol: HidProtocol::from(protocol),
    }
}

#[unsafe(no_mangle)]
extern "C" fn tuh_hid_mount_cb(dev_addr: u8, idx: u8, _desc_report: *const u8, _desc_len: u16) {
    let itf = hid_interface(dev_addr, idx);
    debug!("HID mounted {}:{} {}", dev_addr, idx, itf.protocol);
    if push_event(HostEvent::Mounted(itf)).is_err() {
        warn!("Event queue full - dropping mount of {}:{}", dev_addr, idx);
        // SAFETY: Called from within tuh_task_ext().
        unsafe { tuh_hid_receive_report(dev_addr, idx) };
    }
}

#[unsafe(no_mangle)]
extern "C" fn tuh_hid_umount_cb(dev_addr: u8, idx: u8) {
    // TinyUSB calls this before it clears the interface.
    let itf = hid_interface(dev_addr, idx);
    debug!("HID unmounted {}:{} {}", dev_addr, idx, itf.protocol);
    if push_event(HostEvent::Unmounted(itf)).is_err() {
        warn!("Event queue full - dropping unmount of {}:{}", dev_addr, idx);
    }
}

#[unsafe(no_mangle)]
extern "C" fn tuh_hid_report_received_cb(dev_addr: u8, idx: u8, report: *const u8, len: u16) {
    let itf = hid_interface(dev_addr, idx);

    let data: &[u8] = if report.is_null() {
        &[]
    } else {
        // SAFETY: TinyUSB passes a buffer of `len` bytes, valid for the
        // duration of the callback.
        unsafe { slice::from_raw_parts(report, usize::from(len)) }
    };

    if push_event(HostEvent::Report(itf, truncated_report(data))).is_err() {
        warn!("Event queue full - dropping report from {}:{}", dev_addr, idx);
        // SAFETY: Called from within tuh_task_ext().
        unsafe { tuh_hid_receive_report(dev_addr, idx) };
    }
}
