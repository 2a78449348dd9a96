//! Simulated hardware for the integration tests: a scripted GPIO bank, a
//! delay which doesn't, a scripted USB host, and a mock watchdog and clock.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embassy_time::{Duration, Instant};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use pico_isa_mouse::bridge::MouseBridge;
use pico_isa_mouse::bus::pins::PinGroup;
use pico_isa_mouse::bus::{BusPinConfig, BusTiming, IsaBus};
use pico_isa_mouse::config::BridgeConfig;
use pico_isa_mouse::constants::{DATA_PINS, IORDY_PIN, IOR_PIN, IRQ_PIN};
use pico_isa_mouse::infra::display::StatusLed;
use pico_isa_mouse::infra::gpio::GpioPort;
use pico_isa_mouse::protocol::PacketSender;
use pico_isa_mouse::types::Direction;
use pico_isa_mouse::usb::{HidInterface, HidProtocol, HostEvent, Report, UsbHost};
use task_watchdog::{Clock, HardwareWatchdog, ResetReason};

pub const PORT: u16 = 0x2E8;
pub const IOR: u32 = 1 << IOR_PIN;
pub const IRQ: u32 = 1 << IRQ_PIN;
pub const IORDY: u32 = 1 << IORDY_PIN;
pub const DATA_MASK: u32 = 0xFF << DATA_PINS.0;

/// Bank value with `addr` on the address lines and IOR at `ior_high`.
pub fn lines(addr: u16, ior_high: bool) -> u32 {
    u32::from(addr) | if ior_high { IOR } else { 0 }
}

/// Bus samples for one read of `addr` by the host: idle, IOR low, IOR high.
pub fn read_of(addr: u16) -> [u32; 3] {
    [lines(addr, true), lines(addr, false), lines(addr, true)]
}

/// Something the code under test did to the GPIO bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Init(&'static str, Direction),
    Set(u32),
    Clear(u32),
    Put(u32, u32),
    Dir(u32, Direction),
}

#[derive(Debug, Default)]
pub struct SimState {
    script: VecDeque<u32>,
    last: u32,
    pub reads: usize,
    pub out: u32,
    pub oe: u32,
    /// Every line some group has been set up on.
    pub configured: u32,
    pub ops: Vec<Op>,
}

impl SimState {
    /// Whether anything has driven or set up any of the lines in `mask`.
    pub fn touched(&self, mask: u32) -> bool {
        self.configured & mask != 0
            || self.ops.iter().any(|op| match op {
                Op::Init(..) => false,
                Op::Set(m) | Op::Clear(m) | Op::Dir(m, _) => m & mask != 0,
                Op::Put(m, _) => m & mask != 0,
            })
    }

    /// The byte last driven onto the data lines.
    pub fn data_out(&self) -> u8 {
        ((self.out & DATA_MASK) >> DATA_PINS.0) as u8
    }

    /// Every byte driven onto the data lines, in order.
    pub fn bytes_written(&self) -> Vec<u8> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                Op::Put(mask, value) if *mask == DATA_MASK => {
                    Some(((value & DATA_MASK) >> DATA_PINS.0) as u8)
                }
                _ => None,
            })
            .collect()
    }

    pub fn driving(&self, mask: u32) -> bool {
        self.oe & mask == mask
    }

    pub fn high(&self, mask: u32) -> bool {
        self.out & mask == mask
    }
}

/// A GPIO bank whose inputs follow a script.  Each read takes the next
/// value; once the script runs out the last value repeats.  Clones share
/// state, so a test can keep one to inspect.
#[derive(Debug, Clone, Default)]
pub struct SimGpio(Rc<RefCell<SimState>>);

impl SimGpio {
    pub fn new(script: impl IntoIterator<Item = u32>) -> Self {
        let sim = Self::default();
        sim.push_script(script);
        sim
    }

    pub fn push_script(&self, script: impl IntoIterator<Item = u32>) {
        self.0.borrow_mut().script.extend(script);
    }

    pub fn state(&self) -> std::cell::Ref<'_, SimState> {
        self.0.borrow()
    }

    pub fn clear_ops(&self) {
        self.0.borrow_mut().ops.clear();
    }
}

impl GpioPort for SimGpio {
    fn init_group(&mut self, group: &PinGroup, direction: Direction) {
        let mut state = self.0.borrow_mut();
        state.ops.push(Op::Init(group.name(), direction));
        state.configured |= group.mask();
        match direction {
            Direction::Out => state.oe |= group.mask(),
            Direction::In => state.oe &= !group.mask(),
        }
    }

    fn read_all(&mut self) -> u32 {
        let mut state = self.0.borrow_mut();
        state.reads += 1;
        if let Some(value) = state.script.pop_front() {
            state.last = value;
        }
        state.last
    }

    fn set_mask(&mut self, mask: u32) {
        let mut state = self.0.borrow_mut();
        state.out |= mask;
        state.ops.push(Op::Set(mask));
    }

    fn clear_mask(&mut self, mask: u32) {
        let mut state = self.0.borrow_mut();
        state.out &= !mask;
        state.ops.push(Op::Clear(mask));
    }

    fn put_masked(&mut self, mask: u32, value: u32) {
        let mut state = self.0.borrow_mut();
        state.out = (state.out & !mask) | (value & mask);
        state.ops.push(Op::Put(mask, value));
    }

    fn set_direction_masked(&mut self, mask: u32, direction: Direction) {
        let mut state = self.0.borrow_mut();
        match direction {
            Direction::Out => state.oe |= mask,
            Direction::In => state.oe &= !mask,
        }
        state.ops.push(Op::Dir(mask, direction));
    }
}

/// A delay which records what it was asked for, and returns immediately.
#[derive(Debug, Default)]
pub struct NoDelay {
    pub calls: Vec<u32>,
}

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.calls.push(ns);
    }
}

#[derive(Debug, Default)]
pub struct Led {
    pub high: bool,
}

impl ErrorType for Led {
    type Error = Infallible;
}

impl OutputPin for Led {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        Ok(())
    }
}

/// Default timings, but with small budgets so failing loops end quickly.
pub fn test_timing() -> BusTiming {
    BusTiming {
        read_cycle_budget: 32,
        ready_release_budget: 8,
        ..BusTiming::default()
    }
}

pub fn test_pins() -> BusPinConfig {
    BridgeConfig::default().validate().unwrap()
}

pub fn bus(sim: &SimGpio) -> IsaBus<SimGpio, NoDelay> {
    IsaBus::new(sim.clone(), NoDelay::default(), test_pins(), test_timing())
}

pub fn sender(sim: &SimGpio) -> PacketSender<SimGpio, NoDelay> {
    PacketSender::new(bus(sim), PORT)
}

pub fn bridge(sim: &SimGpio) -> MouseBridge<SimGpio, NoDelay, Led> {
    MouseBridge::new(sender(sim), StatusLed::new(Led::default()))
}

pub fn mouse_itf() -> HidInterface {
    HidInterface {
        dev_addr: 1,
        instance: 0,
        protocol: HidProtocol::Mouse,
    }
}

pub fn keyboard_itf() -> HidInterface {
    HidInterface {
        dev_addr: 2,
        instance: 0,
        protocol: HidProtocol::Keyboard,
    }
}

pub fn report(bytes: &[u8]) -> Report {
    Report::from_slice(bytes).unwrap()
}

/// A USB host which raises scripted events.  Each call to `task` releases
/// the next batch, and can advance a shared clock to simulate the stack
/// taking time.
pub struct ScriptedHost {
    batches: VecDeque<Vec<HostEvent>>,
    pending: VecDeque<HostEvent>,
    pub tasks: usize,
    pub requests: Vec<HidInterface>,
    pub refuse_requests: bool,
    /// Interfaces the stack has closed, which refuse report requests.
    pub closed: Vec<HidInterface>,
    pub task_time: Duration,
    clock: Option<MockClock>,
}

impl ScriptedHost {
    pub fn new(batches: impl IntoIterator<Item = Vec<HostEvent>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
            pending: VecDeque::new(),
            tasks: 0,
            requests: Vec::new(),
            refuse_requests: false,
            closed: Vec::new(),
            task_time: Duration::from_ticks(0),
            clock: None,
        }
    }

    /// Each call to `task` advances `clock` by `task_time`.
    pub fn with_clock(mut self, clock: MockClock, task_time: Duration) -> Self {
        self.clock = Some(clock);
        self.task_time = task_time;
        self
    }
}

impl UsbHost for ScriptedHost {
    fn task(&mut self) {
        self.tasks += 1;
        if let Some(batch) = self.batches.pop_front() {
            self.pending.extend(batch);
        }
        if let Some(clock) = &self.clock {
            clock.advance(self.task_time);
        }
    }

    fn next_event(&mut self) -> Option<HostEvent> {
        self.pending.pop_front()
    }

    fn receive_report(&mut self, interface: HidInterface) -> bool {
        self.requests.push(interface);
        !self.refuse_requests && !self.closed.contains(&interface)
    }
}

#[derive(Debug, Default)]
pub struct WatchdogLog {
    pub started: Option<Duration>,
    pub feeds: usize,
    pub resets: usize,
    pub reason: Option<ResetReason>,
}

/// A hardware watchdog which counts what's done to it.  A reset can't stop
/// the test, so it panics instead.
#[derive(Debug, Clone, Default)]
pub struct MockWatchdog(pub Rc<RefCell<WatchdogLog>>);

impl HardwareWatchdog<MockClock> for MockWatchdog {
    fn start(&mut self, timeout: Duration) {
        self.0.borrow_mut().started = Some(timeout);
    }

    fn feed(&mut self) {
        self.0.borrow_mut().feeds += 1;
    }

    fn trigger_reset(&mut self) -> ! {
        self.0.borrow_mut().resets += 1;
        panic!("watchdog reset");
    }

    fn reset_reason(&self) -> Option<ResetReason> {
        self.0.borrow().reason
    }
}

/// A clock which only moves when told to.  Clones share the time.
#[derive(Debug, Clone)]
pub struct MockClock(Rc<Cell<Instant>>);

impl MockClock {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(Instant::from_ticks(0))))
    }

    pub fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for MockClock {
    type Instant = Instant;
    type Duration = Duration;

    fn now(&self) -> Instant {
        self.0.get()
    }

    fn elapsed_since(&self, instant: Instant) -> Duration {
        self.now().saturating_duration_since(instant)
    }

    fn has_elapsed(&self, instant: Instant, duration: &Duration) -> bool {
        self.elapsed_since(instant) >= *duration
    }

    fn duration_from_millis(&self, millis: u64) -> Duration {
        Duration::from_millis(millis)
    }
}
