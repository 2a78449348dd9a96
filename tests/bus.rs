// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

mod common;

use common::*;
use pico_isa_mouse::bus::{BusPinLayout, IsaBus};
use pico_isa_mouse::error::BusError;
use pico_isa_mouse::types::Direction;

#[test]
fn all_lines_start_as_inputs() {
    let sim = SimGpio::default();
    let _bus = bus(&sim);

    let state = sim.state();
    let inits: Vec<_> = state
        .ops
        .iter()
        .filter_map(|op| match op {
            Op::Init(name, dir) => Some((*name, *dir)),
            _ => None,
        })
        .collect();
    assert_eq!(inits.len(), 8);
    assert!(inits.iter().all(|(_, dir)| *dir == Direction::In));
    assert_eq!(inits[0].0, "Addr");
    assert_eq!(state.oe, 0);
}

#[test]
fn snapshot_fields_come_from_one_read() {
    let sim = SimGpio::new([lines(0x2E8, false) | IRQ, lines(0x123, true)]);
    let mut bus = bus(&sim);

    bus.capture_snapshot();
    assert_eq!(bus.addr(), 0x2E8);
    assert!(!bus.io_read());
    assert!(bus.irq());

    // Getters don't read the bus.
    assert_eq!(bus.addr(), 0x2E8);
    assert_eq!(sim.state().reads, 1);

    bus.capture_snapshot();
    assert_eq!(bus.addr(), 0x123);
    assert!(bus.io_read());
    assert!(!bus.irq());
}

#[test]
fn debug_lines_masked_from_snapshot() {
    let layout = BusPinLayout {
        debug_uart_on_addr: true,
        ..BusPinLayout::default()
    };
    let pins = layout.build().unwrap();
    let sim = SimGpio::new([lines(0x2EB, true)]);
    let mut bus = IsaBus::new(sim.clone(), NoDelay::default(), pins, test_timing());

    bus.capture_snapshot();
    assert_eq!(bus.addr(), 0x2E8);
    assert_eq!(bus.snapshot().raw() & 0b11, 0);
}

#[test]
fn debug_lines_left_to_external_uart() {
    let layout = BusPinLayout {
        debug_uart_on_addr: true,
        ..BusPinLayout::default()
    };
    let pins = layout.build().unwrap();
    let sim = SimGpio::new([lines(PORT, true), lines(PORT, false), lines(PORT, true)]);
    let mut bus = IsaBus::new(sim.clone(), NoDelay::default(), pins, test_timing());

    // A whole handshake, and lines 0 and 1 are never set up or driven.
    bus.capture_snapshot();
    bus.assert_irq();
    bus.deassert_ready();
    let _ = bus.write_cycle(0x40);
    bus.assert_ready();
    bus.deassert_irq();
    assert!(!sim.state().touched(0b11));
    assert!(sim.state().touched(0xFFC));

    // Without the side channel they are ordinary address inputs.
    let plain = SimGpio::default();
    let _bus = IsaBus::new(
        plain.clone(),
        NoDelay::default(),
        BusPinLayout::default().build().unwrap(),
        test_timing(),
    );
    assert!(plain.state().touched(0b11));
}

#[test]
fn write_cycle_drives_then_releases_data() {
    let sim = SimGpio::new([lines(PORT, false), lines(PORT, true)]);
    let mut bus = bus(&sim);
    sim.clear_ops();

    assert_eq!(bus.write_cycle(0xA5), Ok(()));

    let state = sim.state();
    assert_eq!(
        state.ops,
        vec![
            Op::Dir(DATA_MASK, Direction::Out),
            Op::Put(DATA_MASK, 0xA5 << 15),
            Op::Set(IORDY),
            Op::Dir(IORDY, Direction::Out),
            Op::Dir(DATA_MASK, Direction::In),
        ]
    );
    assert_eq!(state.data_out(), 0xA5);
    assert!(!state.driving(DATA_MASK));
    assert_eq!(state.reads, 2);
    drop(state);

    // The settle delay comes between driving the data and releasing IORDY.
    assert_eq!(bus.delay().calls, vec![4 * 85]);
}

#[test]
fn write_cycle_gives_up_on_stuck_strobe() {
    let sim = SimGpio::new([lines(PORT, false)]);
    let mut bus = bus(&sim);

    assert_eq!(bus.write_cycle(0x40), Err(BusError::ReadStrobeStuck));

    let state = sim.state();
    assert_eq!(state.reads, test_timing().ready_release_budget as usize);
    assert!(!state.driving(DATA_MASK));
    assert!(state.driving(IORDY) && state.high(IORDY));
}

#[test]
fn ready_and_irq_ordering() {
    let sim = SimGpio::default();
    let mut bus = bus(&sim);
    sim.clear_ops();

    bus.deassert_ready();
    bus.assert_irq();
    bus.deassert_irq();
    bus.assert_ready();

    assert_eq!(
        sim.state().ops,
        vec![
            Op::Dir(IORDY, Direction::Out),
            Op::Clear(IORDY),
            Op::Dir(IRQ, Direction::Out),
            Op::Set(IRQ),
            Op::Clear(IRQ),
            Op::Dir(IRQ, Direction::In),
            Op::Set(IORDY),
            Op::Dir(IORDY, Direction::Out),
        ]
    );
}
