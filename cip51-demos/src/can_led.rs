//! Two CAN nodes toggling each other's LED
//!
//! Node A's switch is pressed and released on alternate cycles; each
//! change goes out as one frame and lights or clears node B's LED.

use cip51_core::config::CanNodeConfig;
use cip51_core::dispatch::{CanLedNode, CanShared};
use cip51_core::report::StatusLine;
use cip51_core::sync::WaitTimeout;
use cip51_hal_sim::{CanBus, SimCan, SimPin, SimUart};

use crate::{emit, Demo, DemoConfig, DemoError, DemoReport};

/// One board: controller, pins and the node logic
struct Board<'a> {
    can: SimCan,
    led: SimPin,
    switch: SimPin,
    node: CanLedNode<'a, SimPin, SimPin>,
    interrupts: u64,
}

impl<'a> Board<'a> {
    fn new(config: CanNodeConfig, shared: &'a CanShared) -> Result<Self, DemoError> {
        let led = SimPin::new(false);
        let switch = SimPin::new(true);
        let mut can = SimCan::new();
        let mut node = CanLedNode::new(config, led.clone(), switch.clone(), shared);
        node.init(&mut can)?;
        Ok(Self {
            can,
            led,
            switch,
            node,
            interrupts: 0,
        })
    }

    /// Run the interrupt handler until nothing is pending
    fn service(&mut self, budget: u32) -> Result<(), DemoError> {
        for _ in 0..budget {
            if !self.can.interrupt_pending() {
                return Ok(());
            }
            let outcome = self.node.on_interrupt(&mut self.can)?;
            self.interrupts += 1;
            log::trace!("can isr: {:?}", outcome);
        }
        if self.can.interrupt_pending() {
            Err(WaitTimeout { polls: budget }.into())
        } else {
            Ok(())
        }
    }
}

pub fn run(config: &DemoConfig, cycles: u32) -> Result<DemoReport, DemoError> {
    config.can.validate()?;
    let mut uart = SimUart::new();
    let mut bus = CanBus::new();

    let shared_a = CanShared::new();
    let shared_b = CanShared::new();
    let mut a = Board::new(config.can, &shared_a)?;
    let mut b = Board::new(config.can.peer(), &shared_b)?;
    let budget = config.poll_budget;

    for cycle in 0..cycles {
        let pressed = cycle % 2 == 0;
        a.switch.drive(!pressed);

        // Foreground of both boards: report switch changes
        for board in [&mut a, &mut b] {
            board.node.poll_switch(&mut board.can)?;
        }
        bus.exchange(&mut a.can, &mut b.can);
        a.service(budget)?;
        b.service(budget)?;

        let on = shared_b.led.poll_take(budget, || {})?;
        if on != pressed || b.led.level() != on {
            return Err(DemoError::Unexpected("remote LED does not match the switch"));
        }
        emit(
            &mut uart,
            StatusLine::format(format_args!(
                "CAN switch A: {} -> LED B: {}",
                if pressed { "pressed" } else { "released" },
                if on { "on" } else { "off" }
            )),
        )?;
    }

    if a.led.level() {
        return Err(DemoError::Unexpected("LED A lit without a frame from B"));
    }

    let interrupts = a.interrupts + b.interrupts;
    let errors = shared_a.error_count() + shared_b.error_count();
    emit(
        &mut uart,
        StatusLine::format(format_args!("CAN frames delivered: {}", bus.delivered())),
    )?;
    Ok(DemoReport::new(Demo::CanLed, &uart, interrupts, errors))
}
