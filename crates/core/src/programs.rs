//! Run the two demo programs against a [`Machine`].

use crate::interrupt::HandlerContract;
use crate::waveform::Waveform;
use crate::{Machine, SimResult};
use pinwire_hal::blink::BlinkLoop;
use pinwire_hal::toggle::InterruptToggle;
use pinwire_hal::{RegisterFile, SleepMode};
use serde::Serialize;

/// Main-loop passes allowed before a toggle run is cut short.
pub const DEFAULT_MAX_PASSES: usize = 10_000;

/// Configure the LED and run `cycles` full high/low periods.
pub fn simulate_blink(
    machine: &mut Machine,
    blink: &BlinkLoop,
    cycles: u32,
) -> SimResult<Waveform> {
    tracing::info!(
        "Blink on {}: {} ms high, {} ms low, {} cycles",
        blink.led,
        blink.high_ms,
        blink.low_ms,
        cycles
    );
    blink.configure(machine);
    machine.check()?;
    for _ in 0..cycles {
        blink.cycle(machine);
        machine.check()?;
    }
    Ok(machine.waveform(blink.led))
}

/// The handler may only write the LED's `PINx` register, once.
pub fn toggle_contract(toggle: &InterruptToggle) -> HandlerContract {
    HandlerContract::new(vec![toggle.led.port.pin()]).with_max_accesses(1)
}

pub fn install_toggle(machine: &mut Machine, toggle: &InterruptToggle) {
    let program = *toggle;
    machine.attach_handler(
        toggle.line,
        toggle_contract(toggle),
        Box::new(move |regs: &mut dyn RegisterFile| program.on_interrupt(regs)),
    );
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
    pub toggles: usize,
    pub led_high: bool,
    pub sleeping: Option<SleepMode>,
    pub passes: usize,
}

/// Install the handler, configure, then run the main loop until the stimulus
/// queue is exhausted and the core is back asleep.
pub fn simulate_toggle(
    machine: &mut Machine,
    toggle: &InterruptToggle,
    max_passes: usize,
) -> SimResult<ToggleOutcome> {
    tracing::info!(
        "Toggle on {} from {} ({:?}), sleeping in {:?}",
        toggle.led,
        toggle.line.name(),
        toggle.sense,
        toggle.sleep_mode
    );
    install_toggle(machine, toggle);
    toggle.configure(machine);
    machine.check()?;
    let configured_at = machine.trace().len();

    let mut passes = 0;
    while passes < max_passes.max(1) {
        toggle.idle(machine);
        machine.check()?;
        passes += 1;
        if machine.is_sleeping() {
            break;
        }
    }
    if !machine.is_sleeping() {
        tracing::warn!("Main loop still awake after {} passes", passes);
    }

    let led = toggle.led;
    let toggles = machine.trace()[configured_at..]
        .iter()
        .filter(|c| c.pin == led)
        .count();

    Ok(ToggleOutcome {
        toggles,
        led_high: machine.level(led),
        sleeping: machine.sleep_state(),
        passes,
    })
}
