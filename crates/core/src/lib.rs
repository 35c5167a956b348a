pub mod bus;
pub mod clock;
pub mod interrupt;
pub mod metrics;
pub mod peripherals;
pub mod programs;
pub mod snapshot;
pub mod waveform;

use interrupt::{Access, Handler, HandlerContract, InstalledHandler, TrackedRegisters};
use pinwire_hal::{Delay, ExternalInterrupt, Pin, Processor, Register, RegisterFile, SleepMode};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use waveform::{PinChange, Waveform};

mod tests;

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Unmapped register address {0:#x}")]
    UnmappedAddress(u16),
    #[error("{line} is pending but no handler is attached")]
    MissingHandler { line: &'static str },
    #[error("{line} handler broke its contract: {reason}")]
    HandlerContract { line: &'static str, reason: String },
    #[error("{line} fired {count} times without returning to the main loop")]
    InterruptStorm { line: &'static str, count: usize },
}

pub type SimResult<T> = Result<T, SimulationError>;

/// Trait for observing simulation events in a modular way.
pub trait SimulationObserver: std::fmt::Debug + Send + Sync {
    fn on_register_write(&self, _reg: Register, _value: u8) {}
    fn on_pin_change(&self, _change: &PinChange) {}
    fn on_sleep(&self, _mode: SleepMode) {}
    fn on_wake(&self, _mode: SleepMode) {}
    fn on_interrupt(&self, _line: ExternalInterrupt, _accesses: usize) {}
}

/// Trait representing a memory-mapped peripheral
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&self, offset: u16) -> SimResult<u8>;
    fn write(&mut self, offset: u16, value: u8) -> SimResult<()>;
}

/// An external level applied to a pin at a point in virtual time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stimulus {
    pub at_ms: u64,
    pub pin: Pin,
    pub high: bool,
}

/// Dispatches allowed per service pass before we call it a storm.
pub const DEFAULT_MAX_DISPATCH: usize = 64;

/// Simulated ATmega328P core: register bus, virtual clock, interrupt vectors
/// and a queue of scheduled external stimuli.
///
/// Programs drive it through [`RegisterFile`], [`Delay`] and [`Processor`].
/// Those traits are infallible, so a failure raised inside them (a broken
/// handler contract, say) is parked and reported by [`Machine::check`].
pub struct Machine {
    pub bus: bus::RegisterBus,
    pub clock: clock::SimClock,
    pub observers: Vec<Arc<dyn SimulationObserver>>,
    handlers: HashMap<ExternalInterrupt, InstalledHandler>,
    stimulus: VecDeque<Stimulus>,
    trace: Vec<PinChange>,
    sleeping: Option<SleepMode>,
    fault: Option<SimulationError>,
    max_dispatch: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(pinwire_hal::DEFAULT_CLOCK_HZ)
    }
}

impl Machine {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            bus: bus::RegisterBus::new(),
            clock: clock::SimClock::new(clock_hz),
            observers: Vec::new(),
            handlers: HashMap::new(),
            stimulus: VecDeque::new(),
            trace: Vec::new(),
            sleeping: None,
            fault: None,
            max_dispatch: DEFAULT_MAX_DISPATCH,
        }
    }

    pub fn with_max_dispatch(mut self, max: usize) -> Self {
        self.max_dispatch = max.max(1);
        self
    }

    /// Power-on reset: registers, time, trace and pending stimuli are cleared.
    /// Handlers and observers stay attached.
    pub fn reset(&mut self) {
        self.bus = bus::RegisterBus::new();
        self.clock.reset();
        self.stimulus.clear();
        self.trace.clear();
        self.sleeping = None;
        self.fault = None;
    }

    pub fn attach_handler(
        &mut self,
        line: ExternalInterrupt,
        contract: HandlerContract,
        handler: Handler,
    ) {
        tracing::debug!("Attaching {} handler ({:?})", line.name(), contract);
        self.handlers
            .insert(line, InstalledHandler { contract, handler });
    }

    /// Queue an external level change. Events are kept in time order; ties
    /// keep their scheduling order.
    pub fn schedule(&mut self, stimulus: Stimulus) {
        let idx = self
            .stimulus
            .iter()
            .position(|s| s.at_ms > stimulus.at_ms)
            .unwrap_or(self.stimulus.len());
        self.stimulus.insert(idx, stimulus);
    }

    pub fn pending_stimulus(&self) -> usize {
        self.stimulus.len()
    }

    pub fn is_sleeping(&self) -> bool {
        self.sleeping.is_some()
    }

    /// The mode the core is parked in at `sleep`, independent of `SMCR.SE`.
    pub fn sleep_state(&self) -> Option<SleepMode> {
        self.sleeping
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.bus.sleep.interrupts_enabled()
    }

    pub fn level(&self, pin: Pin) -> bool {
        self.bus.level(pin)
    }

    pub fn trace(&self) -> &[PinChange] {
        &self.trace
    }

    pub fn waveform(&self, pin: Pin) -> Waveform {
        Waveform::from_trace(pin, self.clock.clock_hz(), &self.trace)
    }

    /// Surface a failure raised while a program was running.
    pub fn check(&mut self) -> SimResult<()> {
        match self.fault.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply an external level to `pin` now and service whatever it raises.
    /// Returns the number of handlers dispatched.
    pub fn drive_pin(&mut self, pin: Pin, high: bool) -> SimResult<usize> {
        let io_clock = self.sleeping.map_or(true, |mode| mode.io_clock_running());
        tracing::debug!(
            "Driving {} {} at {} ms",
            pin,
            if high { "high" } else { "low" },
            self.clock.now_ms()
        );
        self.bus.drive_external(pin, high, io_clock);
        self.flush_changes();
        self.service_interrupts()
    }

    pub fn release_pin(&mut self, pin: Pin) -> SimResult<usize> {
        let io_clock = self.sleeping.map_or(true, |mode| mode.io_clock_running());
        self.bus.release_external(pin, io_clock);
        self.flush_changes();
        self.service_interrupts()
    }

    /// Run every pending, unmasked interrupt while `SREG.I` is set, waking the
    /// core first if its sleep mode allows it.
    pub fn service_interrupts(&mut self) -> SimResult<usize> {
        let mut dispatched = 0;
        while self.bus.sleep.interrupts_enabled() {
            let Some(line) = ExternalInterrupt::ALL
                .into_iter()
                .find(|l| self.bus.exint.pending(*l, self.bus.level(l.pin())))
            else {
                break;
            };

            if let Some(mode) = self.sleeping {
                if !mode.wakes_on(self.bus.exint.sense(line)) {
                    break;
                }
                self.wake(mode);
            }

            if dispatched >= self.max_dispatch {
                return Err(SimulationError::InterruptStorm {
                    line: line.name(),
                    count: dispatched,
                });
            }
            self.dispatch(line)?;
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn wake(&mut self, mode: SleepMode) {
        self.sleeping = None;
        tracing::debug!("Woke from {:?} at {} ms", mode, self.clock.now_ms());
        for observer in &self.observers {
            observer.on_wake(mode);
        }
    }

    fn dispatch(&mut self, line: ExternalInterrupt) -> SimResult<()> {
        let Some(installed) = self.handlers.get_mut(&line) else {
            return Err(SimulationError::MissingHandler { line: line.name() });
        };

        // Vector entry: flag cleared, I cleared, no nesting.
        self.bus.exint.acknowledge(line);
        self.bus.sleep.set_interrupts(false);
        self.clock.advance_cycles(interrupt::ISR_ENTRY_CYCLES);

        let mut regs = TrackedRegisters::new(&mut self.bus, &installed.contract);
        (installed.handler)(&mut regs);
        let (accesses, violation) = regs.finish();

        self.clock
            .advance_cycles(accesses.len() as u64 * interrupt::ACCESS_CYCLES);
        self.flush_changes();
        self.clock.advance_cycles(interrupt::RETI_CYCLES);
        self.bus.sleep.set_interrupts(true);

        tracing::debug!(
            "{} handler ran with {} register accesses",
            line.name(),
            accesses.len()
        );
        for observer in &self.observers {
            for access in &accesses {
                if let Access::Write(reg, value) = *access {
                    observer.on_register_write(reg, value);
                }
            }
            observer.on_interrupt(line, accesses.len());
        }

        match violation {
            Some(reason) => Err(SimulationError::HandlerContract {
                line: line.name(),
                reason,
            }),
            None => Ok(()),
        }
    }

    /// Apply queued stimuli due at or before `deadline` (in cycles).
    fn run_stimulus_until(&mut self, deadline: u64) {
        while let Some(next) = self.stimulus.front().copied() {
            if self.clock.ms_to_cycles(next.at_ms) > deadline {
                break;
            }
            self.stimulus.pop_front();
            self.apply(next);
        }
    }

    fn apply(&mut self, stimulus: Stimulus) {
        self.clock.advance_to(self.clock.ms_to_cycles(stimulus.at_ms));
        if let Err(e) = self.drive_pin(stimulus.pin, stimulus.high) {
            tracing::warn!("Stimulus on {} failed: {}", stimulus.pin, e);
            self.fault.get_or_insert(e);
        }
    }

    fn flush_changes(&mut self) {
        for change in self.bus.take_changes() {
            let change = PinChange {
                at_cycles: self.clock.cycles(),
                pin: change.pin,
                high: change.high,
            };
            tracing::debug!(
                "{} -> {} at cycle {}",
                change.pin,
                u8::from(change.high),
                change.at_cycles
            );
            for observer in &self.observers {
                observer.on_pin_change(&change);
            }
            self.trace.push(change);
        }
    }

    fn service_or_fault(&mut self) {
        if let Err(e) = self.service_interrupts() {
            self.fault.get_or_insert(e);
        }
    }

    pub fn snapshot(&self) -> snapshot::MachineSnapshot {
        let registers = Register::ALL
            .into_iter()
            .map(|reg| (reg.name().to_string(), self.bus.read(reg)))
            .collect();
        snapshot::MachineSnapshot {
            kind: snapshot::SNAPSHOT_KIND.to_string(),
            clock: snapshot::ClockSnapshot {
                clock_hz: self.clock.clock_hz(),
                cycles: self.clock.cycles(),
                elapsed_ms: self.clock.elapsed().as_secs_f64() * 1000.0,
            },
            registers,
            sleeping: self.sleeping,
            interrupts_enabled: self.interrupts_enabled(),
            pending_stimulus: self.stimulus.len(),
        }
    }
}

impl RegisterFile for Machine {
    fn read(&self, reg: Register) -> u8 {
        self.bus.read(reg)
    }

    fn write(&mut self, reg: Register, value: u8) {
        self.bus.write(reg, value);
        self.clock.advance_cycles(interrupt::ACCESS_CYCLES);
        for observer in &self.observers {
            observer.on_register_write(reg, value);
        }
        self.flush_changes();
        // A store can raise an interrupt itself (output on INTn, SREG.I, EIMSK).
        self.service_or_fault();
    }
}

impl Delay for Machine {
    /// Busy-wait in virtual time. Stimuli due inside the window are applied
    /// on schedule and may preempt the wait.
    fn delay_ms(&mut self, ms: u32) {
        let deadline = self
            .clock
            .cycles()
            .saturating_add(self.clock.ms_to_cycles(ms as u64));
        self.run_stimulus_until(deadline);
        self.clock.advance_to(deadline);
    }
}

impl Processor for Machine {
    fn enable_interrupts(&mut self) {
        self.bus.sleep.set_interrupts(true);
        self.clock.advance_cycles(1);
        self.service_or_fault();
    }

    /// Sleep until an interrupt wakes the core. While asleep, queued stimuli
    /// are applied in time order; if the queue runs dry the core stays asleep
    /// and control returns to the caller.
    fn sleep(&mut self) {
        if !self.bus.sleep.sleep_enabled() {
            tracing::debug!("sleep executed with SE clear; ignored");
            return;
        }
        let mode = self.bus.sleep.mode().unwrap_or_else(|| {
            tracing::warn!("Reserved sleep mode in SMCR; treating as Idle");
            SleepMode::Idle
        });

        self.clock.advance_cycles(1);
        self.sleeping = Some(mode);
        tracing::debug!("Entering {:?} at {} ms", mode, self.clock.now_ms());
        for observer in &self.observers {
            observer.on_sleep(mode);
        }

        while self.sleeping.is_some() && self.fault.is_none() {
            let Some(next) = self.stimulus.pop_front() else {
                break;
            };
            self.apply(next);
        }
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("bus", &self.bus)
            .field("clock", &self.clock)
            .field("handlers", &self.handlers)
            .field("sleeping", &self.sleeping)
            .field("pending_stimulus", &self.stimulus.len())
            .finish_non_exhaustive()
    }
}
