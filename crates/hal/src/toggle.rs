//! Interrupt-driven LED toggle with the core asleep between edges.
//!
//! The main loop only sleeps. Each qualifying edge on the INTn pin wakes the
//! core, the vector calls [`InterruptToggle::on_interrupt`], which flips the
//! LED with one write to `PINx`, and the loop goes back to sleep. Edges are
//! not debounced.

use crate::sleep::{self, SleepMode};
use crate::{ExternalInterrupt, Pin, Processor, RegisterFile, Sense};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptToggle {
    pub led: Pin,
    pub line: ExternalInterrupt,
    pub sense: Sense,
    pub sleep_mode: SleepMode,
}

impl Default for InterruptToggle {
    fn default() -> Self {
        Self::new(Pin::LED_BUILTIN, ExternalInterrupt::Int0)
    }
}

impl InterruptToggle {
    /// Falling-edge sense and the deepest sleep mode that still wakes on it.
    pub const fn new(led: Pin, line: ExternalInterrupt) -> Self {
        Self {
            led,
            line,
            sense: Sense::Falling,
            sleep_mode: SleepMode::deepest_waking_on(Sense::Falling),
        }
    }

    pub const fn with_sense(mut self, sense: Sense) -> Self {
        self.sense = sense;
        self
    }

    pub const fn with_sleep_mode(mut self, mode: SleepMode) -> Self {
        self.sleep_mode = mode;
        self
    }

    /// The input pin hard-wired to the interrupt line.
    pub const fn input(&self) -> Pin {
        self.line.pin()
    }

    pub fn init_led<R: RegisterFile + ?Sized>(&self, regs: &mut R) {
        self.led.make_output(regs);
    }

    pub fn led_off<R: RegisterFile + ?Sized>(&self, regs: &mut R) {
        self.led.set_low(regs);
    }

    pub fn init_input<R: RegisterFile + ?Sized>(&self, regs: &mut R) {
        self.input().make_input(regs);
        self.line.set_sense(regs, self.sense);
        self.line.unmask(regs);
    }

    /// Everything up to, but not including, the first sleep.
    pub fn configure<M: RegisterFile + Processor + ?Sized>(&self, mcu: &mut M) {
        self.init_led(mcu);
        self.led_off(mcu);
        self.init_input(mcu);
        mcu.enable_interrupts();
        sleep::set_sleep_mode(mcu, self.sleep_mode);
    }

    /// Interrupt handler body: a single write-one to the LED's `PINx` bit.
    pub fn on_interrupt<R: RegisterFile + ?Sized>(&self, regs: &mut R) {
        self.led.toggle(regs);
    }

    /// One pass of the main loop.
    pub fn idle<M: RegisterFile + Processor + ?Sized>(&self, mcu: &mut M) {
        sleep::sleep_mode(mcu);
    }

    pub fn run<M: RegisterFile + Processor>(&self, mcu: &mut M) -> ! {
        self.configure(mcu);
        loop {
            self.idle(mcu);
        }
    }
}
