//! Busy-wait blink loop on a single output pin.

use crate::{Delay, Pin, RegisterFile};

pub const DEFAULT_HIGH_MS: u32 = 3000;
pub const DEFAULT_LOW_MS: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkLoop {
    pub led: Pin,
    pub high_ms: u32,
    pub low_ms: u32,
}

impl Default for BlinkLoop {
    fn default() -> Self {
        Self::new(Pin::LED_BUILTIN)
    }
}

impl BlinkLoop {
    pub const fn new(led: Pin) -> Self {
        Self {
            led,
            high_ms: DEFAULT_HIGH_MS,
            low_ms: DEFAULT_LOW_MS,
        }
    }

    pub const fn with_timing(mut self, high_ms: u32, low_ms: u32) -> Self {
        self.high_ms = high_ms;
        self.low_ms = low_ms;
        self
    }

    pub const fn period_ms(&self) -> u32 {
        self.high_ms + self.low_ms
    }

    pub fn configure<R: RegisterFile + ?Sized>(&self, regs: &mut R) {
        self.led.make_output(regs);
    }

    /// One high phase followed by one low phase.
    pub fn cycle<M: RegisterFile + Delay + ?Sized>(&self, mcu: &mut M) {
        self.led.set_high(mcu);
        mcu.delay_ms(self.high_ms);
        self.led.set_low(mcu);
        mcu.delay_ms(self.low_ms);
    }

    pub fn run<M: RegisterFile + Delay>(&self, mcu: &mut M) -> ! {
        self.configure(mcu);
        loop {
            self.cycle(mcu);
        }
    }
}
