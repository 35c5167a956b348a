use crate::waveform::PinChange;
use crate::SimulationObserver;
use pinwire_hal::{ExternalInterrupt, Register, SleepMode};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for what the simulated core spent its time on.
#[derive(Debug, Default)]
pub struct ActivityMetrics {
    register_writes: AtomicU64,
    pin_changes: AtomicU64,
    sleeps: AtomicU64,
    wakeups: AtomicU64,
    interrupts: AtomicU64,
    handler_accesses: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsReport {
    pub register_writes: u64,
    pub pin_changes: u64,
    pub sleeps: u64,
    pub wakeups: u64,
    pub interrupts: u64,
    pub handler_accesses: u64,
}

impl ActivityMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&self) {
        for counter in [
            &self.register_writes,
            &self.pin_changes,
            &self.sleeps,
            &self.wakeups,
            &self.interrupts,
            &self.handler_accesses,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    pub fn get_interrupts(&self) -> u64 {
        self.interrupts.load(Ordering::SeqCst)
    }

    pub fn get_sleeps(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }

    pub fn get_wakeups(&self) -> u64 {
        self.wakeups.load(Ordering::SeqCst)
    }

    pub fn report(&self) -> MetricsReport {
        MetricsReport {
            register_writes: self.register_writes.load(Ordering::SeqCst),
            pin_changes: self.pin_changes.load(Ordering::SeqCst),
            sleeps: self.get_sleeps(),
            wakeups: self.get_wakeups(),
            interrupts: self.get_interrupts(),
            handler_accesses: self.handler_accesses.load(Ordering::SeqCst),
        }
    }
}

impl SimulationObserver for ActivityMetrics {
    fn on_register_write(&self, _reg: Register, _value: u8) {
        self.register_writes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_pin_change(&self, _change: &PinChange) {
        self.pin_changes.fetch_add(1, Ordering::SeqCst);
    }

    fn on_sleep(&self, _mode: SleepMode) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
    }

    fn on_wake(&self, _mode: SleepMode) {
        self.wakeups.fetch_add(1, Ordering::SeqCst);
    }

    fn on_interrupt(&self, _line: ExternalInterrupt, accesses: usize) {
        self.interrupts.fetch_add(1, Ordering::SeqCst);
        self.handler_accesses
            .fetch_add(accesses as u64, Ordering::SeqCst);
    }
}
