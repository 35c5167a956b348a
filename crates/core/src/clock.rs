use std::time::Duration;

/// Virtual CPU clock. Time only moves when the simulation says so.
#[derive(Debug, Clone)]
pub struct SimClock {
    clock_hz: u32,
    cycles: u64,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new(pinwire_hal::DEFAULT_CLOCK_HZ)
    }
}

impl SimClock {
    pub fn new(clock_hz: u32) -> Self {
        Self {
            clock_hz: clock_hz.max(1),
            cycles: 0,
        }
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn now_ms(&self) -> u64 {
        saturate(self.cycles as u128 * 1000 / self.clock_hz as u128)
    }

    pub fn elapsed(&self) -> Duration {
        self.to_duration(self.cycles)
    }

    /// Saturates at `u64::MAX` for times past the cycle counter's range.
    pub fn ms_to_cycles(&self, ms: u64) -> u64 {
        saturate(ms as u128 * self.clock_hz as u128 / 1000)
    }

    pub fn to_duration(&self, cycles: u64) -> Duration {
        let nanos = cycles as u128 * 1_000_000_000 / self.clock_hz as u128;
        Duration::from_nanos(saturate(nanos))
    }

    pub fn advance_cycles(&mut self, cycles: u64) {
        self.cycles = self.cycles.saturating_add(cycles);
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.advance_cycles(self.ms_to_cycles(ms));
    }

    /// Move forward to `cycles`; never moves backwards.
    pub fn advance_to(&mut self, cycles: u64) {
        self.cycles = self.cycles.max(cycles);
    }

    pub fn reset(&mut self) {
        self.cycles = 0;
    }
}

fn saturate(value: u128) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
