use pinwire_hal::Pin;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A level change stamped with the cycle it happened on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinChange {
    pub at_cycles: u64,
    pub pin: Pin,
    pub high: bool,
}

/// Transitions of one pin, for measuring on/off times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Waveform {
    pub pin: Pin,
    clock_hz: u32,
    edges: Vec<(u64, bool)>,
}

impl Waveform {
    pub fn from_trace(pin: Pin, clock_hz: u32, trace: &[PinChange]) -> Self {
        let edges = trace
            .iter()
            .filter(|c| c.pin == pin)
            .map(|c| (c.at_cycles, c.high))
            .collect();
        Self {
            pin,
            clock_hz: clock_hz.max(1),
            edges,
        }
    }

    pub fn transitions(&self) -> usize {
        self.edges.len()
    }

    pub fn rising_edges(&self) -> usize {
        self.edges.iter().filter(|(_, high)| *high).count()
    }

    pub fn falling_edges(&self) -> usize {
        self.edges.iter().filter(|(_, high)| !*high).count()
    }

    /// Level after the last transition, if there was one.
    pub fn final_level(&self) -> Option<bool> {
        self.edges.last().map(|(_, high)| *high)
    }

    /// Lengths of the completed intervals spent at `level`.
    pub fn durations(&self, level: bool) -> Vec<Duration> {
        self.edges
            .windows(2)
            .filter(|w| w[0].1 == level)
            .map(|w| self.to_duration(w[1].0 - w[0].0))
            .collect()
    }

    pub fn high_durations(&self) -> Vec<Duration> {
        self.durations(true)
    }

    pub fn low_durations(&self) -> Vec<Duration> {
        self.durations(false)
    }

    /// Distance between consecutive rising edges.
    pub fn periods(&self) -> Vec<Duration> {
        let rising: Vec<u64> = self
            .edges
            .iter()
            .filter(|(_, high)| *high)
            .map(|(at, _)| *at)
            .collect();
        rising
            .windows(2)
            .map(|w| self.to_duration(w[1] - w[0]))
            .collect()
    }

    fn to_duration(&self, cycles: u64) -> Duration {
        Duration::from_nanos((cycles as u128 * 1_000_000_000 / self.clock_hz as u128) as u64)
    }
}
