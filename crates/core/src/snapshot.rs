use pinwire_hal::SleepMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const SNAPSHOT_KIND: &str = "pinwire_atmega328p";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MachineSnapshot {
    #[serde(rename = "type")]
    pub kind: String,
    pub clock: ClockSnapshot,
    pub registers: BTreeMap<String, u8>,
    /// Mode the core is parked in at its `sleep` instruction. `SMCR.SE` may
    /// already read clear: `sleep_mode()` clears it once the queue runs dry.
    pub sleeping: Option<SleepMode>,
    pub interrupts_enabled: bool,
    pub pending_stimulus: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ClockSnapshot {
    pub clock_hz: u32,
    pub cycles: u64,
    pub elapsed_ms: f64,
}

impl MachineSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
