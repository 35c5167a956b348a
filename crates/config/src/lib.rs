use anyhow::{Context, Result};
use pinwire_hal::blink::{BlinkLoop, DEFAULT_HIGH_MS, DEFAULT_LOW_MS};
use pinwire_hal::toggle::InterruptToggle;
use pinwire_hal::{ExternalInterrupt, Pin, Sense, SleepMode, DEFAULT_CLOCK_HZ};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SCHEMA_VERSION: &str = "1.0";

/// Latest input event time a script may schedule (one year).
pub const MAX_EVENT_MS: u64 = 365 * 24 * 3_600_000;

fn default_clock_hz() -> u32 {
    DEFAULT_CLOCK_HZ
}

fn default_led() -> Pin {
    Pin::LED_BUILTIN
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BlinkConfig {
    pub high_ms: u32,
    pub low_ms: u32,
}

impl Default for BlinkConfig {
    fn default() -> Self {
        Self {
            high_ms: DEFAULT_HIGH_MS,
            low_ms: DEFAULT_LOW_MS,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToggleConfig {
    #[serde(default = "default_interrupt")]
    pub interrupt: ExternalInterrupt,
    #[serde(default)]
    pub sense: Sense,
    /// Falls back to the deepest mode that still wakes on `sense`.
    #[serde(default)]
    pub sleep_mode: Option<SleepMode>,
    /// Whether the input line idles high (pull-up / released button).
    #[serde(default = "default_true")]
    pub input_idles_high: bool,
}

fn default_interrupt() -> ExternalInterrupt {
    ExternalInterrupt::Int0
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            interrupt: default_interrupt(),
            sense: Sense::default(),
            sleep_mode: None,
            input_idles_high: true,
        }
    }
}

impl ToggleConfig {
    pub fn effective_sleep_mode(&self) -> SleepMode {
        self.sleep_mode
            .unwrap_or_else(|| SleepMode::deepest_waking_on(self.sense))
    }
}

/// Board wiring and program parameters.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BoardConfig {
    pub name: String,
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u32,
    #[serde(default = "default_led")]
    pub led: Pin,
    #[serde(default)]
    pub blink: BlinkConfig,
    #[serde(default)]
    pub toggle: ToggleConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            name: "arduino-uno".to_string(),
            clock_hz: DEFAULT_CLOCK_HZ,
            led: default_led(),
            blink: BlinkConfig::default(),
            toggle: ToggleConfig::default(),
        }
    }
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open board config at {:?}", path.as_ref()))?;
        let config: Self =
            serde_yaml::from_reader(f).context("Failed to parse Board Config YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.clock_hz == 0 {
            anyhow::bail!("'clock_hz' must be greater than zero");
        }
        if self.led.bit > 7 {
            anyhow::bail!("LED bit {} is out of range (0-7)", self.led.bit);
        }
        if self.blink.high_ms == 0 || self.blink.low_ms == 0 {
            anyhow::bail!("Blink 'high_ms' and 'low_ms' must be greater than zero");
        }

        let input = self.toggle.interrupt.pin();
        if input == self.led {
            anyhow::bail!(
                "LED {} is the {} input pin",
                self.led,
                self.toggle.interrupt.name()
            );
        }

        let mode = self.toggle.effective_sleep_mode();
        if !mode.wakes_on(self.toggle.sense) {
            anyhow::bail!(
                "Sleep mode {:?} cannot wake on {:?} sense for {}; edge sense only wakes from Idle",
                mode,
                self.toggle.sense,
                self.toggle.interrupt.name()
            );
        }
        Ok(())
    }

    pub fn blink_loop(&self) -> BlinkLoop {
        BlinkLoop::new(self.led).with_timing(self.blink.high_ms, self.blink.low_ms)
    }

    pub fn interrupt_toggle(&self) -> InterruptToggle {
        InterruptToggle::new(self.led, self.toggle.interrupt)
            .with_sense(self.toggle.sense)
            .with_sleep_mode(self.toggle.effective_sleep_mode())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InputEvent {
    pub at_ms: u64,
    pub level: Level,
}

fn default_press_start() -> u64 {
    100
}

fn default_press_interval() -> u64 {
    100
}

fn default_press_hold() -> u64 {
    50
}

/// Shorthand for `count` press/release pairs on an input that idles high.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PressTrain {
    pub count: u32,
    #[serde(default = "default_press_start")]
    pub start_ms: u64,
    #[serde(default = "default_press_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_press_hold")]
    pub hold_ms: u64,
}

impl PressTrain {
    /// Input events produced by the train: two per press.
    pub fn event_count(&self) -> Option<usize> {
        usize::try_from(self.count).ok()?.checked_mul(2)
    }

    /// Time of the final release, `None` on overflow.
    pub fn end_ms(&self) -> Option<u64> {
        let Some(last) = u64::from(self.count).checked_sub(1) else {
            return Some(self.start_ms);
        };
        last.checked_mul(self.interval_ms)?
            .checked_add(self.start_ms)?
            .checked_add(self.hold_ms)
    }

    pub fn events(&self) -> Vec<InputEvent> {
        (0..u64::from(self.count))
            .flat_map(|i| {
                let at = self
                    .start_ms
                    .saturating_add(i.saturating_mul(self.interval_ms));
                [
                    InputEvent {
                        at_ms: at,
                        level: Level::Low,
                    },
                    InputEvent {
                        at_ms: at.saturating_add(self.hold_ms),
                        level: Level::High,
                    },
                ]
            })
            .collect()
    }
}

fn default_max_events() -> usize {
    10_000
}

fn default_max_passes() -> usize {
    10_000
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScriptLimits {
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            max_events: default_max_events(),
            max_passes: default_max_passes(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputLevelAssertion {
    pub output_level: Level,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ToggleCountAssertion {
    pub toggle_count: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SleepingAssertion {
    pub sleeping: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ScriptAssertion {
    OutputLevel(OutputLevelAssertion),
    ToggleCount(ToggleCountAssertion),
    Sleeping(SleepingAssertion),
}

/// Input stimulus and expectations for an interrupt toggle run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StimulusScript {
    pub schema_version: String,
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default)]
    pub events: Vec<InputEvent>,
    #[serde(default)]
    pub presses: Option<PressTrain>,
    #[serde(default)]
    pub limits: ScriptLimits,
    #[serde(default)]
    pub assertions: Vec<ScriptAssertion>,
}

impl StimulusScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(&path)
            .with_context(|| format!("Failed to open stimulus script at {:?}", path.as_ref()))?;
        Self::from_slice(&bytes)
    }

    /// Parse and validate a script already read into memory.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let script: Self =
            serde_yaml::from_slice(bytes).context("Failed to parse Stimulus Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != SCHEMA_VERSION {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '{}'",
                self.schema_version,
                SCHEMA_VERSION
            );
        }

        if self.limits.max_passes == 0 {
            anyhow::bail!("Limit 'max_passes' must be greater than zero");
        }

        // Counted before the press train is expanded.
        let press_events = match &self.presses {
            Some(presses) => presses
                .event_count()
                .context("Press 'count' overflows the event limit")?,
            None => 0,
        };
        let count = self
            .events
            .len()
            .checked_add(press_events)
            .context("Input event count overflows")?;
        if count > self.limits.max_events {
            anyhow::bail!(
                "Script has {} input events, above 'max_events' ({})",
                count,
                self.limits.max_events
            );
        }

        if let Some(event) = self.events.iter().find(|e| e.at_ms > MAX_EVENT_MS) {
            anyhow::bail!(
                "Event at {} ms is past the {} ms limit",
                event.at_ms,
                MAX_EVENT_MS
            );
        }

        if let Some(presses) = &self.presses {
            if presses.hold_ms == 0 || presses.hold_ms >= presses.interval_ms {
                anyhow::bail!("Press 'hold_ms' must be between 1 and 'interval_ms' - 1");
            }
            let end = presses
                .end_ms()
                .context("Press train end time overflows")?;
            if end > MAX_EVENT_MS {
                anyhow::bail!(
                    "Press train ends at {} ms, past the {} ms limit",
                    end,
                    MAX_EVENT_MS
                );
            }
        }
        Ok(())
    }

    /// Explicit events plus the expanded press train, in time order.
    pub fn all_events(&self) -> Vec<InputEvent> {
        let mut events = self.events.clone();
        if let Some(presses) = &self.presses {
            events.extend(presses.events());
        }
        events.sort_by_key(|e| e.at_ms);
        events
    }
}
