use crate::bits::{Smcr, SMCR_SE};
use crate::{Processor, Register, RegisterFile, Sense};

/// `SMCR.SM2..0` encodings. 0b100 and 0b101 are reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SleepMode {
    #[default]
    Idle,
    AdcNoiseReduction,
    PowerDown,
    PowerSave,
    Standby,
    ExtendedStandby,
}

impl SleepMode {
    pub const fn sm_bits(self) -> u8 {
        match self {
            SleepMode::Idle => 0b000,
            SleepMode::AdcNoiseReduction => 0b001,
            SleepMode::PowerDown => 0b010,
            SleepMode::PowerSave => 0b011,
            SleepMode::Standby => 0b110,
            SleepMode::ExtendedStandby => 0b111,
        }
    }

    pub const fn from_smcr(smcr: u8) -> Option<SleepMode> {
        match (smcr >> 1) & 0b111 {
            0b000 => Some(SleepMode::Idle),
            0b001 => Some(SleepMode::AdcNoiseReduction),
            0b010 => Some(SleepMode::PowerDown),
            0b011 => Some(SleepMode::PowerSave),
            0b110 => Some(SleepMode::Standby),
            0b111 => Some(SleepMode::ExtendedStandby),
            _ => None,
        }
    }

    /// Whether the I/O clock keeps running, which edge detection on INTn needs.
    pub const fn io_clock_running(self) -> bool {
        matches!(self, SleepMode::Idle)
    }

    /// INT0/INT1 wake every mode with level sense, but edges only from Idle.
    pub const fn wakes_on(self, sense: Sense) -> bool {
        !sense.is_edge() || self.io_clock_running()
    }

    /// Deepest mode from which an interrupt with `sense` still wakes the core.
    pub const fn deepest_waking_on(sense: Sense) -> SleepMode {
        if sense.is_edge() {
            SleepMode::Idle
        } else {
            SleepMode::PowerDown
        }
    }
}

/// `set_sleep_mode()`: replace `SM2..0`, keep `SE`.
pub fn set_sleep_mode<R: RegisterFile + ?Sized>(regs: &mut R, mode: SleepMode) {
    let smcr = regs.read(Register::Smcr) & !Smcr::SM_MASK.bits();
    regs.write(Register::Smcr, smcr | (mode.sm_bits() << 1));
}

/// `sleep_mode()`: enable sleep, execute `sleep`, disable sleep again.
pub fn sleep_mode<M: RegisterFile + Processor + ?Sized>(mcu: &mut M) {
    mcu.set_bit(Register::Smcr, SMCR_SE);
    mcu.sleep();
    mcu.clear_bit(Register::Smcr, SMCR_SE);
}
