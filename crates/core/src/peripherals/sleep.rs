use crate::SimResult;
use pinwire_hal::bits::{Smcr, Sreg};
use pinwire_hal::SleepMode;

/// `SMCR` (offset 0) and `SREG` (offset 1).
#[derive(Debug, Default, Clone)]
pub struct SleepController {
    smcr: u8,
    sreg: u8,
}

impl SleepController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sleep_enabled(&self) -> bool {
        self.smcr & Smcr::SE.bits() != 0
    }

    /// `None` for the reserved `SM` encodings.
    pub fn mode(&self) -> Option<SleepMode> {
        SleepMode::from_smcr(self.smcr)
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.sreg & Sreg::I.bits() != 0
    }

    pub fn set_interrupts(&mut self, enabled: bool) {
        if enabled {
            self.sreg |= Sreg::I.bits();
        } else {
            self.sreg &= !Sreg::I.bits();
        }
    }
}

impl crate::Peripheral for SleepController {
    fn read(&self, offset: u16) -> SimResult<u8> {
        match offset {
            0x00 => Ok(self.smcr),
            0x01 => Ok(self.sreg),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        match offset {
            0x00 => self.smcr = value & 0x0F,
            0x01 => self.sreg = value,
            _ => {}
        }
        Ok(())
    }
}
