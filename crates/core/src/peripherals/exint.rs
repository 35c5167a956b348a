use crate::SimResult;
use pinwire_hal::{ExternalInterrupt, Sense};

/// External interrupt unit: `EIFR` (offset 0), `EIMSK` (1), `EICRA` (2).
#[derive(Debug, Default, Clone)]
pub struct ExternalInterrupts {
    eicra: u8,
    eimsk: u8,
    eifr: u8,
}

impl ExternalInterrupts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sense(&self, line: ExternalInterrupt) -> Sense {
        line.sense_from(self.eicra)
    }

    pub fn is_enabled(&self, line: ExternalInterrupt) -> bool {
        self.eimsk & line.mask_bit().bits() != 0
    }

    pub fn is_flagged(&self, line: ExternalInterrupt) -> bool {
        self.eifr & line.flag_bit().bits() != 0
    }

    /// Run the edge detector for `line` on a level change.
    ///
    /// Flags latch whether or not the line is unmasked, but only while the
    /// I/O clock runs. Level sense never latches a flag.
    pub fn sample(&mut self, line: ExternalInterrupt, was: bool, now: bool, io_clock: bool) {
        let sense = self.sense(line);
        if !sense.is_edge() || !io_clock {
            return;
        }
        if sense.triggers(was, now) {
            self.eifr |= line.flag_bit().bits();
            tracing::debug!("EXINT: {} flag latched ({:?})", line.name(), sense);
        }
    }

    /// Whether `line` requests service given its current pin level.
    pub fn pending(&self, line: ExternalInterrupt, level: bool) -> bool {
        if !self.is_enabled(line) {
            return false;
        }
        match self.sense(line) {
            Sense::LowLevel => !level,
            _ => self.is_flagged(line),
        }
    }

    /// Vector entry clears the flag in hardware.
    pub fn acknowledge(&mut self, line: ExternalInterrupt) {
        self.eifr &= !line.flag_bit().bits();
    }
}

impl crate::Peripheral for ExternalInterrupts {
    fn read(&self, offset: u16) -> SimResult<u8> {
        match offset {
            0x00 => Ok(self.eifr),
            0x01 => Ok(self.eimsk),
            0x02 => Ok(self.eicra),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        match offset {
            // EIFR: write one to clear
            0x00 => self.eifr &= !(value & 0x03),
            0x01 => self.eimsk = value & 0x03,
            0x02 => self.eicra = value & 0x0F,
            _ => {}
        }
        Ok(())
    }
}
