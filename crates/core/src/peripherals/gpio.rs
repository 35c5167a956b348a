use crate::SimResult;

/// ATmega328P-style I/O port: `PINx` (offset 0), `DDRx` (1), `PORTx` (2).
///
/// Besides the registers the port tracks what the outside world drives onto
/// each line, so `PINx` can be computed the way the pin hardware would.
#[derive(Debug, Default, Clone)]
pub struct GpioPort {
    ddr: u8,
    port: u8,
    external: u8,
    driven: u8,
}

impl GpioPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logic level of every line as `PINx` reports it.
    ///
    /// Outputs read back their latch. Inputs read the external driver, or the
    /// pull-up (`PORTxn = 1`) when nothing drives them; floating inputs read 0.
    pub fn levels(&self) -> u8 {
        let outputs = self.port & self.ddr;
        let driven = self.external & self.driven;
        let pulled_up = self.port & !self.driven;
        outputs | (!self.ddr & (driven | pulled_up))
    }

    pub fn ddr(&self) -> u8 {
        self.ddr
    }

    pub fn port(&self) -> u8 {
        self.port
    }

    pub fn drive(&mut self, bit: u8, high: bool) {
        let mask = 1u8 << (bit & 7);
        self.driven |= mask;
        if high {
            self.external |= mask;
        } else {
            self.external &= !mask;
        }
    }

    pub fn release(&mut self, bit: u8) {
        let mask = 1u8 << (bit & 7);
        self.driven &= !mask;
        self.external &= !mask;
    }
}

impl crate::Peripheral for GpioPort {
    fn read(&self, offset: u16) -> SimResult<u8> {
        match offset {
            0x00 => Ok(self.levels()),
            0x01 => Ok(self.ddr),
            0x02 => Ok(self.port),
            _ => Ok(0),
        }
    }

    fn write(&mut self, offset: u16, value: u8) -> SimResult<()> {
        match offset {
            // PINx: writing a one toggles the PORTx bit
            0x00 => self.port ^= value,
            0x01 => self.ddr = value,
            0x02 => self.port = value,
            _ => {}
        }
        Ok(())
    }
}
