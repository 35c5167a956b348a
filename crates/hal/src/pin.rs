use crate::Register;

/// The three I/O ports of the ATmega328P.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Port {
    B,
    C,
    D,
}

impl Port {
    pub const fn ddr(self) -> Register {
        match self {
            Port::B => Register::DdrB,
            Port::C => Register::DdrC,
            Port::D => Register::DdrD,
        }
    }

    pub const fn port(self) -> Register {
        match self {
            Port::B => Register::PortB,
            Port::C => Register::PortC,
            Port::D => Register::PortD,
        }
    }

    pub const fn pin(self) -> Register {
        match self {
            Port::B => Register::PinB,
            Port::C => Register::PinC,
            Port::D => Register::PinD,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Port::B => 'B',
            Port::C => 'C',
            Port::D => 'D',
        }
    }
}

/// A single digital I/O line, e.g. `PB5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pin {
    pub port: Port,
    pub bit: u8,
}

impl Pin {
    /// Arduino Uno on-board LED ("L", digital 13).
    pub const LED_BUILTIN: Pin = Pin::new(Port::B, 5);

    pub const fn new(port: Port, bit: u8) -> Self {
        Self { port, bit }
    }

    pub const fn mask(self) -> u8 {
        1 << (self.bit & 7)
    }

    /// Set the data direction bit (`DDxn = 1`).
    pub fn make_output<R: crate::RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.set_bit(self.port.ddr(), self.bit);
    }

    /// Clear the data direction bit (`DDxn = 0`).
    pub fn make_input<R: crate::RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.clear_bit(self.port.ddr(), self.bit);
    }

    pub fn set_high<R: crate::RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.set_bit(self.port.port(), self.bit);
    }

    pub fn set_low<R: crate::RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.clear_bit(self.port.port(), self.bit);
    }

    /// Flip the output latch with a single write-one to `PINxn`.
    pub fn toggle<R: crate::RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.set_bit(self.port.pin(), self.bit);
    }

    pub fn is_high<R: crate::RegisterFile + ?Sized>(self, regs: &R) -> bool {
        regs.is_bit_set(self.port.pin(), self.bit)
    }
}

impl core::fmt::Display for Pin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "P{}{}", self.port.letter(), self.bit)
    }
}
