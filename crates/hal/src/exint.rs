use crate::bits::{Eicra, Eifr, Eimsk};
use crate::{Pin, Port, Register, RegisterFile};

/// External interrupt lines with dedicated vectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExternalInterrupt {
    Int0,
    Int1,
}

/// Which condition on the INTn pin raises the interrupt (`ISCn1:ISCn0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Sense {
    LowLevel,
    AnyChange,
    #[default]
    Falling,
    Rising,
}

impl Sense {
    pub const fn bits(self) -> u8 {
        match self {
            Sense::LowLevel => 0b00,
            Sense::AnyChange => 0b01,
            Sense::Falling => 0b10,
            Sense::Rising => 0b11,
        }
    }

    pub const fn from_bits(bits: u8) -> Sense {
        match bits & 0b11 {
            0b00 => Sense::LowLevel,
            0b01 => Sense::AnyChange,
            0b10 => Sense::Falling,
            _ => Sense::Rising,
        }
    }

    pub const fn is_edge(self) -> bool {
        !matches!(self, Sense::LowLevel)
    }

    /// Whether a transition `was -> now` (true = high) latches the flag.
    pub const fn triggers(self, was: bool, now: bool) -> bool {
        match self {
            Sense::LowLevel => !now,
            Sense::AnyChange => was != now,
            Sense::Falling => was && !now,
            Sense::Rising => !was && now,
        }
    }
}

impl ExternalInterrupt {
    pub const ALL: [ExternalInterrupt; 2] = [ExternalInterrupt::Int0, ExternalInterrupt::Int1];

    /// Interrupt vector number (reset is 0).
    pub const fn vector(self) -> u8 {
        match self {
            ExternalInterrupt::Int0 => 1,
            ExternalInterrupt::Int1 => 2,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ExternalInterrupt::Int0 => "INT0",
            ExternalInterrupt::Int1 => "INT1",
        }
    }

    /// INT0 is wired to PD2 and INT1 to PD3.
    pub const fn pin(self) -> Pin {
        match self {
            ExternalInterrupt::Int0 => Pin::new(Port::D, 2),
            ExternalInterrupt::Int1 => Pin::new(Port::D, 3),
        }
    }

    pub const fn mask_bit(self) -> Eimsk {
        match self {
            ExternalInterrupt::Int0 => Eimsk::INT0,
            ExternalInterrupt::Int1 => Eimsk::INT1,
        }
    }

    pub const fn flag_bit(self) -> Eifr {
        match self {
            ExternalInterrupt::Int0 => Eifr::INTF0,
            ExternalInterrupt::Int1 => Eifr::INTF1,
        }
    }

    const fn sense_bits(self) -> (Eicra, Eicra) {
        match self {
            ExternalInterrupt::Int0 => (Eicra::ISC01, Eicra::ISC00),
            ExternalInterrupt::Int1 => (Eicra::ISC11, Eicra::ISC10),
        }
    }

    const fn sense_shift(self) -> u8 {
        match self {
            ExternalInterrupt::Int0 => 0,
            ExternalInterrupt::Int1 => 2,
        }
    }

    /// Decode this line's sense control from an `EICRA` value.
    pub const fn sense_from(self, eicra: u8) -> Sense {
        Sense::from_bits(eicra >> self.sense_shift())
    }

    /// Program `ISCn1:ISCn0` one bit at a time, as `EICRA |= ..; EICRA &= ~..` would.
    pub fn set_sense<R: RegisterFile + ?Sized>(self, regs: &mut R, sense: Sense) {
        let (high, low) = self.sense_bits();
        let bits = sense.bits();
        for (flag, on) in [(high, bits & 0b10 != 0), (low, bits & 0b01 != 0)] {
            let bit = flag.bits().trailing_zeros() as u8;
            if on {
                regs.set_bit(Register::Eicra, bit);
            } else {
                regs.clear_bit(Register::Eicra, bit);
            }
        }
    }

    pub fn unmask<R: RegisterFile + ?Sized>(self, regs: &mut R) {
        regs.set_bit(Register::Eimsk, self.mask_bit().bits().trailing_zeros() as u8);
    }
}
