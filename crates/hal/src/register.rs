/// I/O registers used by the demos, named as in the ATmega328P datasheet.
///
/// Addresses are data-space addresses (I/O address + 0x20), which is what a
/// volatile pointer dereference on the device needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    PinB,
    DdrB,
    PortB,
    PinC,
    DdrC,
    PortC,
    PinD,
    DdrD,
    PortD,
    Eifr,
    Eimsk,
    Smcr,
    Sreg,
    Eicra,
}

impl Register {
    pub const ALL: [Register; 14] = [
        Register::PinB,
        Register::DdrB,
        Register::PortB,
        Register::PinC,
        Register::DdrC,
        Register::PortC,
        Register::PinD,
        Register::DdrD,
        Register::PortD,
        Register::Eifr,
        Register::Eimsk,
        Register::Smcr,
        Register::Sreg,
        Register::Eicra,
    ];

    pub const fn address(self) -> u16 {
        match self {
            Register::PinB => 0x23,
            Register::DdrB => 0x24,
            Register::PortB => 0x25,
            Register::PinC => 0x26,
            Register::DdrC => 0x27,
            Register::PortC => 0x28,
            Register::PinD => 0x29,
            Register::DdrD => 0x2A,
            Register::PortD => 0x2B,
            Register::Eifr => 0x3C,
            Register::Eimsk => 0x3D,
            Register::Smcr => 0x53,
            Register::Sreg => 0x5F,
            Register::Eicra => 0x69,
        }
    }

    pub fn from_address(addr: u16) -> Option<Register> {
        Register::ALL.into_iter().find(|r| r.address() == addr)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Register::PinB => "PINB",
            Register::DdrB => "DDRB",
            Register::PortB => "PORTB",
            Register::PinC => "PINC",
            Register::DdrC => "DDRC",
            Register::PortC => "PORTC",
            Register::PinD => "PIND",
            Register::DdrD => "DDRD",
            Register::PortD => "PORTD",
            Register::Eifr => "EIFR",
            Register::Eimsk => "EIMSK",
            Register::Smcr => "SMCR",
            Register::Sreg => "SREG",
            Register::Eicra => "EICRA",
        }
    }

    /// `PINx` registers read pin levels; writing ones toggles `PORTx`.
    pub const fn is_pin_input(self) -> bool {
        matches!(self, Register::PinB | Register::PinC | Register::PinD)
    }

    /// The `PORTx` register a write to this `PINx` register flips.
    pub const fn toggled_port(self) -> Option<Register> {
        match self {
            Register::PinB => Some(Register::PortB),
            Register::PinC => Some(Register::PortC),
            Register::PinD => Some(Register::PortD),
            _ => None,
        }
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
