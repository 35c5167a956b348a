//! Register-level building blocks for the ATmega328P pin demos.
//!
//! Everything here is `no_std` and free of hardware access: programs talk to
//! the chip through [`RegisterFile`], [`Delay`] and [`Processor`], which the
//! firmware implements over volatile pointers and `pinwire-core` implements
//! over a simulated register bus.
#![cfg_attr(not(test), no_std)]

pub mod bits;
pub mod blink;
pub mod exint;
pub mod pin;
pub mod register;
pub mod sleep;
pub mod toggle;

pub use exint::{ExternalInterrupt, Sense};
pub use pin::{Pin, Port};
pub use register::Register;
pub use sleep::SleepMode;

/// CPU clock of an Arduino Uno class board.
pub const DEFAULT_CLOCK_HZ: u32 = 16_000_000;

/// Byte-wide access to the memory-mapped I/O registers.
///
/// `set_bit` and `clear_bit` behave like the `sbi`/`cbi` instructions: only
/// the named bit is affected. On a `PINx` register that means writing a single
/// one, which flips the matching `PORTx` bit and leaves every other pin alone.
pub trait RegisterFile {
    fn read(&self, reg: Register) -> u8;
    fn write(&mut self, reg: Register, value: u8);

    fn set_bit(&mut self, reg: Register, bit: u8) {
        let mask = 1u8 << (bit & 7);
        if reg.is_pin_input() {
            self.write(reg, mask);
        } else {
            let current = self.read(reg);
            self.write(reg, current | mask);
        }
    }

    fn clear_bit(&mut self, reg: Register, bit: u8) {
        let mask = 1u8 << (bit & 7);
        if reg.is_pin_input() {
            // Writing zeros to PINx has no effect.
            return;
        }
        let current = self.read(reg);
        self.write(reg, current & !mask);
    }

    fn is_bit_set(&self, reg: Register, bit: u8) -> bool {
        self.read(reg) & (1u8 << (bit & 7)) != 0
    }
}

/// Blocking millisecond delay, assumed accurate for the fixed clock.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Core instructions that are not register accesses.
pub trait Processor {
    /// `sei`: set the global interrupt enable flag.
    fn enable_interrupts(&mut self);

    /// `sleep`: halt until a wake event. A no-op unless `SMCR.SE` is set.
    fn sleep(&mut self);
}

#[cfg(test)]
pub(crate) mod fake {
    use super::{Delay, Processor, Register, RegisterFile};

    /// Plain byte array with the PINx toggle quirk, for exercising programs.
    #[derive(Debug)]
    pub struct FakeMcu {
        pub regs: [u8; 0x100],
        pub delays: Vec<u32>,
        pub writes: Vec<(Register, u8)>,
        pub interrupts_enabled: bool,
        pub sleeps: usize,
    }

    impl FakeMcu {
        pub fn new() -> Self {
            Self {
                regs: [0; 0x100],
                delays: Vec::new(),
                writes: Vec::new(),
                interrupts_enabled: false,
                sleeps: 0,
            }
        }
    }

    impl RegisterFile for FakeMcu {
        fn read(&self, reg: Register) -> u8 {
            self.regs[reg.address() as usize]
        }

        fn write(&mut self, reg: Register, value: u8) {
            self.writes.push((reg, value));
            match reg.toggled_port() {
                Some(port) => self.regs[port.address() as usize] ^= value,
                None => self.regs[reg.address() as usize] = value,
            }
        }
    }

    impl Delay for FakeMcu {
        fn delay_ms(&mut self, ms: u32) {
            self.delays.push(ms);
        }
    }

    impl Processor for FakeMcu {
        fn enable_interrupts(&mut self) {
            self.interrupts_enabled = true;
        }

        fn sleep(&mut self) {
            self.sleeps += 1;
        }
    }
}
