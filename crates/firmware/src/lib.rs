// Pinwire - AVR Pin Demos and Register Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_std]

//! On-chip backends for the `pinwire-hal` traits.

use pinwire_hal::{Delay, Processor, Register, RegisterFile, DEFAULT_CLOCK_HZ};

/// Direct volatile access to the I/O registers.
///
/// Zero-sized, so the main loop and interrupt vectors each make their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct VolatileRegisters;

impl RegisterFile for VolatileRegisters {
    #[inline(always)]
    fn read(&self, reg: Register) -> u8 {
        // SAFETY: every `Register` is a valid, always-mapped I/O address.
        unsafe { core::ptr::read_volatile(reg.address() as usize as *const u8) }
    }

    #[inline(always)]
    fn write(&mut self, reg: Register, value: u8) {
        // SAFETY: as above; the demos are the only code touching these pins.
        unsafe { core::ptr::write_volatile(reg.address() as usize as *mut u8, value) }
    }
}

/// Cycle-counted busy wait at the fixed 16 MHz clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusyWait;

impl Delay for BusyWait {
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            avr_device::asm::delay_cycles(DEFAULT_CLOCK_HZ / 1000);
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Core;

impl Processor for Core {
    fn enable_interrupts(&mut self) {
        // SAFETY: called once, after the INTn handler and its pins are set up.
        unsafe { avr_device::interrupt::enable() }
    }

    fn sleep(&mut self) {
        avr_device::asm::sleep();
    }
}

/// Everything a program needs on the real chip.
#[derive(Debug, Clone, Copy, Default)]
pub struct Atmega328p {
    pub regs: VolatileRegisters,
    pub delay: BusyWait,
    pub core: Core,
}

impl RegisterFile for Atmega328p {
    fn read(&self, reg: Register) -> u8 {
        self.regs.read(reg)
    }

    fn write(&mut self, reg: Register, value: u8) {
        self.regs.write(reg, value)
    }
}

impl Delay for Atmega328p {
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }
}

impl Processor for Atmega328p {
    fn enable_interrupts(&mut self) {
        self.core.enable_interrupts()
    }

    fn sleep(&mut self) {
        self.core.sleep()
    }
}
