// Pinwire - AVR Pin Demos and Register Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_std]
#![no_main]
#![feature(abi_avr_interrupt)]

use panic_halt as _;
use pinwire_firmware::{Atmega328p, VolatileRegisters};
use pinwire_hal::toggle::InterruptToggle;
use pinwire_hal::{ExternalInterrupt, Pin};

// Button on PD2 (INT0), LED on PB5.
const TOGGLE: InterruptToggle = InterruptToggle::new(Pin::LED_BUILTIN, ExternalInterrupt::Int0);

#[avr_device::interrupt(atmega328p)]
#[allow(non_snake_case)]
fn INT0() {
    TOGGLE.on_interrupt(&mut VolatileRegisters);
}

#[avr_device::entry]
fn main() -> ! {
    let mut mcu = Atmega328p::default();
    TOGGLE.run(&mut mcu)
}
