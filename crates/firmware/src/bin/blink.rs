// Pinwire - AVR Pin Demos and Register Simulator
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_std]
#![no_main]

use panic_halt as _;
use pinwire_firmware::Atmega328p;
use pinwire_hal::blink::BlinkLoop;

#[avr_device::entry]
fn main() -> ! {
    let mut mcu = Atmega328p::default();
    BlinkLoop::default().run(&mut mcu)
}
