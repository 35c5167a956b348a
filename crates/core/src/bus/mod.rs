use crate::peripherals::{ExternalInterrupts, GpioPort, SleepController};
use crate::{Peripheral, SimResult, SimulationError};
use pinwire_hal::{ExternalInterrupt, Pin, Port, Register, RegisterFile};

/// A pin level change produced by a register write or an external driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelChange {
    pub pin: Pin,
    pub high: bool,
}

/// Data-space I/O bus of the simulated ATmega328P.
///
/// Every write is followed by a level scan of all three ports; changed lines
/// are queued for the machine and fed to the external interrupt edge detector.
#[derive(Debug, Default)]
pub struct RegisterBus {
    pub gpio_b: GpioPort,
    pub gpio_c: GpioPort,
    pub gpio_d: GpioPort,
    pub exint: ExternalInterrupts,
    pub sleep: SleepController,
    changes: Vec<LevelChange>,
}

const PORTS: [Port; 3] = [Port::B, Port::C, Port::D];

impl RegisterBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, addr: u16) -> Option<(&dyn Peripheral, u16)> {
        match addr {
            0x23..=0x25 => Some((&self.gpio_b as &dyn Peripheral, addr - 0x23)),
            0x26..=0x28 => Some((&self.gpio_c as &dyn Peripheral, addr - 0x26)),
            0x29..=0x2B => Some((&self.gpio_d as &dyn Peripheral, addr - 0x29)),
            0x3C..=0x3D => Some((&self.exint as &dyn Peripheral, addr - 0x3C)),
            0x69 => Some((&self.exint as &dyn Peripheral, 0x02)),
            0x53 => Some((&self.sleep as &dyn Peripheral, 0x00)),
            0x5F => Some((&self.sleep as &dyn Peripheral, 0x01)),
            _ => None,
        }
    }

    fn map_mut(&mut self, addr: u16) -> Option<(&mut dyn Peripheral, u16)> {
        match addr {
            0x23..=0x25 => Some((&mut self.gpio_b as &mut dyn Peripheral, addr - 0x23)),
            0x26..=0x28 => Some((&mut self.gpio_c as &mut dyn Peripheral, addr - 0x26)),
            0x29..=0x2B => Some((&mut self.gpio_d as &mut dyn Peripheral, addr - 0x29)),
            0x3C..=0x3D => Some((&mut self.exint as &mut dyn Peripheral, addr - 0x3C)),
            0x69 => Some((&mut self.exint as &mut dyn Peripheral, 0x02)),
            0x53 => Some((&mut self.sleep as &mut dyn Peripheral, 0x00)),
            0x5F => Some((&mut self.sleep as &mut dyn Peripheral, 0x01)),
            _ => None,
        }
    }

    pub fn read_u8(&self, addr: u16) -> SimResult<u8> {
        let (dev, offset) = self
            .map(addr)
            .ok_or(SimulationError::UnmappedAddress(addr))?;
        dev.read(offset)
    }

    pub fn write_u8(&mut self, addr: u16, value: u8) -> SimResult<()> {
        let before = self.levels();
        let (dev, offset) = self
            .map_mut(addr)
            .ok_or(SimulationError::UnmappedAddress(addr))?;
        dev.write(offset, value)?;
        // The core is awake whenever it executes a store.
        self.propagate(before, true);
        Ok(())
    }

    pub fn gpio(&self, port: Port) -> &GpioPort {
        match port {
            Port::B => &self.gpio_b,
            Port::C => &self.gpio_c,
            Port::D => &self.gpio_d,
        }
    }

    pub fn gpio_mut(&mut self, port: Port) -> &mut GpioPort {
        match port {
            Port::B => &mut self.gpio_b,
            Port::C => &mut self.gpio_c,
            Port::D => &mut self.gpio_d,
        }
    }

    pub fn level(&self, pin: Pin) -> bool {
        self.gpio(pin.port).levels() & pin.mask() != 0
    }

    /// Drive a line from outside the chip.
    pub fn drive_external(&mut self, pin: Pin, high: bool, io_clock: bool) {
        let before = self.levels();
        self.gpio_mut(pin.port).drive(pin.bit, high);
        self.propagate(before, io_clock);
    }

    /// Stop driving a line; it falls back to its pull-up or floats.
    pub fn release_external(&mut self, pin: Pin, io_clock: bool) {
        let before = self.levels();
        self.gpio_mut(pin.port).release(pin.bit);
        self.propagate(before, io_clock);
    }

    pub fn take_changes(&mut self) -> Vec<LevelChange> {
        std::mem::take(&mut self.changes)
    }

    fn levels(&self) -> [u8; 3] {
        PORTS.map(|port| self.gpio(port).levels())
    }

    fn propagate(&mut self, before: [u8; 3], io_clock: bool) {
        let after = self.levels();
        for (idx, port) in PORTS.into_iter().enumerate() {
            let diff = before[idx] ^ after[idx];
            for bit in (0..8u8).filter(|&b| diff & (1u8 << b) != 0) {
                let pin = Pin::new(port, bit);
                let high = after[idx] & (1u8 << bit) != 0;
                self.changes.push(LevelChange { pin, high });
                for line in ExternalInterrupt::ALL {
                    if line.pin() == pin {
                        self.exint.sample(line, !high, high, io_clock);
                    }
                }
            }
        }
    }
}

impl RegisterFile for RegisterBus {
    fn read(&self, reg: Register) -> u8 {
        self.read_u8(reg.address()).unwrap_or_else(|e| {
            tracing::warn!("Bus read of {} failed: {}", reg, e);
            0
        })
    }

    fn write(&mut self, reg: Register, value: u8) {
        if let Err(e) = self.write_u8(reg.address(), value) {
            tracing::warn!("Bus write of {} failed: {}", reg, e);
        }
    }
}
