use crate::bus::RegisterBus;
use pinwire_hal::{Register, RegisterFile};
use std::cell::RefCell;

/// Cycles to push the return address and jump through the vector table.
pub const ISR_ENTRY_CYCLES: u64 = 4;
pub const RETI_CYCLES: u64 = 4;
/// `sbi`/`cbi`/`lds`/`sts` all take two cycles.
pub const ACCESS_CYCLES: u64 = 2;

/// What a handler is allowed to do while it runs with interrupts disabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerContract {
    pub allowed: Vec<Register>,
    pub max_accesses: usize,
}

impl HandlerContract {
    pub fn new(allowed: impl Into<Vec<Register>>) -> Self {
        Self {
            allowed: allowed.into(),
            max_accesses: 4,
        }
    }

    pub fn with_max_accesses(mut self, max: usize) -> Self {
        self.max_accesses = max;
        self
    }

    pub fn allows(&self, reg: Register) -> bool {
        self.allowed.contains(&reg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(Register),
    Write(Register, u8),
}

impl Access {
    pub fn register(&self) -> Register {
        match *self {
            Access::Read(reg) | Access::Write(reg, _) => reg,
        }
    }
}

pub type Handler = Box<dyn FnMut(&mut dyn RegisterFile) + Send>;

pub(crate) struct InstalledHandler {
    pub contract: HandlerContract,
    pub handler: Handler,
}

impl std::fmt::Debug for InstalledHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstalledHandler")
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

/// Register file view handed to interrupt handlers.
///
/// Records every access and refuses anything outside the contract: a refused
/// read returns 0, a refused write is dropped.
pub struct TrackedRegisters<'a> {
    bus: &'a mut RegisterBus,
    contract: &'a HandlerContract,
    accesses: RefCell<Vec<Access>>,
    violation: RefCell<Option<String>>,
}

impl<'a> TrackedRegisters<'a> {
    pub fn new(bus: &'a mut RegisterBus, contract: &'a HandlerContract) -> Self {
        Self {
            bus,
            contract,
            accesses: RefCell::new(Vec::new()),
            violation: RefCell::new(None),
        }
    }

    fn admit(&self, access: Access) -> bool {
        let mut accesses = self.accesses.borrow_mut();
        accesses.push(access);
        let reason = if !self.contract.allows(access.register()) {
            Some(format!("touched {} outside its allowed registers", access.register()))
        } else if accesses.len() > self.contract.max_accesses {
            Some(format!(
                "exceeded its budget of {} register accesses",
                self.contract.max_accesses
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => {
                self.violation.borrow_mut().get_or_insert(reason);
                false
            }
            None => true,
        }
    }

    /// The recorded accesses, or the first contract violation.
    pub fn finish(self) -> (Vec<Access>, Option<String>) {
        (self.accesses.into_inner(), self.violation.into_inner())
    }
}

impl RegisterFile for TrackedRegisters<'_> {
    fn read(&self, reg: Register) -> u8 {
        if self.admit(Access::Read(reg)) {
            self.bus.read(reg)
        } else {
            0
        }
    }

    fn write(&mut self, reg: Register, value: u8) {
        if self.admit(Access::Write(reg, value)) {
            self.bus.write(reg, value);
        }
    }
}
