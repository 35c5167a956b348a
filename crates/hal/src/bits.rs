//! Bit definitions for the control registers the demos touch.

use bitflags::bitflags;

bitflags! {
    /// External Interrupt Control Register A.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Eicra: u8 {
        const ISC00 = 1 << 0;
        const ISC01 = 1 << 1;
        const ISC10 = 1 << 2;
        const ISC11 = 1 << 3;
    }
}

bitflags! {
    /// External Interrupt Mask Register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Eimsk: u8 {
        const INT0 = 1 << 0;
        const INT1 = 1 << 1;
    }
}

bitflags! {
    /// External Interrupt Flag Register (write one to clear).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Eifr: u8 {
        const INTF0 = 1 << 0;
        const INTF1 = 1 << 1;
    }
}

bitflags! {
    /// Sleep Mode Control Register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Smcr: u8 {
        const SE = 1 << 0;
        const SM0 = 1 << 1;
        const SM1 = 1 << 2;
        const SM2 = 1 << 3;
    }
}

impl Smcr {
    pub const SM_MASK: Smcr = Smcr::SM0.union(Smcr::SM1).union(Smcr::SM2);
}

bitflags! {
    /// Status register. Only the global interrupt flag matters here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sreg: u8 {
        const I = 1 << 7;
    }
}

/// Bit index of `SMCR.SE`.
pub const SMCR_SE: u8 = 0;
