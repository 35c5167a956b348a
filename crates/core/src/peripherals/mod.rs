pub mod exint;
pub mod gpio;
pub mod sleep;

pub use exint::ExternalInterrupts;
pub use gpio::GpioPort;
pub use sleep::SleepController;
