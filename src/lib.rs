#![no_std]
#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod chip_select;
pub mod device;
pub mod fifo;
pub mod interface;
pub mod power;
pub mod registers;
pub mod sensors;
pub mod triple;

// Re-export main types
pub use chip_select::ChipSelector;
pub use device::Icm20948Driver;
pub use fifo::{FIFO_SIZE, FifoContent, FifoMode};
pub use interface::{BusInterface, MAX_TRANSFER, SelectBusError, SpiSelectInterface};
pub use power::{AccelAvgLowPower, CycleMode, GyroAvgLowPower};
pub use sensors::{AccelRange, Dlpf, GyroRange, MagMode};
pub use triple::Triple;

/// Expected value of the `WHO_AM_I` register
pub const WHO_AM_I_VALUE: u8 = 0xEA;

/// AK09916 identification word (company ID 0x48, device ID 0x09)
///
/// The two ID bytes are relayed through the I2C master and can be captured in
/// either order depending on which byte lands first in the staging window, so
/// both this value and [`AK09916_WHO_AM_I_ALT`] identify a genuine AK09916.
pub const AK09916_WHO_AM_I: u16 = 0x4809;

/// AK09916 identification word with the bytes in the opposite capture order
pub const AK09916_WHO_AM_I_ALT: u16 = 0x0948;

/// Register bank identifiers
///
/// The ICM-20948 exposes its registers in four banks; only one bank is
/// address-visible at a time, selected through `REG_BANK_SEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    /// Bank 0 - Primary configuration and sensor data registers
    Bank0 = 0,
    /// Bank 1 - Self-test and offset trim
    Bank1 = 1,
    /// Bank 2 - Gyroscope and accelerometer configuration
    Bank2 = 2,
    /// Bank 3 - I2C master configuration
    Bank3 = 3,
}

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Communication error on the underlying bus
    Bus(E),
    /// Invalid `WHO_AM_I` register value (contains the actual value read)
    InvalidDevice(u8),
    /// Invalid AK09916 identification word (contains the actual value read)
    InvalidMagDevice(u16),
    /// Invalid configuration parameter
    InvalidConfig,
    /// More FIFO sample sets available than fit in the output vector
    FifoOverflow,
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}
