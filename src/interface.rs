//! Bus interface for the ICM-20948
//!
//! The driver talks to the device through [`BusInterface`], a synchronous
//! full-duplex "transmit N bytes, receive N bytes" primitive.
//! [`SpiSelectInterface`] is the production implementation: an
//! `embedded-hal` [`SpiBus`] with every transaction bracketed by a
//! [`ChipSelector`] assert/release pair. Tests substitute a mock
//! implementation of the trait.

use embedded_hal::spi::SpiBus;

use crate::chip_select::ChipSelector;
use embedded_hal::digital::OutputPin;

/// Maximum transaction length in bytes (address byte included)
///
/// This is the transport's fixed transfer-buffer size. It is a hard ceiling:
/// longer transactions are a caller error, never silently chunked. With one
/// address byte per transaction the largest usable register burst is
/// `MAX_TRANSFER - 1` bytes.
pub const MAX_TRANSFER: usize = 32;

/// Synchronous full-duplex transfer primitive
pub trait BusInterface {
    /// Transport error type
    type Error;

    /// Transmit `buf` while simultaneously receiving into it
    ///
    /// Blocks until the transfer completes. `buf` must not exceed
    /// [`MAX_TRANSFER`] bytes.
    fn transfer_in_place(&mut self, buf: &mut [u8]) -> Result<(), Self::Error>;
}

/// Error from an [`SpiSelectInterface`] transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectBusError<SpiE, PinE> {
    /// The SPI transfer itself failed
    Spi(SpiE),
    /// Driving a select line failed
    Pin(PinE),
}

/// SPI bus plus truth-table chip selection
///
/// Owns the raw [`SpiBus`] and the [`ChipSelector`] addressing one device.
/// Several instances may target the same physical bus (one per device) as
/// long as their transactions never interleave; the assert/transact/release
/// sequence is the only mutual-exclusion discipline.
pub struct SpiSelectInterface<SPI, P, const N: usize> {
    spi: SPI,
    cs: ChipSelector<P, N>,
}

impl<SPI, P, const N: usize> SpiSelectInterface<SPI, P, N> {
    /// Create a new interface from a bus and a select profile
    ///
    /// The bus must already be configured (mode 0 or 3, per the datasheet);
    /// bus setup is owned by the platform HAL.
    pub fn new(spi: SPI, cs: ChipSelector<P, N>) -> Self {
        Self { spi, cs }
    }

    /// Consume the interface and return the bus and selector
    pub fn release(self) -> (SPI, ChipSelector<P, N>) {
        (self.spi, self.cs)
    }
}

impl<SPI, P, const N: usize> BusInterface for SpiSelectInterface<SPI, P, N>
where
    SPI: SpiBus<u8>,
    P: OutputPin,
{
    type Error = SelectBusError<SPI::Error, P::Error>;

    fn transfer_in_place(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        debug_assert!(buf.len() <= MAX_TRANSFER);

        if let Err(e) = self.cs.assert() {
            // Never leave a partial pattern on the shared lines.
            let _ = self.cs.release();
            return Err(SelectBusError::Pin(e));
        }

        let transfer = self
            .spi
            .transfer_in_place(buf)
            .and_then(|()| self.spi.flush())
            .map_err(SelectBusError::Spi);

        // Release on every exit path; a transfer error takes precedence over
        // a release error.
        let release = self.cs.release().map_err(SelectBusError::Pin);
        transfer.and(release)
    }
}
