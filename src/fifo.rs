//! FIFO streaming types
//!
//! The ICM-20948 has a 512-byte hardware FIFO that accumulates sensor samples
//! as they are produced. Which channels feed it is recorded as a
//! [`FifoContent`]; the driver needs that record to interpret the byte
//! counter and to keep reads aligned to whole sample sets, because the buffer
//! fills asynchronously relative to the read cadence.

/// FIFO size in bytes
pub const FIFO_SIZE: u16 = 512;

/// Which sensor channel(s) feed the FIFO
///
/// The discriminants are the `FIFO_EN_2` enable-bit patterns: accelerometer
/// (bit 4), the three gyroscope axes (bits 3:1), or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoContent {
    /// Accelerometer samples only
    Accel = 0x10,
    /// Gyroscope samples only
    Gyro = 0x0E,
    /// Accelerometer and gyroscope samples, interleaved
    AccelGyro = 0x1E,
}

impl FifoContent {
    /// The `FIFO_EN_2` bit pattern enabling this content
    #[must_use]
    pub const fn enable_bits(self) -> u8 {
        self as u8
    }

    /// Bytes one complete sample set occupies in the FIFO
    ///
    /// Each enabled channel contributes three big-endian 16-bit words: 6
    /// bytes for a single channel, 12 for both interleaved.
    #[must_use]
    pub const fn bytes_per_set(self) -> u16 {
        match self {
            Self::Accel | Self::Gyro => 6,
            Self::AccelGyro => 12,
        }
    }

    /// Axis triples contained in one sample set
    #[must_use]
    pub const fn triples_per_set(self) -> u16 {
        self.bytes_per_set() / 6
    }

    /// Whole sample sets contained in `count` buffered bytes
    ///
    /// Remainder bytes belong to a set still being written and are not
    /// counted; [`alignment_remainder`](Self::alignment_remainder) reports
    /// how many there are.
    #[must_use]
    pub const fn sample_sets(self, count: u16) -> u16 {
        count / self.bytes_per_set()
    }

    /// Bytes past the last whole sample-set boundary in `count` buffered bytes
    #[must_use]
    pub const fn alignment_remainder(self, count: u16) -> u16 {
        count % self.bytes_per_set()
    }
}

/// FIFO operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FifoMode {
    /// Oldest data is dropped when the FIFO is full
    Continuous,
    /// The FIFO stops accepting data when full
    StopWhenFull,
}

impl FifoMode {
    /// The `FIFO_MODE` register value for this mode
    #[must_use]
    pub const fn register_value(self) -> u8 {
        match self {
            Self::Continuous => 0x00,
            Self::StopWhenFull => 0x01,
        }
    }
}
