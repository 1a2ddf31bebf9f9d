//! Power management and duty-cycle modes
//!
//! Besides sleep, the ICM-20948 supports duty-cycled operation where
//! individual sensors wake periodically instead of sampling continuously,
//! trading bandwidth for power. Cycle selection lives in `LP_CONFIG`; the
//! per-sensor sample averaging used while cycling lives in the bank-2
//! configuration registers.

/// Duty-cycle selection (`LP_CONFIG` bit patterns)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleMode {
    /// Continuous operation, no duty cycling
    NoCycle = 0x00,
    /// Duty-cycle the gyroscope
    GyroCycle = 0x10,
    /// Duty-cycle the accelerometer
    AccelCycle = 0x20,
    /// Duty-cycle accelerometer and gyroscope
    AccelGyroCycle = 0x30,
    /// Duty-cycle accelerometer, gyroscope and I2C master
    AccelGyroI2cMstCycle = 0x70,
}

/// Gyroscope sample averaging in duty-cycled mode (`GYRO_CONFIG_2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GyroAvgLowPower {
    /// 1x averaging
    Avg1 = 0,
    /// 2x averaging
    Avg2 = 1,
    /// 4x averaging
    Avg4 = 2,
    /// 8x averaging
    Avg8 = 3,
    /// 16x averaging
    Avg16 = 4,
    /// 32x averaging
    Avg32 = 5,
    /// 64x averaging
    Avg64 = 6,
    /// 128x averaging
    Avg128 = 7,
}

impl GyroAvgLowPower {
    /// Number of samples averaged per output
    #[must_use]
    pub const fn samples(self) -> u16 {
        1 << (self as u16)
    }
}

/// Accelerometer sample averaging in duty-cycled mode (`ACCEL_CONFIG_2`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelAvgLowPower {
    /// 4x averaging
    Avg4 = 0,
    /// 8x averaging
    Avg8 = 1,
    /// 16x averaging
    Avg16 = 2,
    /// 32x averaging
    Avg32 = 3,
}

impl AccelAvgLowPower {
    /// Number of samples averaged per output
    #[must_use]
    pub const fn samples(self) -> u16 {
        4 << (self as u16)
    }
}
