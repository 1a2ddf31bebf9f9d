//! Accelerometer range and correction
//!
//! The correction layer is pure: no I/O, no driver state. The driver feeds
//! it the raw triple plus the calibration it holds (offset triple, range
//! factor, scale correction factor) and gets the corrected triple back.

use crate::triple::Triple;

/// Sensitivity at the base ±2 g range, in LSB/g
pub const ACCEL_BASE_SENSITIVITY: f32 = 16384.0;

/// Accelerometer full-scale range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AccelRange {
    /// ±2 g (most sensitive)
    G2 = 0,
    /// ±4 g
    G4 = 1,
    /// ±8 g
    G8 = 2,
    /// ±16 g (least sensitive)
    G16 = 3,
}

impl AccelRange {
    /// Range factor relative to the base ±2 g range (1, 2, 4, 8)
    ///
    /// Offsets are stored in base-range LSB and divided by this factor
    /// before being applied to a raw reading; physical-unit conversion
    /// multiplies by it.
    #[must_use]
    pub const fn range_factor(self) -> u8 {
        1 << (self as u8)
    }

    /// Sensitivity at this range, in LSB/g
    #[must_use]
    pub const fn sensitivity(self) -> f32 {
        ACCEL_BASE_SENSITIVITY / self.range_factor() as f32
    }
}

/// Apply offset and scale correction to a raw accelerometer triple
///
/// Computes `(raw - offset / range_factor) / correction_factor`. The offset
/// is a zero-g bias in base-range LSB; the scalar correction factor maps the
/// device's measured 1 g span onto the ideal one (1.0 when uncalibrated).
#[must_use]
pub fn correct_accel_raw_values(
    raw: Triple,
    offset: Triple,
    range_factor: u8,
    correction_factor: f32,
) -> Triple {
    (raw - offset / f32::from(range_factor)) / correction_factor
}
