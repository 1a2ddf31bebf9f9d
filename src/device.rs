//! High-level driver API for the ICM-20948
//!
//! [`Icm20948Driver`] implements the register-bank transaction protocol on
//! top of a [`BusInterface`]: it tracks which of the four register banks is
//! currently selected (switching only when an access targets a different
//! bank), brackets every access in a single chip-select transaction, and
//! layers the AK09916 relay, FIFO streaming and raw-value correction on top
//! of that primitive.
//!
//! All operations are synchronous and blocking. A transport failure aborts
//! the calling operation; the driver never retries internally, so callers
//! own the recovery policy.

use embedded_hal::delay::DelayNs;

use crate::fifo::{FifoContent, FifoMode};
use crate::interface::{BusInterface, MAX_TRANSFER};
use crate::power::{AccelAvgLowPower, CycleMode, GyroAvgLowPower};
use crate::registers::{Reg, ak09916, bank0, bank2, bank3, bits, REG_BANK_SEL};
use crate::sensors::accelerometer::{ACCEL_BASE_SENSITIVITY, AccelRange, correct_accel_raw_values};
use crate::sensors::gyroscope::{GYRO_BASE_SENSITIVITY, GyroRange, correct_gyro_raw_values};
use crate::sensors::magnetometer::{MAG_LSB_UT, MagMode};
use crate::sensors::Dlpf;
use crate::triple::Triple;
use crate::{AK09916_WHO_AM_I, AK09916_WHO_AM_I_ALT, Bank, Error, WHO_AM_I_VALUE};

/// Delay after a device or magnetometer mode change, in milliseconds
const RESET_DELAY_MS: u32 = 10;

/// Delay after an AK09916 soft reset, in milliseconds
const MAG_RESET_DELAY_MS: u32 = 100;

/// Settle delay between programming a relayed read and the result being
/// valid in the staging registers, in milliseconds
///
/// The I2C master refreshes the staging registers at its own cadence,
/// asynchronously to SPI transactions; reading back sooner returns stale or
/// zero data. The value matches the relay refresh period at the configured
/// master ODR.
pub const MAG_SETTLE_MS: u32 = 10;

/// Samples averaged by [`Icm20948Driver::auto_offsets`]
const AUTO_OFFSET_SAMPLES: u16 = 50;

/// Interval between auto-offset samples, in milliseconds
const AUTO_OFFSET_INTERVAL_MS: u32 = 10;

/// Temperature sensitivity, in LSB/°C
const T_SENSITIVITY: f32 = 333.87;

/// Temperature offset at 21 °C, in LSB
const ROOM_TEMP_OFFSET: f32 = 0.0;

/// Main driver for one ICM-20948 on the multiplexed bus
///
/// Owns the bus interface (and through it the chip-select profile addressing
/// this device), a delay provider, and all per-device mutable state: the
/// bank cursor, calibration, and the recorded FIFO content type. One driver
/// instance must be owned by a single logical task; the crate provides no
/// internal synchronization.
pub struct Icm20948Driver<I, D> {
    interface: I,
    delay: D,
    /// Currently selected register bank; `None` until the first explicit
    /// selection, since the bank state is undefined at power-up.
    current_bank: Option<Bank>,
    accel_offset: Triple,
    gyro_offset: Triple,
    accel_range_factor: u8,
    gyro_range_factor: u8,
    accel_corr_factor: f32,
    fifo_content: Option<FifoContent>,
}

impl<I, D> Icm20948Driver<I, D>
where
    I: BusInterface,
    D: DelayNs,
{
    /// Create a new driver instance and verify the device identity
    ///
    /// Performs the first explicit bank selection and checks `WHO_AM_I`.
    /// Call [`init`](Self::init) afterwards to reset and wake the device.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDevice`] with the actual ID byte when the
    /// device at this select profile is not an ICM-20948, or [`Error::Bus`]
    /// when communication fails. An identity mismatch points at a wiring or
    /// select-profile problem and is safe to retry after fixing it.
    pub fn new(interface: I, delay: D) -> Result<Self, Error<I::Error>> {
        let mut driver = Self {
            interface,
            delay,
            current_bank: None,
            accel_offset: Triple::ZERO,
            gyro_offset: Triple::ZERO,
            accel_range_factor: 1,
            gyro_range_factor: 1,
            accel_corr_factor: 1.0,
            fifo_content: None,
        };

        driver.select_bank(Bank::Bank0)?;
        let who_am_i = driver.who_am_i()?;
        if who_am_i != WHO_AM_I_VALUE {
            return Err(Error::InvalidDevice(who_am_i));
        }

        Ok(driver)
    }

    /// Consume the driver and return the interface and delay provider
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }

    /// Reset the device, wake it, and select the auto clock source
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn init(&mut self) -> Result<(), Error<I::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("resetting and waking ICM-20948");

        self.reset()?;
        self.sleep(false)?;
        self.set_clock_to_auto_select()?;
        self.write_register(bank2::ODR_ALIGN_EN, 0x01)?;
        Ok(())
    }

    /// Read the `WHO_AM_I` register (0xEA on a genuine part)
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn who_am_i(&mut self) -> Result<u8, Error<I::Error>> {
        self.read_register(bank0::WHO_AM_I)
    }

    // ---------------------------------------------------------------- //
    // Register-bank transceiver core

    /// Select a register bank
    ///
    /// No-op when the cursor already points at `bank`; otherwise issues one
    /// write of the bank number (high nibble) to `REG_BANK_SEL` and updates
    /// the cursor. Every register access goes through this, so callers only
    /// pay for switches when crossing banks.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails; the cursor
    /// is left unchanged in that case.
    pub fn select_bank(&mut self, bank: Bank) -> Result<(), Error<I::Error>> {
        if self.current_bank == Some(bank) {
            return Ok(());
        }

        let mut frame = [REG_BANK_SEL & !bits::READ, (bank as u8) << 4];
        self.interface.transfer_in_place(&mut frame)?;
        self.current_bank = Some(bank);
        Ok(())
    }

    /// Write consecutive registers starting at `reg`
    ///
    /// Ensures the register's bank is selected, then performs one
    /// chip-select-bracketed transaction of the register address followed by
    /// `data`. On return `data` holds the bytes simultaneously shifted in on
    /// the return channel (the full-duplex echo); most callers ignore it.
    ///
    /// `data` must fit in one transaction: at most [`MAX_TRANSFER`]` - 1`
    /// bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_registers(&mut self, reg: Reg, data: &mut [u8]) -> Result<(), Error<I::Error>> {
        debug_assert!(data.len() < MAX_TRANSFER);

        self.select_bank(reg.bank)?;

        let len = data.len();
        let mut frame = [0u8; MAX_TRANSFER];
        frame[0] = reg.addr & !bits::READ;
        frame[1..=len].copy_from_slice(data);

        self.interface.transfer_in_place(&mut frame[..=len])?;
        data.copy_from_slice(&frame[1..=len]);
        Ok(())
    }

    /// Write a single register, returning the full-duplex echo byte
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_register(&mut self, reg: Reg, value: u8) -> Result<u8, Error<I::Error>> {
        let mut data = [value];
        self.write_registers(reg, &mut data)?;
        Ok(data[0])
    }

    /// Read consecutive registers starting at `reg` into `buf`
    ///
    /// Ensures the register's bank is selected, then performs one
    /// transaction of the read-flagged address followed by `buf.len()` dummy
    /// bytes; the received bytes land in `buf`.
    ///
    /// `buf` must fit in one transaction: at most [`MAX_TRANSFER`]` - 1`
    /// bytes. Longer reads are a caller error, never chunked.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_registers(&mut self, reg: Reg, buf: &mut [u8]) -> Result<(), Error<I::Error>> {
        debug_assert!(buf.len() < MAX_TRANSFER);

        self.select_bank(reg.bank)?;

        let len = buf.len();
        let mut frame = [0u8; MAX_TRANSFER];
        frame[0] = reg.addr | bits::READ;

        self.interface.transfer_in_place(&mut frame[..=len])?;
        buf.copy_from_slice(&frame[1..=len]);
        Ok(())
    }

    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_register(&mut self, reg: Reg) -> Result<u8, Error<I::Error>> {
        let mut buf = [0u8];
        self.read_registers(reg, &mut buf)?;
        Ok(buf[0])
    }

    fn modify_register<F>(&mut self, reg: Reg, f: F) -> Result<(), Error<I::Error>>
    where
        F: FnOnce(u8) -> u8,
    {
        let value = self.read_register(reg)?;
        self.write_register(reg, f(value))?;
        Ok(())
    }

    /// Read three big-endian 16-bit words starting at `reg`
    fn read_triple_be(&mut self, reg: Reg) -> Result<Triple, Error<I::Error>> {
        let mut buf = [0u8; 6];
        self.read_registers(reg, &mut buf)?;
        Ok(Triple::from_raw(
            i16::from_be_bytes([buf[0], buf[1]]),
            i16::from_be_bytes([buf[2], buf[3]]),
            i16::from_be_bytes([buf[4], buf[5]]),
        ))
    }

    // ---------------------------------------------------------------- //
    // Power, sleep, duty cycling

    /// Soft-reset the device
    ///
    /// The part reverts to bank 0 and default configuration; the bank cursor
    /// is forgotten so the next access re-selects explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn reset(&mut self) -> Result<(), Error<I::Error>> {
        self.write_register(bank0::PWR_MGMT_1, bits::RESET)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        self.current_bank = None;
        Ok(())
    }

    /// Enter or leave sleep mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn sleep(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::PWR_MGMT_1, |v| {
            if enable { v | bits::SLEEP } else { v & !bits::SLEEP }
        })
    }

    /// Let the device pick the best available clock source
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_clock_to_auto_select(&mut self) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::PWR_MGMT_1, |v| v | bits::CLKSEL_AUTO)?;
        self.delay.delay_ms(RESET_DELAY_MS);
        Ok(())
    }

    /// Enable or disable low-power mode for the duty-cycled sensors
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_low_power(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::PWR_MGMT_1, |v| {
            if enable { v | bits::LP_EN } else { v & !bits::LP_EN }
        })
    }

    /// Select which sensors run duty-cycled
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_cycle(&mut self, cycle: CycleMode) -> Result<(), Error<I::Error>> {
        self.write_register(bank0::LP_CONFIG, cycle as u8)?;
        Ok(())
    }

    /// Set gyroscope sample averaging for duty-cycled mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_gyro_average_in_cycle_mode(
        &mut self,
        avg: GyroAvgLowPower,
    ) -> Result<(), Error<I::Error>> {
        self.write_register(bank2::GYRO_CONFIG_2, avg as u8)?;
        Ok(())
    }

    /// Set accelerometer sample averaging for duty-cycled mode
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_accel_average_in_cycle_mode(
        &mut self,
        avg: AccelAvgLowPower,
    ) -> Result<(), Error<I::Error>> {
        self.write_register(bank2::ACCEL_CONFIG_2, avg as u8)?;
        Ok(())
    }

    // ---------------------------------------------------------------- //
    // Accelerometer configuration

    /// Enable or disable the accelerometer
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_accel(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        // PWR_MGMT_2 bits are *disables*
        self.modify_register(bank0::PWR_MGMT_2, |v| {
            if enable { v & !bits::ACC_EN } else { v | bits::ACC_EN }
        })
    }

    /// Set the accelerometer full-scale range
    ///
    /// Also updates the range factor the correction layer divides stored
    /// offsets by.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_accel_range(&mut self, range: AccelRange) -> Result<(), Error<I::Error>> {
        self.modify_register(bank2::ACCEL_CONFIG, |v| {
            (v & !0x06) | ((range as u8) << 1)
        })?;
        self.accel_range_factor = range.range_factor();
        Ok(())
    }

    /// Set the accelerometer digital low-pass filter
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_accel_dlpf(&mut self, dlpf: Dlpf) -> Result<(), Error<I::Error>> {
        self.modify_register(bank2::ACCEL_CONFIG, |v| match dlpf {
            Dlpf::Off => v & !0x01,
            _ => ((v | 0x01) & 0xC7) | ((dlpf as u8) << 3),
        })
    }

    /// Set the accelerometer sample-rate divider (12-bit)
    ///
    /// Output rate = 1.125 kHz / (1 + divider).
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_accel_sample_rate_divider(&mut self, divider: u16) -> Result<(), Error<I::Error>> {
        let [high, low] = divider.to_be_bytes();
        let mut data = [high & 0x0F, low];
        self.write_registers(bank2::ACCEL_SMPLRT_DIV_1, &mut data)
    }

    // ---------------------------------------------------------------- //
    // Gyroscope configuration

    /// Enable or disable the gyroscope
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_gyro(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::PWR_MGMT_2, |v| {
            if enable { v & !bits::GYR_EN } else { v | bits::GYR_EN }
        })
    }

    /// Set the gyroscope full-scale range
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_gyro_range(&mut self, range: GyroRange) -> Result<(), Error<I::Error>> {
        self.modify_register(bank2::GYRO_CONFIG_1, |v| {
            (v & !0x06) | ((range as u8) << 1)
        })?;
        self.gyro_range_factor = range.range_factor();
        Ok(())
    }

    /// Set the gyroscope digital low-pass filter
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_gyro_dlpf(&mut self, dlpf: Dlpf) -> Result<(), Error<I::Error>> {
        self.modify_register(bank2::GYRO_CONFIG_1, |v| match dlpf {
            Dlpf::Off => v & !0x01,
            _ => ((v | 0x01) & 0xC7) | ((dlpf as u8) << 3),
        })
    }

    /// Set the gyroscope sample-rate divider
    ///
    /// Output rate = 1.1 kHz / (1 + divider).
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_gyro_sample_rate_divider(&mut self, divider: u8) -> Result<(), Error<I::Error>> {
        self.write_register(bank2::GYRO_SMPLRT_DIV, divider)?;
        Ok(())
    }

    /// Set the temperature sensor low-pass filter
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for [`Dlpf::Off`] (the temperature
    /// path has no bypass), or an error if communication fails.
    pub fn set_temp_dlpf(&mut self, dlpf: Dlpf) -> Result<(), Error<I::Error>> {
        if dlpf == Dlpf::Off {
            return Err(Error::InvalidConfig);
        }
        self.write_register(bank2::TEMP_CONFIG, dlpf as u8)?;
        Ok(())
    }

    // ---------------------------------------------------------------- //
    // Calibration

    /// Measure and store zero offsets, assuming the device is stationary
    ///
    /// Averages 50 readings of both sensors, subtracts
    /// the 1 g the resting z-axis is expected to see, and stores the result
    /// as the new offsets (resetting the accelerometer correction factor to
    /// 1.0). Run this at the default ±2 g / ±250 °/s ranges, with the device
    /// flat and still.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn auto_offsets(&mut self) -> Result<(), Error<I::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("averaging {} samples for zero offsets", AUTO_OFFSET_SAMPLES);

        self.accel_offset = Triple::ZERO;
        self.gyro_offset = Triple::ZERO;
        self.accel_corr_factor = 1.0;

        let mut accel_sum = Triple::ZERO;
        let mut gyro_sum = Triple::ZERO;
        for _ in 0..AUTO_OFFSET_SAMPLES {
            accel_sum += self.accel_raw_values()?;
            gyro_sum += self.gyro_raw_values()?;
            self.delay.delay_ms(AUTO_OFFSET_INTERVAL_MS);
        }
        accel_sum /= f32::from(AUTO_OFFSET_SAMPLES);
        gyro_sum /= f32::from(AUTO_OFFSET_SAMPLES);

        // A stationary device reads 1 g on z; that part is signal, not bias.
        accel_sum.z -= ACCEL_BASE_SENSITIVITY;

        self.accel_offset = accel_sum;
        self.gyro_offset = gyro_sum;
        Ok(())
    }

    /// Store accelerometer offsets from a min/max sweep
    ///
    /// `min` and `max` are the raw extremes captured while slowly rotating
    /// each axis through ±1 g at the default ±2 g range. The midpoint
    /// becomes the zero-g bias; the average measured span sets the scale
    /// correction factor.
    pub fn set_accel_offsets(&mut self, min: Triple, max: Triple) {
        self.accel_offset = (min + max) * 0.5;
        self.accel_corr_factor =
            ((max.x - min.x) + (max.y - min.y) + (max.z - min.z)) / 3.0 / 32768.0;
    }

    /// Store gyroscope zero-rate offsets directly
    pub fn set_gyro_offsets(&mut self, offset: Triple) {
        self.gyro_offset = offset;
    }

    /// Currently stored accelerometer offsets (base-range LSB)
    #[must_use]
    pub const fn accel_offsets(&self) -> Triple {
        self.accel_offset
    }

    /// Currently stored gyroscope offsets (base-range LSB)
    #[must_use]
    pub const fn gyro_offsets(&self) -> Triple {
        self.gyro_offset
    }

    // ---------------------------------------------------------------- //
    // Sensor data

    /// Read the raw accelerometer triple
    ///
    /// One 6-byte burst; values are big-endian 16-bit, H register first.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn accel_raw_values(&mut self) -> Result<Triple, Error<I::Error>> {
        self.read_triple_be(bank0::ACCEL_OUT)
    }

    /// Read the accelerometer with offset and scale correction applied
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn corrected_accel_raw_values(&mut self) -> Result<Triple, Error<I::Error>> {
        let raw = self.accel_raw_values()?;
        Ok(correct_accel_raw_values(
            raw,
            self.accel_offset,
            self.accel_range_factor,
            self.accel_corr_factor,
        ))
    }

    /// Read the acceleration in g
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn g_values(&mut self) -> Result<Triple, Error<I::Error>> {
        let corrected = self.corrected_accel_raw_values()?;
        Ok(corrected * f32::from(self.accel_range_factor) / ACCEL_BASE_SENSITIVITY)
    }

    /// Magnitude of an acceleration triple, in g
    #[must_use]
    pub fn resultant_g(g_values: Triple) -> f32 {
        g_values.magnitude()
    }

    /// Read the raw gyroscope triple
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn gyro_raw_values(&mut self) -> Result<Triple, Error<I::Error>> {
        self.read_triple_be(bank0::GYRO_OUT)
    }

    /// Read the gyroscope with zero-rate correction applied
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn corrected_gyro_raw_values(&mut self) -> Result<Triple, Error<I::Error>> {
        let raw = self.gyro_raw_values()?;
        Ok(correct_gyro_raw_values(
            raw,
            self.gyro_offset,
            self.gyro_range_factor,
        ))
    }

    /// Read the angular rate in °/s
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn gyro_dps_values(&mut self) -> Result<Triple, Error<I::Error>> {
        let corrected = self.corrected_gyro_raw_values()?;
        Ok(corrected * f32::from(self.gyro_range_factor) / GYRO_BASE_SENSITIVITY)
    }

    /// Read the die temperature in °C
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn temperature(&mut self) -> Result<f32, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.read_registers(bank0::TEMP_OUT, &mut buf)?;
        let raw = i16::from_be_bytes(buf);
        Ok((f32::from(raw) - ROOM_TEMP_OFFSET) / T_SENSITIVITY + 21.0)
    }

    /// Read the magnetic field in µT
    ///
    /// Reads the staging window the relay keeps refreshed while the
    /// magnetometer is in a continuous mode (see
    /// [`set_mag_op_mode`](Self::set_mag_op_mode)). AK09916 words are
    /// little-endian, L register first.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn mag_values(&mut self) -> Result<Triple, Error<I::Error>> {
        let mut buf = [0u8; 6];
        self.read_registers(bank0::EXT_SLV_SENS_DATA_00, &mut buf)?;
        let raw = Triple::from_raw(
            i16::from_le_bytes([buf[0], buf[1]]),
            i16::from_le_bytes([buf[2], buf[3]]),
            i16::from_le_bytes([buf[4], buf[5]]),
        );
        Ok(raw * MAG_LSB_UT)
    }

    // ---------------------------------------------------------------- //
    // FIFO streaming

    /// Route the FIFO through `USER_CTRL`
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_fifo(&mut self, enable: bool) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::USER_CTRL, |v| {
            if enable { v | bits::FIFO_EN } else { v & !bits::FIFO_EN }
        })
    }

    /// Set the FIFO full-buffer behavior
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_fifo_mode(&mut self, mode: FifoMode) -> Result<(), Error<I::Error>> {
        self.write_register(bank0::FIFO_MODE, mode.register_value())?;
        Ok(())
    }

    /// Start streaming the given channel(s) into the FIFO
    ///
    /// Records the content type; every byte-count interpretation afterwards
    /// uses it. Changing content without [`reset_fifo`](Self::reset_fifo)
    /// leaves previously buffered bytes misaligned — that is the caller's
    /// responsibility to avoid.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn start_fifo(&mut self, content: FifoContent) -> Result<(), Error<I::Error>> {
        self.fifo_content = Some(content);
        self.write_register(bank0::FIFO_EN_2, content.enable_bits())?;
        Ok(())
    }

    /// Stop streaming into the FIFO
    ///
    /// The recorded content type is kept (stale) so already-buffered data
    /// can still be drained and interpreted.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn stop_fifo(&mut self) -> Result<(), Error<I::Error>> {
        self.write_register(bank0::FIFO_EN_2, 0x00)?;
        Ok(())
    }

    /// Empty the hardware FIFO by pulsing its reset bits
    ///
    /// Does not alter the recorded content type.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn reset_fifo(&mut self) -> Result<(), Error<I::Error>> {
        self.write_register(bank0::FIFO_RST, 0x1F)?;
        self.write_register(bank0::FIFO_RST, 0x00)?;
        Ok(())
    }

    /// The content type recorded by the last [`start_fifo`](Self::start_fifo)
    #[must_use]
    pub const fn fifo_content(&self) -> Option<FifoContent> {
        self.fifo_content
    }

    /// Number of bytes currently buffered in the FIFO
    ///
    /// The 13-bit counter spans two registers, high byte first.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn fifo_count(&mut self) -> Result<u16, Error<I::Error>> {
        let mut buf = [0u8; 2];
        self.read_registers(bank0::FIFO_COUNT, &mut buf)?;
        Ok(u16::from_be_bytes([buf[0] & 0x1F, buf[1]]))
    }

    /// Number of whole sample sets currently buffered
    ///
    /// Remainder bytes past the last set boundary are not counted.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no content type has been
    /// recorded, or an error if communication fails.
    pub fn fifo_sample_sets(&mut self) -> Result<u16, Error<I::Error>> {
        let content = self.fifo_content.ok_or(Error::InvalidConfig)?;
        let count = self.fifo_count()?;
        Ok(content.sample_sets(count))
    }

    /// Drain stray bytes so the next read starts on a sample-set boundary
    ///
    /// The FIFO fills asynchronously relative to the read cadence, so the
    /// byte count rarely lands on a set boundary; this performs dummy
    /// single-byte reads for the `count % set_size` leftover.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no content type has been
    /// recorded, or an error if communication fails.
    pub fn align_fifo(&mut self) -> Result<(), Error<I::Error>> {
        let content = self.fifo_content.ok_or(Error::InvalidConfig)?;
        let count = self.fifo_count()?;
        for _ in 0..content.alignment_remainder(count) {
            self.read_register(bank0::FIFO_R_W)?;
        }
        Ok(())
    }

    /// Read one axis triple from the FIFO
    ///
    /// One 6-byte transaction against the FIFO port, reassembled as three
    /// big-endian 16-bit words. Content-type-agnostic: for interleaved
    /// content the caller must know which half of the 12-byte set this call
    /// consumes, and must have aligned first (see
    /// [`align_fifo`](Self::align_fifo)).
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_fifo_triple(&mut self) -> Result<Triple, Error<I::Error>> {
        self.read_triple_be(bank0::FIFO_R_W)
    }

    /// Read the next buffered acceleration sample from the FIFO, in g
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn g_values_from_fifo(&mut self) -> Result<Triple, Error<I::Error>> {
        let raw = self.read_fifo_triple()?;
        let corrected = correct_accel_raw_values(
            raw,
            self.accel_offset,
            self.accel_range_factor,
            self.accel_corr_factor,
        );
        Ok(corrected * f32::from(self.accel_range_factor) / ACCEL_BASE_SENSITIVITY)
    }

    /// Read the next buffered angular-rate sample from the FIFO, in °/s
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn gyro_dps_values_from_fifo(&mut self) -> Result<Triple, Error<I::Error>> {
        let raw = self.read_fifo_triple()?;
        let corrected = correct_gyro_raw_values(raw, self.gyro_offset, self.gyro_range_factor);
        Ok(corrected * f32::from(self.gyro_range_factor) / GYRO_BASE_SENSITIVITY)
    }

    /// Drain every whole buffered sample set as raw triples
    ///
    /// Reads `sample_sets * triples_per_set` triples; for interleaved
    /// content they alternate accelerometer, gyroscope. The caller should
    /// have aligned first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if no content type has been
    /// recorded, [`Error::FifoOverflow`] if more triples are buffered than
    /// fit in `N`, or an error if communication fails.
    pub fn read_fifo_triples<const N: usize>(
        &mut self,
    ) -> Result<heapless::Vec<Triple, N>, Error<I::Error>> {
        let content = self.fifo_content.ok_or(Error::InvalidConfig)?;
        let sets = content.sample_sets(self.fifo_count()?);

        let mut out = heapless::Vec::new();
        for _ in 0..sets * content.triples_per_set() {
            let triple = self.read_fifo_triple()?;
            out.push(triple).map_err(|_| Error::FifoOverflow)?;
        }
        Ok(out)
    }

    // ---------------------------------------------------------------- //
    // AK09916 magnetometer relay

    /// Read the AK09916 identification word
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    #[allow(clippy::cast_sign_loss)]
    pub fn mag_who_am_i(&mut self) -> Result<u16, Error<I::Error>> {
        Ok(self.read_mag_register16(ak09916::WIA_1)? as u16)
    }

    /// Initialize the AK09916 behind the I2C master relay
    ///
    /// Resets the magnetometer and the device, wakes it, starts the I2C
    /// master, verifies the magnetometer identity, and enters continuous
    /// 100 Hz measurement with the staging window streaming HXL..STATUS_2.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidMagDevice`] with the actual ID word when the
    /// relay does not reach an AK09916 (recoverable: a wiring or addressing
    /// problem), or [`Error::Bus`] when communication fails.
    pub fn init_magnetometer(&mut self) -> Result<(), Error<I::Error>> {
        #[cfg(feature = "defmt")]
        defmt::debug!("initializing AK09916 relay");

        self.enable_i2c_master()?;
        self.reset_mag()?;
        self.reset()?;
        self.sleep(false)?;
        self.write_register(bank2::ODR_ALIGN_EN, 0x01)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        // Reset cleared USER_CTRL; the relay needs the master running again.
        self.enable_i2c_master()?;

        let who_am_i = self.mag_who_am_i()?;
        if who_am_i != AK09916_WHO_AM_I && who_am_i != AK09916_WHO_AM_I_ALT {
            return Err(Error::InvalidMagDevice(who_am_i));
        }

        self.set_mag_op_mode(MagMode::Continuous100Hz)
    }

    /// Set the AK09916 operating mode
    ///
    /// For any mode other than power-down, the staging window is programmed
    /// to continuously stream the measurement registers so
    /// [`mag_values`](Self::mag_values) stays a plain bank-0 read.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn set_mag_op_mode(&mut self, mode: MagMode) -> Result<(), Error<I::Error>> {
        self.write_mag_register(ak09916::CNTL_2, mode as u8)?;
        self.delay.delay_ms(RESET_DELAY_MS);

        if mode != MagMode::PowerDown {
            // HXL through STATUS_2; reading STATUS_2 ends each measurement.
            self.enable_mag_data_read(ak09916::HXL, 0x08)?;
        }
        Ok(())
    }

    /// Soft-reset the AK09916
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn reset_mag(&mut self) -> Result<(), Error<I::Error>> {
        self.write_mag_register(ak09916::CNTL_3, 0x01)?;
        self.delay.delay_ms(MAG_RESET_DELAY_MS);
        Ok(())
    }

    /// Start the on-chip I2C master used by the relay
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn enable_i2c_master(&mut self) -> Result<(), Error<I::Error>> {
        self.modify_register(bank0::USER_CTRL, |v| v | bits::I2C_MST_EN)?;
        // 345.6 kHz master clock, the datasheet-recommended rate for the
        // AK09916.
        self.write_register(bank3::I2C_MST_CTRL, 0x07)?;
        Ok(())
    }

    /// Write one AK09916 register through the relay
    ///
    /// Programs the bank-3 slave-0 address (write direction), target
    /// register and data-out registers; the master performs the relayed
    /// write at its next refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn write_mag_register(&mut self, reg: u8, value: u8) -> Result<(), Error<I::Error>> {
        self.write_register(bank3::I2C_SLV0_ADDR, ak09916::ADDRESS)?;
        self.write_register(bank3::I2C_SLV0_REG, reg)?;
        self.write_register(bank3::I2C_SLV0_DO, value)?;
        Ok(())
    }

    /// Read one AK09916 register through the relay
    ///
    /// Programs the relayed read, waits [`MAG_SETTLE_MS`], retrieves the
    /// byte from the bank-0 staging register, then restores the continuous
    /// measurement window.
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_mag_register8(&mut self, reg: u8) -> Result<u8, Error<I::Error>> {
        self.enable_mag_data_read(reg, 0x01)?;
        let value = self.read_register(bank0::EXT_SLV_SENS_DATA_00)?;
        self.enable_mag_data_read(ak09916::HXL, 0x08)?;
        Ok(value)
    }

    /// Read a 16-bit AK09916 register pair through the relay
    ///
    /// Same two-phase sequence as [`read_mag_register8`](Self::read_mag_register8);
    /// the word assembles little-endian (the AK09916 register file places
    /// the low byte at the lower address).
    ///
    /// # Errors
    ///
    /// Returns an error if communication with the device fails.
    pub fn read_mag_register16(&mut self, reg: u8) -> Result<i16, Error<I::Error>> {
        self.enable_mag_data_read(reg, 0x02)?;
        let mut buf = [0u8; 2];
        self.read_registers(bank0::EXT_SLV_SENS_DATA_00, &mut buf)?;
        self.enable_mag_data_read(ak09916::HXL, 0x08)?;
        Ok(i16::from_le_bytes(buf))
    }

    /// Program the relay to stream `count` bytes starting at `reg` into the
    /// staging registers
    ///
    /// The staging data is only valid once the settle delay has elapsed;
    /// this function always waits it out before returning.
    fn enable_mag_data_read(&mut self, reg: u8, count: u8) -> Result<(), Error<I::Error>> {
        self.write_register(bank3::I2C_SLV0_ADDR, ak09916::ADDRESS | bits::AK09916_READ)?;
        self.write_register(bank3::I2C_SLV0_REG, reg)?;
        self.write_register(bank3::I2C_SLV0_CTRL, bits::SLV0_EN | count)?;

        self.delay.delay_ms(MAG_SETTLE_MS);
        Ok(())
    }
}
