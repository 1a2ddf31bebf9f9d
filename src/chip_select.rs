//! Truth-table chip selection for multiple devices on one SPI bus
//!
//! Instead of one dedicated chip-select line per device, the board encodes
//! the selected device as a *pattern* across a fixed set of shared GPIO
//! lines. A [`ChipSelector`] holds that pattern for exactly one logical
//! device: N line handles, the level each line must take while the device is
//! addressed, and the uniform idle level every line returns to between
//! transactions.
//!
//! The line count is a hardware constant, so it is a const generic and the
//! pins live in a plain array.

use embedded_hal::digital::{OutputPin, PinState};

/// Select-line pattern for one logical device on a shared bus
///
/// At most one profile may be asserted on a bus at any time; the transport
/// layer brackets every transaction with [`assert`](ChipSelector::assert) and
/// [`release`](ChipSelector::release) and never interleaves two transactions.
pub struct ChipSelector<P, const N: usize> {
    pins: [P; N],
    levels: [bool; N],
    idle: bool,
}

impl<P: OutputPin, const N: usize> ChipSelector<P, N> {
    /// Create a selector with the given per-line levels and an idle-high bus
    ///
    /// Idle-high matches the usual active-low chip-select convention. Use
    /// [`with_idle_level`](Self::with_idle_level) for an idle-low bus.
    pub fn new(pins: [P; N], levels: [bool; N]) -> Self {
        Self::with_idle_level(pins, levels, true)
    }

    /// Create a selector with an explicit idle level
    pub fn with_idle_level(pins: [P; N], levels: [bool; N], idle: bool) -> Self {
        Self { pins, levels, idle }
    }

    /// Drive every line to its configured level, addressing the device
    ///
    /// Must be called immediately before a bus transaction begins.
    pub fn assert(&mut self) -> Result<(), P::Error> {
        for (pin, &level) in self.pins.iter_mut().zip(self.levels.iter()) {
            pin.set_state(PinState::from(level))?;
        }
        Ok(())
    }

    /// Drive every line back to the idle level
    ///
    /// Must be called immediately after the transaction completes, on every
    /// exit path. All lines are walked even if one of them reports an error,
    /// so the bus is never left with a partial pattern; the first error is
    /// returned.
    pub fn release(&mut self) -> Result<(), P::Error> {
        let mut result = Ok(());
        for pin in &mut self.pins {
            if let Err(e) = pin.set_state(PinState::from(self.idle)) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Consume the selector and return the pin handles
    pub fn free(self) -> [P; N] {
        self.pins
    }
}
