//! Panel power-rail control
//!
//! E-paper panels need several high-voltage rails (VPOS/VNEG, VGH/VGL,
//! VCOM, V3P3) that must come up and go down in a fixed order. A PMIC
//! sequences the rails once enabled; the host owns the enable pins, the
//! per-rail enable mask and the power-good readback.

use crate::gpio::PinState;

/// Per-rail enable mask (6 rails, bits 5..0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RailMask(u8);

impl RailMask {
    /// Every rail off.
    pub const NONE: Self = Self(0);
    /// Every rail on.
    pub const ALL: Self = Self(0x3F);

    /// Build a mask; bits above the six rail bits are dropped.
    pub const fn new(bits: u8) -> Self {
        Self(bits & 0x3F)
    }

    /// Raw mask bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if no rail is enabled.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// PMIC rail control as seen by the power sequencer.
pub trait EpdRails {
    /// Error type
    type Error: core::fmt::Debug;

    /// Power-good status byte with every rail in regulation.
    const POWER_GOOD_OK: u8 = 0b1111_1010;

    /// PMIC WAKE pin (I2C interface and sequencer alive).
    fn set_wake(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// PMIC PWRUP pin (start the power-up sequence).
    fn set_power_up(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// VCOM_CTRL pin (connect the VCOM driver).
    fn set_vcom(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// Write the rail enable mask.
    fn set_rails(&mut self, mask: RailMask) -> Result<(), Self::Error>;

    /// Read the raw power-good status byte.
    fn power_good(&mut self) -> Result<u8, Self::Error>;
}

impl<T: EpdRails + ?Sized> EpdRails for &mut T {
    type Error = T::Error;

    const POWER_GOOD_OK: u8 = T::POWER_GOOD_OK;

    fn set_wake(&mut self, state: PinState) -> Result<(), Self::Error> {
        (**self).set_wake(state)
    }

    fn set_power_up(&mut self, state: PinState) -> Result<(), Self::Error> {
        (**self).set_power_up(state)
    }

    fn set_vcom(&mut self, state: PinState) -> Result<(), Self::Error> {
        (**self).set_vcom(state)
    }

    fn set_rails(&mut self, mask: RailMask) -> Result<(), Self::Error> {
        (**self).set_rails(mask)
    }

    fn power_good(&mut self) -> Result<u8, Self::Error> {
        (**self).power_good()
    }
}
