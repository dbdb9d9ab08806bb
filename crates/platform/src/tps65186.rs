//! TPS65186 e-paper PMIC adapter.
//!
//! Reference: Texas Instruments TPS65185/TPS65186 datasheet (SLVSAQ8)
//!
//! The PMIC is controlled by three GPIOs (WAKE, PWRUP, VCOM_CTRL) plus an
//! I2C register file. [`Tps65186`] implements [`EpdRails`] so the refresh
//! engine's power sequencer can drive it, and adds the VCOM and thermistor
//! accessors a board bring-up needs.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::I2c;

use crate::gpio::PinState;
use crate::power::{EpdRails, RailMask};

/// 7-bit I2C device address.
pub const TPS65186_I2C_ADDR: u8 = 0x48;
/// Thermistor readout, signed °C.
pub const REG_TMST_VALUE: u8 = 0x00;
/// Rail enable (ACTIVE, STANDBY, V3P3, VCOM, VDDH, VPOS, VEE, VNEG).
pub const REG_ENABLE: u8 = 0x01;
/// VPOS/VNEG voltage adjust.
pub const REG_VADJ: u8 = 0x02;
/// VCOM voltage bits 7..0.
pub const REG_VCOM1: u8 = 0x03;
/// VCOM voltage bit 8, EEPROM program, hi-Z.
pub const REG_VCOM2: u8 = 0x04;
/// Interrupt enable 1.
pub const REG_INT_EN1: u8 = 0x05;
/// Interrupt enable 2.
pub const REG_INT_EN2: u8 = 0x06;
/// Interrupt status 1.
pub const REG_INT1: u8 = 0x07;
/// Interrupt status 2.
pub const REG_INT2: u8 = 0x08;
/// Power-up strobe assignment.
pub const REG_UPSEQ0: u8 = 0x09;
/// Power-up strobe delays.
pub const REG_UPSEQ1: u8 = 0x0A;
/// Power-down strobe assignment.
pub const REG_DWNSEQ0: u8 = 0x0B;
/// Power-down strobe delays.
pub const REG_DWNSEQ1: u8 = 0x0C;
/// Thermistor control (READ_THERM bit 7, CONV_END bit 5).
pub const REG_TMST1: u8 = 0x0D;
/// Thermistor hot/cool thresholds.
pub const REG_TMST2: u8 = 0x0E;
/// Power-good status.
pub const REG_PG: u8 = 0x0F;
/// Silicon revision.
pub const REG_REVID: u8 = 0x10;

/// PG register value with every managed rail in regulation.
pub const PWR_GOOD_OK: u8 = 0b1111_1010;
/// TMST1: start a thermistor conversion.
pub const TMST1_READ_THERM: u8 = 1 << 7;
/// TMST1: conversion finished.
pub const TMST1_CONV_END: u8 = 1 << 5;
/// VCOM2: bit 8 of the VCOM setting.
pub const VCOM2_MSB: u8 = 1;
/// Highest VCOM magnitude the 9-bit field holds, in millivolts.
pub const VCOM_MAX_MV: u16 = 5110;

/// Thermistor conversion poll interval.
const TEMP_POLL_MS: u32 = 5;
/// 20 × 5 ms = 100 ms, conversion takes ~0.5 ms.
const MAX_TEMP_POLLS: u32 = 20;

/// Decode VCOM1/VCOM2 into millivolts (magnitude; VCOM is always negative).
///
/// 10 mV per LSB over a 9-bit field.
#[inline]
#[must_use]
// Safety: 9-bit value × 10 ≤ 5110, fits u16.
#[allow(clippy::arithmetic_side_effects)]
pub const fn decode_vcom_mv(vcom1: u8, vcom2: u8) -> u16 {
    ((vcom1 as u16) | (((vcom2 & VCOM2_MSB) as u16) << 8)) * 10
}

/// TPS65186 adapter error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Tps65186Error {
    /// I2C transaction failed
    I2c,
    /// Control GPIO write failed
    Pin,
    /// Thermistor conversion did not finish
    Timeout,
    /// Requested VCOM outside 0..=5110 mV
    VcomOutOfRange,
}

impl core::fmt::Display for Tps65186Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::I2c => write!(f, "TPS65186 I2C error"),
            Self::Pin => write!(f, "TPS65186 control pin error"),
            Self::Timeout => write!(f, "TPS65186 thermistor conversion timeout"),
            Self::VcomOutOfRange => write!(f, "VCOM setting out of range"),
        }
    }
}

/// TPS65186 PMIC on I2C with its three control GPIOs.
pub struct Tps65186<I2C, WAKE, PWRUP, VCOM> {
    i2c: I2C,
    wake: WAKE,
    pwrup: PWRUP,
    vcom: VCOM,
}

impl<I2C, WAKE, PWRUP, VCOM> Tps65186<I2C, WAKE, PWRUP, VCOM>
where
    I2C: I2c,
    WAKE: OutputPin,
    PWRUP: OutputPin,
    VCOM: OutputPin,
{
    /// Wrap the bus and pins. No bus traffic.
    pub fn new(i2c: I2C, wake: WAKE, pwrup: PWRUP, vcom: VCOM) -> Self {
        Self {
            i2c,
            wake,
            pwrup,
            vcom,
        }
    }

    /// Give the bus and pins back.
    pub fn release(self) -> (I2C, WAKE, PWRUP, VCOM) {
        (self.i2c, self.wake, self.pwrup, self.vcom)
    }

    fn read_regs(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), Tps65186Error> {
        self.i2c
            .write_read(TPS65186_I2C_ADDR, &[reg], buf)
            .map_err(|_| Tps65186Error::I2c)
    }

    fn read_reg(&mut self, reg: u8) -> Result<u8, Tps65186Error> {
        let mut buf = [0u8; 1];
        self.read_regs(reg, &mut buf)?;
        let [value] = buf;
        Ok(value)
    }

    fn write_regs(&mut self, data: &[u8]) -> Result<(), Tps65186Error> {
        self.i2c
            .write(TPS65186_I2C_ADDR, data)
            .map_err(|_| Tps65186Error::I2c)
    }

    /// Silicon revision register.
    pub fn revision(&mut self) -> Result<u8, Tps65186Error> {
        self.read_reg(REG_REVID)
    }

    /// Current VCOM magnitude in millivolts.
    pub fn read_vcom_mv(&mut self) -> Result<u16, Tps65186Error> {
        let mut regs = [0u8; 2];
        self.read_regs(REG_VCOM1, &mut regs)?;
        let [vcom1, vcom2] = regs;
        Ok(decode_vcom_mv(vcom1, vcom2))
    }

    /// Set VCOM magnitude in millivolts (volatile; not burned to EEPROM).
    ///
    /// VCOM2's upper bits are preserved.
    // Safety: mv ≤ VCOM_MAX_MV checked above, so code fits 9 bits.
    #[allow(clippy::arithmetic_side_effects, clippy::cast_possible_truncation)]
    pub fn set_vcom_mv(&mut self, mv: u16) -> Result<(), Tps65186Error> {
        if mv > VCOM_MAX_MV {
            return Err(Tps65186Error::VcomOutOfRange);
        }
        let code = mv / 10;
        let vcom2 = self.read_reg(REG_VCOM2)?;
        let hi = (vcom2 & !VCOM2_MSB) | ((code >> 8) as u8 & VCOM2_MSB);
        self.write_regs(&[REG_VCOM1, code as u8, hi])
    }

    /// Program the power-up strobe order and delays.
    pub fn set_power_up_sequence(&mut self, order: u8, delays: u8) -> Result<(), Tps65186Error> {
        self.write_regs(&[REG_UPSEQ0, order, delays])
    }

    /// Program the power-down strobe order and delays.
    pub fn set_power_down_sequence(&mut self, order: u8, delays: u8) -> Result<(), Tps65186Error> {
        self.write_regs(&[REG_DWNSEQ0, order, delays])
    }

    /// Panel temperature in °C from the on-chip thermistor ADC.
    ///
    /// Returns `Err(Tps65186Error::Timeout)` if the conversion does not
    /// finish within 100 ms.
    pub fn read_temperature(&mut self, delay: &mut impl DelayNs) -> Result<i8, Tps65186Error> {
        let tmst1 = self.read_reg(REG_TMST1)?;
        self.write_regs(&[REG_TMST1, tmst1 | TMST1_READ_THERM])?;

        for _ in 0..MAX_TEMP_POLLS {
            if self.read_reg(REG_TMST1)? & TMST1_CONV_END != 0 {
                let raw = self.read_reg(REG_TMST_VALUE)?;
                return Ok(i8::from_ne_bytes([raw]));
            }
            delay.delay_ms(TEMP_POLL_MS);
        }
        Err(Tps65186Error::Timeout)
    }
}

fn drive<P: OutputPin>(pin: &mut P, state: PinState) -> Result<(), Tps65186Error> {
    match state {
        PinState::High => pin.set_high(),
        PinState::Low => pin.set_low(),
    }
    .map_err(|_| Tps65186Error::Pin)
}

impl<I2C, WAKE, PWRUP, VCOM> EpdRails for Tps65186<I2C, WAKE, PWRUP, VCOM>
where
    I2C: I2c,
    WAKE: OutputPin,
    PWRUP: OutputPin,
    VCOM: OutputPin,
{
    type Error = Tps65186Error;

    const POWER_GOOD_OK: u8 = PWR_GOOD_OK;

    fn set_wake(&mut self, state: PinState) -> Result<(), Self::Error> {
        drive(&mut self.wake, state)
    }

    fn set_power_up(&mut self, state: PinState) -> Result<(), Self::Error> {
        drive(&mut self.pwrup, state)
    }

    fn set_vcom(&mut self, state: PinState) -> Result<(), Self::Error> {
        drive(&mut self.vcom, state)
    }

    fn set_rails(&mut self, mask: RailMask) -> Result<(), Self::Error> {
        self.write_regs(&[REG_ENABLE, mask.bits()])
    }

    fn power_good(&mut self) -> Result<u8, Self::Error> {
        self.read_reg(REG_PG)
    }
}
