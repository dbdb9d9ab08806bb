//! Phase lookup tables
//!
//! A phase column says which drive code each gray level gets. Streaming
//! needs the opposite direction: given a packed group of framebuffer
//! pixels, the packed drive byte for them. The tables here do that in a
//! single lookup per output byte.
//!
//! - 4-bit: two framebuffer bytes (four pixels) read little-endian form a
//!   16-bit index. Pixel 0 is the low nibble of the first byte and lands
//!   in bits 7..6 of the output.
//! - 1-bit: one nibble (four pixels, MSB first) indexes a 16-entry table.
//!   A set bit takes column entry 0, a clear bit takes entry 15.

use crate::waveform::{PhaseColumn, PixelDepth};

/// Entries in the 4-bit table.
pub const GRAY_LUT_LEN: usize = 1 << 16;

/// Entries in the 1-bit table.
pub const MONO_LUT_LEN: usize = 16;

/// Column entry a black 1-bit pixel reads.
const MONO_BLACK_LEVEL: usize = 0;
/// Column entry a white 1-bit pixel reads.
const MONO_WHITE_LEVEL: usize = 15;

/// Packed drive byte for the four gray levels in `index`.
// Safety: every nibble is masked to 0..16, the column length, and the
// shifts are by constants below 8.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
fn gray_byte(column: &PhaseColumn, index: usize) -> u8 {
    column[index & 0xF].bits() << 6
        | column[(index >> 4) & 0xF].bits() << 4
        | column[(index >> 8) & 0xF].bits() << 2
        | column[(index >> 12) & 0xF].bits()
}

/// Packed drive byte for the four 1-bit pixels in `nibble`.
// Safety: constant shifts below 8.
#[allow(clippy::arithmetic_side_effects)]
fn mono_byte(column: &PhaseColumn, nibble: usize) -> u8 {
    let code = |bit: usize| {
        let level = if nibble & (1 << bit) != 0 {
            MONO_BLACK_LEVEL
        } else {
            MONO_WHITE_LEVEL
        };
        column.get(level).map_or(0, |c| c.bits())
    };
    code(3) << 6 | code(2) << 4 | code(1) << 2 | code(0)
}

/// Fill `lut` for a 4-bit phase. `lut` must hold [`GRAY_LUT_LEN`] entries.
pub fn build_gray_lut(column: &PhaseColumn, lut: &mut [u8]) {
    for (i, out) in lut.iter_mut().take(GRAY_LUT_LEN).enumerate() {
        *out = gray_byte(column, i);
    }
}

/// Fill `lut` for a 1-bit phase. `lut` must hold [`MONO_LUT_LEN`] entries.
pub fn build_mono_lut(column: &PhaseColumn, lut: &mut [u8]) {
    for (i, out) in lut.iter_mut().take(MONO_LUT_LEN).enumerate() {
        *out = mono_byte(column, i);
    }
}

/// Owns both tables and remembers the column they were last built for.
pub struct LutEngine {
    gray: [u8; GRAY_LUT_LEN],
    mono: [u8; MONO_LUT_LEN],
    built: Option<(PixelDepth, PhaseColumn)>,
}

impl LutEngine {
    /// Empty tables; nothing is valid until [`Self::build`].
    pub const fn new() -> Self {
        Self {
            gray: [0; GRAY_LUT_LEN],
            mono: [0; MONO_LUT_LEN],
            built: None,
        }
    }

    /// Build the table for `depth` from `column`. Returns `false` when the
    /// same column was already built for that depth and nothing was done.
    pub fn build(&mut self, depth: PixelDepth, column: &PhaseColumn) -> bool {
        if self.built == Some((depth, *column)) {
            return false;
        }
        match depth {
            PixelDepth::FourBit => build_gray_lut(column, &mut self.gray),
            PixelDepth::OneBit => build_mono_lut(column, &mut self.mono),
        }
        self.built = Some((depth, *column));
        true
    }

    /// Forget the cached column so the next build always runs.
    pub fn invalidate(&mut self) {
        self.built = None;
    }

    /// 4-bit table.
    pub const fn gray(&self) -> &[u8; GRAY_LUT_LEN] {
        &self.gray
    }

    /// 1-bit table.
    pub const fn mono(&self) -> &[u8; MONO_LUT_LEN] {
        &self.mono
    }
}

impl Default for LutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for LutEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LutEngine")
            .field("built", &self.built.map(|(d, _)| d))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::waveform::{mono, uniform, DriveCode};
    use std::boxed::Box;

    fn ramp() -> PhaseColumn {
        let mut col = uniform(DriveCode::Skip);
        for (level, c) in col.iter_mut().enumerate() {
            *c = DriveCode::from_bits(level as u8);
        }
        col
    }

    #[test]
    fn gray_pixel_order() {
        // levels 0,1,2,3 → codes 00,01,10,11; pixel 0 in the low nibble of
        // the first byte
        let col = ramp();
        let index = usize::from(u16::from_le_bytes([0x10, 0x32]));
        assert_eq!(gray_byte(&col, index), 0b00_01_10_11);
    }

    #[test]
    fn mono_pixel_order() {
        let col = mono(DriveCode::Black, DriveCode::White);
        let mut lut = [0u8; MONO_LUT_LEN];
        build_mono_lut(&col, &mut lut);
        assert_eq!(lut[0b1000], 0b01_10_10_10);
        assert_eq!(lut[0b0001], 0b10_10_10_01);
        assert_eq!(lut[0b1111], 0b0101_0101);
        assert_eq!(lut[0b0000], 0b1010_1010);
    }

    #[test]
    fn identical_column_is_not_rebuilt() {
        let mut luts = Box::new(LutEngine::new());
        let col = uniform(DriveCode::Black);
        assert!(luts.build(PixelDepth::OneBit, &col));
        assert!(!luts.build(PixelDepth::OneBit, &col));
        assert!(luts.build(PixelDepth::FourBit, &col));
        luts.invalidate();
        assert!(luts.build(PixelDepth::FourBit, &col));
    }

    #[test]
    fn rebuild_replaces_table() {
        let mut luts = Box::new(LutEngine::new());
        luts.build(PixelDepth::FourBit, &uniform(DriveCode::White));
        assert!(luts.gray().iter().all(|&b| b == 0xAA));
        luts.build(PixelDepth::FourBit, &uniform(DriveCode::Discharge));
        assert!(luts.gray().iter().all(|&b| b == 0x00));
    }
}
