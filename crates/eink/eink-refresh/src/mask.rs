//! Difference mask
//!
//! Turns a (current, pending) framebuffer pair into one frame of drive
//! codes: unchanged pixels skip, changed pixels are driven toward the
//! pending pixel's target. Pure table substitution, no per-pixel branches.
//!
//! Two tables per depth, OR-ed together per pixel group. The skip table is
//! keyed on the XOR of the two buffers and yields `11` for unchanged
//! pixels and `00` for changed ones; the target table is keyed on pending
//! and yields `01`/`10`. `11 | anything` stays skip.

// Safety: every table index below is a nibble or a byte, bounded by the
// 16/256-entry table it reads; shifts are by constants below 8.
#![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

use crate::error::RefreshError;
use crate::waveform::{DriveCode, PixelDepth};

const SKIP: u8 = DriveCode::Skip.bits();
const BLACK: u8 = DriveCode::Black.bits();
const WHITE: u8 = DriveCode::White.bits();

/// 1-bit diff nibble → four codes, `11` where the bit is clear.
const SKIP_NIBBLE: [u8; 16] = {
    let mut t = [0u8; 16];
    let mut n = 0;
    while n < 16 {
        let mut bit = 0;
        while bit < 4 {
            if n & (1 << bit) == 0 {
                t[n] |= SKIP << (bit * 2);
            }
            bit += 1;
        }
        n += 1;
    }
    t
};

/// 1-bit pending nibble → four codes, black for set bits, white for clear.
const TARGET_NIBBLE: [u8; 16] = {
    let mut t = [0u8; 16];
    let mut n = 0;
    while n < 16 {
        let mut bit = 0;
        while bit < 4 {
            let code = if n & (1 << bit) != 0 { BLACK } else { WHITE };
            t[n] |= code << (bit * 2);
            bit += 1;
        }
        n += 1;
    }
    t
};

/// 4-bit diff byte → two codes (low-nibble pixel in bits 3..2), `11` for
/// an unchanged nibble.
const SKIP_PAIR: [u8; 256] = {
    let mut t = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        let lo = if b & 0x0F == 0 { SKIP } else { 0 };
        let hi = if b & 0xF0 == 0 { SKIP } else { 0 };
        t[b] = lo << 2 | hi;
        b += 1;
    }
    t
};

/// 4-bit pending byte → two target codes (low-nibble pixel in bits 3..2).
const TARGET_PAIR: [u8; 256] = {
    let mut t = [0u8; 256];
    let mut b = 0;
    while b < 256 {
        let lo = DriveCode::target_for_level(b as u8).bits();
        let hi = DriveCode::target_for_level((b >> 4) as u8).bits();
        t[b] = lo << 2 | hi;
        b += 1;
    }
    t
};

/// Mask bytes produced for `source_len` framebuffer bytes at `depth`.
pub const fn mask_len_for(depth: PixelDepth, source_len: usize) -> usize {
    match depth {
        PixelDepth::OneBit => source_len * 2,
        PixelDepth::FourBit => source_len / 2,
    }
}

/// Build the difference mask of `current` against `pending` into `mask`.
///
/// `pending.len()` decides how much is compared; `current` must be at
/// least as long and `mask` must hold [`mask_len_for`] bytes. Bytes of
/// `mask` past that length are left alone.
pub fn build_mask(
    depth: PixelDepth,
    current: &[u8],
    pending: &[u8],
    mask: &mut [u8],
) -> Result<(), RefreshError> {
    let len = pending.len();
    if current.len() < len {
        return Err(RefreshError::BufferTooSmall {
            needed: len,
            actual: current.len(),
        });
    }
    let needed = mask_len_for(depth, len);
    if mask.len() < needed {
        return Err(RefreshError::BufferTooSmall {
            needed,
            actual: mask.len(),
        });
    }

    match depth {
        PixelDepth::OneBit => {
            for ((out, &c), &p) in mask.chunks_exact_mut(2).zip(current).zip(pending) {
                let d = usize::from(c ^ p);
                let p = usize::from(p);
                out[0] = SKIP_NIBBLE[d >> 4] | TARGET_NIBBLE[p >> 4];
                out[1] = SKIP_NIBBLE[d & 0x0F] | TARGET_NIBBLE[p & 0x0F];
            }
        }
        PixelDepth::FourBit => {
            for ((out, c), p) in mask
                .iter_mut()
                .zip(current.chunks_exact(2))
                .zip(pending.chunks_exact(2))
            {
                let pair = |i: usize| {
                    let d = usize::from(c[i] ^ p[i]);
                    SKIP_PAIR[d] | TARGET_PAIR[usize::from(p[i])]
                };
                *out = pair(0) << 4 | pair(1);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn nibble_tables() {
        assert_eq!(SKIP_NIBBLE[0x0], 0xFF);
        assert_eq!(SKIP_NIBBLE[0xF], 0x00);
        assert_eq!(SKIP_NIBBLE[0b1000], 0b00_11_11_11);
        assert_eq!(TARGET_NIBBLE[0x0], 0xAA);
        assert_eq!(TARGET_NIBBLE[0xF], 0x55);
        assert_eq!(TARGET_NIBBLE[0b0001], 0b10_10_10_01);
    }

    #[test]
    fn one_bit_single_changed_pixel() {
        // pixel 0 goes white → black, everything else unchanged
        let current = [0x00u8; 2];
        let pending = [0x80u8, 0x00];
        let mut mask = [0u8; 4];
        build_mask(PixelDepth::OneBit, &current, &pending, &mut mask).unwrap();
        assert_eq!(mask, [0b01_11_11_11, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn four_bit_pixel_order() {
        // byte 0: pixel 0 (low nibble) changes to level 2, pixel 1 unchanged
        // byte 1: pixel 2 unchanged, pixel 3 changes to level 12
        let current = [0x5F, 0x35];
        let pending = [0x52, 0xC5];
        let mut mask = [0u8; 1];
        build_mask(PixelDepth::FourBit, &current, &pending, &mut mask).unwrap();
        assert_eq!(mask[0], 0b01_11_11_10);
    }

    #[test]
    fn short_mask_rejected_untouched() {
        let fb = [0u8; 8];
        let mut mask = [0x42u8; 15];
        assert_eq!(
            build_mask(PixelDepth::OneBit, &fb, &fb, &mut mask),
            Err(RefreshError::BufferTooSmall {
                needed: 16,
                actual: 15
            })
        );
        assert!(mask.iter().all(|&b| b == 0x42));
    }

    #[test]
    fn short_current_rejected() {
        let mut mask = [0u8; 4];
        assert!(build_mask(PixelDepth::FourBit, &[0; 4], &[0; 8], &mut mask).is_err());
    }
}
