//! Waveform representation and the compiled-in default tables
//!
//! A waveform is a sequence of phases; each phase is a 16-entry column
//! saying which [`DriveCode`] a pixel of each gray level receives during
//! that phase. The panel integrates the phases into a pigment position.
//!
//! Gray level 0 is black and 15 is white. In 1-bit mode a set bit is
//! black and reads column entry 0; a clear bit is white and reads entry 15.

/// Format tag every loadable waveform must carry.
pub const WAVEFORM_TAG: u8 = 0xEF;

/// Gray levels per phase column.
pub const GRAY_LEVELS: usize = 16;

/// 2-bit per-pixel drive symbol. Four of them pack into one bus byte,
/// first pixel in bits 7..6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DriveCode {
    /// No voltage; bleeds off residual charge
    Discharge = 0b00,
    /// Drive toward black
    Black = 0b01,
    /// Drive toward white
    White = 0b10,
    /// Leave the pixel alone this phase
    Skip = 0b11,
}

impl DriveCode {
    /// The code as its 2-bit value.
    pub const fn bits(self) -> u8 {
        self as u8
    }

    /// The code repeated across all four pixel slots of a bus byte.
    pub const fn fill_byte(self) -> u8 {
        match self {
            Self::Discharge => 0b0000_0000,
            Self::Black => 0b0101_0101,
            Self::White => 0b1010_1010,
            Self::Skip => 0b1111_1111,
        }
    }

    /// Decode the low two bits of `bits`.
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b00 => Self::Discharge,
            0b01 => Self::Black,
            0b10 => Self::White,
            _ => Self::Skip,
        }
    }

    /// Target code for a 4-bit gray level in a single-pass update.
    pub const fn target_for_level(level: u8) -> Self {
        if level & 0x0F < 8 {
            Self::Black
        } else {
            Self::White
        }
    }
}

/// Framebuffer pixel depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PixelDepth {
    /// 1 bit per pixel, 8 px per byte, MSB first, set bit = black
    OneBit,
    /// 4 bits per pixel, 2 px per byte, first pixel in the low nibble
    FourBit,
}

impl PixelDepth {
    /// Pixels packed into one framebuffer byte.
    pub const fn pixels_per_byte(self) -> usize {
        match self {
            Self::OneBit => 8,
            Self::FourBit => 2,
        }
    }

    /// Byte value of an all-white framebuffer.
    pub const fn fill_value(self) -> u8 {
        match self {
            Self::OneBit => 0x00,
            Self::FourBit => 0xFF,
        }
    }

    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::OneBit => "1bpp",
            Self::FourBit => "4bpp",
        }
    }
}

/// Update kind a waveform is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UpdateKind {
    /// Whole-panel multi-phase refresh with a clean pass
    Full,
    /// Single-pass refresh of changed pixels
    Partial,
}

impl UpdateKind {
    /// Short name for logs.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

/// One phase: drive code per gray level.
pub type PhaseColumn = [DriveCode; GRAY_LEVELS];

/// Column driving every gray level with `code`.
pub const fn uniform(code: DriveCode) -> PhaseColumn {
    [code; GRAY_LEVELS]
}

/// 1-bit column: levels 0..8 get `black`, levels 8..16 get `white`.
// Safety: i < GRAY_LEVELS.
#[allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]
pub const fn mono(black: DriveCode, white: DriveCode) -> PhaseColumn {
    let mut col = [white; GRAY_LEVELS];
    let mut i = 0;
    while i < GRAY_LEVELS / 2 {
        col[i] = black;
        i += 1;
    }
    col
}

/// If every entry of `column` is the same code, that code.
pub fn uniform_code(column: &PhaseColumn) -> Option<DriveCode> {
    let first = column.first().copied()?;
    column.iter().all(|&c| c == first).then_some(first)
}

/// Drive sequence for one (depth, kind) slot.
///
/// Tables are `'static` so loading swaps a few words and never copies
/// phase data; board crates keep custom waveforms in flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waveform {
    /// Pixel depth this waveform decodes
    pub depth: PixelDepth,
    /// Update kind this waveform serves
    pub kind: UpdateKind,
    /// Format tag, must equal [`WAVEFORM_TAG`]
    pub tag: u8,
    /// Drive phases, streamed in order
    pub phases: &'static [PhaseColumn],
    /// Per-line hold for drive phases
    pub cycle_delay: u32,
    /// Clean phases streamed before the drive phases of a full update
    pub clean: &'static [PhaseColumn],
    /// Per-line hold for clean phases
    pub clean_cycle_delay: u32,
    /// Human-readable name
    pub name: &'static str,
}

impl Waveform {
    /// Number of drive phases.
    pub const fn phase_count(&self) -> usize {
        self.phases.len()
    }

    /// Number of clean phases.
    pub const fn clean_phase_count(&self) -> usize {
        self.clean.len()
    }
}

// ---- Default tables ----

mod tables {
    // Safety: every index in the const builders below is bounded by the
    // array length N the loop runs to; run + 1 never overflows for the
    // run lengths used here.
    #![allow(clippy::indexing_slicing, clippy::arithmetic_side_effects)]

    use super::{mono, uniform, DriveCode, PhaseColumn};

    const D: DriveCode = DriveCode::Discharge;
    const B: DriveCode = DriveCode::Black;
    const W: DriveCode = DriveCode::White;
    const S: DriveCode = DriveCode::Skip;

    /// `run` × black, discharge, `run` × white, discharge, twice over.
    const fn flash_clean<const N: usize>(run: usize) -> [PhaseColumn; N] {
        let mut out = [uniform(D); N];
        let mut i = 0;
        while i < N {
            let block = i / (run + 1);
            let pos = i % (run + 1);
            if pos != run {
                out[i] = if block % 2 == 0 { uniform(B) } else { uniform(W) };
            }
            i += 1;
        }
        out
    }

    pub(super) const CLEAN_4BIT_FULL: [PhaseColumn; 103] = flash_clean::<103>(25);
    pub(super) const CLEAN_1BIT_FULL: [PhaseColumn; 79] = flash_clean::<79>(19);

    /// Gray-level drive sequence, columns black → white.
    pub(super) const PHASES_4BIT: [PhaseColumn; 17] = [
        [B, B, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [B, B, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [B, B, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [W, W, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [W, W, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [W, W, B, B, B, B, B, B, B, B, B, B, B, B, B, B],
        [B, W, B, B, B, B, B, B, B, W, B, B, B, B, B, B],
        [B, B, B, B, B, B, B, B, B, W, D, D, B, B, W, B],
        [B, B, B, B, W, B, B, W, B, B, D, W, W, B, B, W],
        [B, B, B, B, B, B, B, W, B, B, W, W, W, W, W, W],
        [B, B, B, B, B, B, B, B, W, B, W, W, W, W, W, W],
        [B, B, B, B, W, W, B, B, W, W, W, W, W, W, W, W],
        [B, B, B, D, B, W, W, B, B, W, W, W, W, W, W, W],
        [B, B, B, D, W, W, W, W, W, W, W, W, W, W, W, W],
        [B, B, W, W, W, W, W, W, W, W, D, D, W, W, W, W],
        [B, B, W, W, B, B, W, W, W, B, B, B, B, W, W, W],
        [D, D, D, D, D, D, D, D, D, D, D, D, D, D, D, D],
    ];

    /// Ten black pushes on set bits, then discharge them.
    pub(super) const PHASES_1BIT: [PhaseColumn; 11] = [
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(B, S),
        mono(D, S),
    ];

    pub(super) const PHASES_1BIT_PARTIAL: [PhaseColumn; 1] = [mono(B, W)];
    pub(super) const CLEAN_DISCHARGE: [PhaseColumn; 1] = [uniform(D)];
}

/// Default 4-bit full update: 103-phase flash clean, 17 gray phases.
pub const DEFAULT_4BIT_FULL: Waveform = Waveform {
    depth: PixelDepth::FourBit,
    kind: UpdateKind::Full,
    tag: WAVEFORM_TAG,
    phases: &tables::PHASES_4BIT,
    cycle_delay: 140,
    clean: &tables::CLEAN_4BIT_FULL,
    clean_cycle_delay: 140,
    name: "default4BitFullUpdate",
};

/// Default 1-bit full update: 79-phase flash clean, 11 black/discharge phases.
pub const DEFAULT_1BIT_FULL: Waveform = Waveform {
    depth: PixelDepth::OneBit,
    kind: UpdateKind::Full,
    tag: WAVEFORM_TAG,
    phases: &tables::PHASES_1BIT,
    cycle_delay: 140,
    clean: &tables::CLEAN_1BIT_FULL,
    clean_cycle_delay: 140,
    name: "default1BitFullUpdate",
};

/// Default 4-bit partial update. Only the cycle delay and the discharge
/// clean are used; the mask carries the drive codes.
pub const DEFAULT_4BIT_PARTIAL: Waveform = Waveform {
    depth: PixelDepth::FourBit,
    kind: UpdateKind::Partial,
    tag: WAVEFORM_TAG,
    phases: &tables::PHASES_4BIT,
    cycle_delay: 140,
    clean: &tables::CLEAN_DISCHARGE,
    clean_cycle_delay: 140,
    name: "default4BitPartialUpdate",
};

/// Fixed 1-bit partial table: one black/white push, one discharge.
pub const DEFAULT_1BIT_PARTIAL: Waveform = Waveform {
    depth: PixelDepth::OneBit,
    kind: UpdateKind::Partial,
    tag: WAVEFORM_TAG,
    phases: &tables::PHASES_1BIT_PARTIAL,
    cycle_delay: 140,
    clean: &tables::CLEAN_DISCHARGE,
    clean_cycle_delay: 140,
    name: "default1BitPartialUpdate",
};

/// Compiled-in default for a slot.
pub const fn default_waveform(depth: PixelDepth, kind: UpdateKind) -> &'static Waveform {
    match (depth, kind) {
        (PixelDepth::FourBit, UpdateKind::Full) => &DEFAULT_4BIT_FULL,
        (PixelDepth::OneBit, UpdateKind::Full) => &DEFAULT_1BIT_FULL,
        (PixelDepth::FourBit, UpdateKind::Partial) => &DEFAULT_4BIT_PARTIAL,
        (PixelDepth::OneBit, UpdateKind::Partial) => &DEFAULT_1BIT_PARTIAL,
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn fill_byte_repeats_bits() {
        for code in [
            DriveCode::Discharge,
            DriveCode::Black,
            DriveCode::White,
            DriveCode::Skip,
        ] {
            let b = code.bits();
            assert_eq!(code.fill_byte(), b << 6 | b << 4 | b << 2 | b);
            assert_eq!(DriveCode::from_bits(b), code);
        }
    }

    #[test]
    fn flash_clean_sequences_have_expected_shape() {
        let clean = DEFAULT_1BIT_FULL.clean;
        assert_eq!(clean.len(), 79);
        assert_eq!(uniform_code(&clean[0]), Some(DriveCode::Black));
        assert_eq!(uniform_code(&clean[19]), Some(DriveCode::Discharge));
        assert_eq!(uniform_code(&clean[20]), Some(DriveCode::White));
        assert_eq!(uniform_code(&clean[78]), Some(DriveCode::White));

        let clean = DEFAULT_4BIT_FULL.clean;
        assert_eq!(clean.len(), 103);
        let discharges: std::vec::Vec<usize> = clean
            .iter()
            .enumerate()
            .filter(|(_, c)| uniform_code(c) == Some(DriveCode::Discharge))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(discharges, [25, 51, 77]);
    }

    #[test]
    fn defaults_are_tagged_and_non_empty() {
        for depth in [PixelDepth::OneBit, PixelDepth::FourBit] {
            for kind in [UpdateKind::Full, UpdateKind::Partial] {
                let w = default_waveform(depth, kind);
                assert_eq!(w.tag, WAVEFORM_TAG);
                assert!(w.phase_count() > 0);
                assert_eq!((w.depth, w.kind), (depth, kind));
            }
        }
    }

    #[test]
    fn one_bit_partial_is_single_push_with_discharge() {
        let w = DEFAULT_1BIT_PARTIAL;
        assert_eq!(w.phase_count(), 1);
        assert_eq!(w.phases[0][0], DriveCode::Black);
        assert_eq!(w.phases[0][15], DriveCode::White);
        assert_eq!(uniform_code(&w.clean[0]), Some(DriveCode::Discharge));
    }

    #[test]
    fn target_code_splits_at_mid_gray() {
        assert_eq!(DriveCode::target_for_level(0), DriveCode::Black);
        assert_eq!(DriveCode::target_for_level(7), DriveCode::Black);
        assert_eq!(DriveCode::target_for_level(8), DriveCode::White);
        assert_eq!(DriveCode::target_for_level(15), DriveCode::White);
    }
}
