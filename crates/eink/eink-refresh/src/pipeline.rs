//! Pixel streaming pipeline
//!
//! One pass puts one frame of drive codes on the panel bus:
//!
//! ```text
//! prefetch + decode row 0 ─► frame_start ─► per row: row_start, stream_row, row_advance
//! ```
//!
//! A pass runs to completion inside [`StreamPipeline::stream_pass`]; there
//! is no pass state carried between calls.
//!
//! Framebuffer rows live in slow external memory. They are pulled into a
//! small staging buffer a chunk at a time with [`BulkCopy`], decoded into
//! one of two row buffers, and streamed from the other. Row `n + 1` is
//! decoded inside the closure handed to [`DriveSink::stream_row`] for row
//! `n`, so decoding always overlaps the previous row's transfer.
//!
//! When the row about to be decoded is past the staged chunk the next
//! chunk is copied in between rows; that copy is the only blocking wait
//! the pipeline adds on top of the bus itself.

// Safety: all products and offsets below are bounded by the panel geometry,
// validated against MAX_ROW_BYTES / MAX_STAGING_BYTES at construction, and
// every slice is taken through `get`/`get_mut`.
#![allow(clippy::arithmetic_side_effects)]

use platform::{BulkCopy, PanelBus};

use crate::config::{EngineConfig, PanelGeometry, MAX_ROW_BYTES, MAX_STAGING_BYTES};
use crate::error::{ConfigError, RefreshError};
use crate::lut::{GRAY_LUT_LEN, MONO_LUT_LEN};
use crate::power::RailsUp;

/// How a pass turns source rows into drive rows. Chosen once per pass.
#[derive(Clone, Copy)]
pub enum RowDecoder<'a> {
    /// 4-bit framebuffer through a phase table, two source bytes per output
    Gray(&'a [u8; GRAY_LUT_LEN]),
    /// 1-bit framebuffer through a nibble table, two outputs per source byte
    Mono(&'a [u8; MONO_LUT_LEN]),
    /// Source is already drive codes (difference mask)
    Mask,
    /// No source; every byte of every row is this value
    Fill(u8),
}

impl RowDecoder<'_> {
    /// Source bytes consumed per panel row.
    pub const fn source_row_bytes(&self, geometry: &PanelGeometry) -> usize {
        let w = geometry.width_px();
        match self {
            Self::Gray(_) => w / 2,
            Self::Mono(_) => w / 8,
            Self::Mask => w / 4,
            Self::Fill(_) => 0,
        }
    }

    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Gray(_) => "gray",
            Self::Mono(_) => "mono",
            Self::Mask => "mask",
            Self::Fill(_) => "fill",
        }
    }

    /// Decode one row of `src` into `out`.
    pub fn decode_row(&self, src: &[u8], out: &mut [u8]) {
        match self {
            Self::Gray(lut) => {
                for (o, pair) in out.iter_mut().zip(src.chunks_exact(2)) {
                    if let [lo, hi] = *pair {
                        let index = usize::from(u16::from_le_bytes([lo, hi]));
                        *o = lut.get(index).copied().unwrap_or_default();
                    }
                }
            }
            Self::Mono(lut) => {
                for (o, &b) in out.chunks_exact_mut(2).zip(src) {
                    if let [first, second] = o {
                        *first = lut.get(usize::from(b >> 4)).copied().unwrap_or_default();
                        *second = lut.get(usize::from(b & 0x0F)).copied().unwrap_or_default();
                    }
                }
            }
            Self::Mask => {
                for (o, &b) in out.iter_mut().zip(src) {
                    *o = b;
                }
            }
            Self::Fill(value) => out.fill(*value),
        }
    }
}

impl core::fmt::Debug for RowDecoder<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Fill(v) => write!(f, "Fill({v:#04x})"),
            other => f.write_str(other.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveRow {
    A,
    B,
}

/// Two row buffers and which one is being transmitted.
struct RowBuffers {
    a: [u8; MAX_ROW_BYTES],
    b: [u8; MAX_ROW_BYTES],
    active: ActiveRow,
}

impl RowBuffers {
    const fn new() -> Self {
        Self {
            a: [0; MAX_ROW_BYTES],
            b: [0; MAX_ROW_BYTES],
            active: ActiveRow::A,
        }
    }

    /// (row being transmitted, row being decoded), each `len` bytes.
    fn split(&mut self, len: usize) -> (&[u8], &mut [u8]) {
        let (tx, rx) = match self.active {
            ActiveRow::A => (&self.a, &mut self.b),
            ActiveRow::B => (&self.b, &mut self.a),
        };
        (
            tx.get(..len).unwrap_or_default(),
            rx.get_mut(..len).unwrap_or_default(),
        )
    }

    fn flip(&mut self) {
        self.active = match self.active {
            ActiveRow::A => ActiveRow::B,
            ActiveRow::B => ActiveRow::A,
        };
    }
}

/// Counters for one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PassStats {
    /// Rows streamed
    pub rows: usize,
    /// Drive bytes put on the bus, row-start bytes included
    pub bytes: usize,
    /// Bulk copies into staging
    pub prefetches: usize,
}

/// Rows of `source` currently held in staging.
#[derive(Debug, Clone, Copy)]
struct Staged {
    first: usize,
    count: usize,
}

impl Staged {
    const EMPTY: Self = Self { first: 0, count: 0 };

    fn contains(&self, row: usize) -> bool {
        row >= self.first && row < self.first + self.count
    }
}

/// Staging and row buffers for streaming passes.
pub struct StreamPipeline {
    geometry: PanelGeometry,
    staging_bytes: usize,
    staging: [u8; MAX_STAGING_BYTES],
    rows: RowBuffers,
}

impl StreamPipeline {
    /// Pipeline for `config`'s geometry and staging size.
    pub fn new(config: &EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            geometry: config.geometry,
            staging_bytes: config.staging_bytes,
            staging: [0; MAX_STAGING_BYTES],
            rows: RowBuffers::new(),
        })
    }

    /// Rows staged per bulk copy for `decoder`.
    pub fn chunk_rows(&self, decoder: &RowDecoder<'_>) -> usize {
        match decoder.source_row_bytes(&self.geometry) {
            0 => self.geometry.rows(),
            srb => (self.staging_bytes / srb).max(1),
        }
    }

    /// Stream one frame of `source` through `decoder`.
    ///
    /// `source` must hold a full panel of rows for the decoder; it is not
    /// read for [`RowDecoder::Fill`]. Fails before touching the bus.
    pub fn stream_pass<P, C>(
        &mut self,
        _rails: RailsUp,
        bus: &mut P,
        copier: &mut C,
        source: &[u8],
        decoder: RowDecoder<'_>,
        cycle_delay: u32,
    ) -> Result<PassStats, RefreshError>
    where
        P: PanelBus,
        C: BulkCopy,
    {
        let rows = self.geometry.rows();
        let srb = decoder.source_row_bytes(&self.geometry);
        let orb = self.geometry.drive_row_bytes();
        if orb > MAX_ROW_BYTES {
            return Err(ConfigError::RowTooWide(orb).into());
        }
        let needed = srb * rows;
        if source.len() < needed {
            return Err(RefreshError::BufferTooSmall {
                needed,
                actual: source.len(),
            });
        }

        let chunk_rows = self.chunk_rows(&decoder);
        let mut stats = PassStats::default();
        let mut staged = Staged::EMPTY;

        if srb > 0 {
            staged = self.prefetch(copier, source, srb, 0, chunk_rows);
            stats.prefetches += 1;
        }
        {
            let (_, rx) = self.rows.split(orb);
            decoder.decode_row(staged_row(&self.staging, staged, srb, 0), rx);
        }
        self.rows.flip();

        bus.frame_start(cycle_delay);
        for row in 0..rows {
            let next = row + 1;
            let decode_next = next < rows;
            if decode_next && srb > 0 && !staged.contains(next) {
                staged = self.prefetch(copier, source, srb, next, chunk_rows);
                stats.prefetches += 1;
            }

            let staging = &self.staging;
            let (tx, rx) = self.rows.split(orb);
            let (first, second) = match *tx {
                [a, b, ..] => (a, b),
                _ => (0, 0),
            };
            bus.row_start(first, second);
            bus.stream_row(tx.get(2..).unwrap_or_default(), || {
                if decode_next {
                    decoder.decode_row(staged_row(staging, staged, srb, next), rx);
                }
            });
            bus.row_advance();
            self.rows.flip();

            stats.rows += 1;
            stats.bytes += orb;
        }

        log_debug!(
            "{} pass: {} rows, {} prefetches, delay {}",
            decoder.name(),
            stats.rows,
            stats.prefetches,
            cycle_delay
        );
        Ok(stats)
    }

    /// Copy up to `chunk_rows` rows starting at `first` into staging.
    fn prefetch<C: BulkCopy>(
        &mut self,
        copier: &mut C,
        source: &[u8],
        srb: usize,
        first: usize,
        chunk_rows: usize,
    ) -> Staged {
        let count = chunk_rows.min(self.geometry.rows().saturating_sub(first));
        let start = first * srb;
        let len = count * srb;
        if let (Some(dst), Some(src)) = (
            self.staging.get_mut(..len),
            source.get(start..start + len),
        ) {
            copier.copy(dst, src);
        }
        Staged { first, count }
    }
}

/// Source bytes of `row` inside the staging buffer.
fn staged_row(staging: &[u8], staged: Staged, srb: usize, row: usize) -> &[u8] {
    let offset = row.saturating_sub(staged.first) * srb;
    staging.get(offset..offset + srb).unwrap_or_default()
}

impl core::fmt::Debug for StreamPipeline {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StreamPipeline")
            .field("geometry", &self.geometry)
            .field("staging_bytes", &self.staging_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::lut::build_mono_lut;
    use crate::waveform::{mono, DriveCode};
    use platform::mocks::{MockBulkCopy, MockPanelBus};
    use std::boxed::Box;
    use std::vec;

    fn pipeline(width: u32, height: u32, staging: usize) -> Box<StreamPipeline> {
        let cfg = EngineConfig::new(PanelGeometry::new(width, height)).with_staging_bytes(staging);
        Box::new(StreamPipeline::new(&cfg).unwrap())
    }

    #[test]
    fn row_buffers_alternate() {
        let mut rows = RowBuffers::new();
        rows.split(4).1.fill(7);
        rows.flip();
        let (tx, rx) = rows.split(4);
        assert_eq!(tx, &[7; 4]);
        assert_eq!(rx, &[0; 4]);
    }

    #[test]
    fn fill_pass_needs_no_source() {
        let mut p = pipeline(32, 8, 16);
        let mut bus = MockPanelBus::new();
        let mut copier = MockBulkCopy::new();
        let stats = p
            .stream_pass(RailsUp::for_test(), &mut bus, &mut copier, &[], RowDecoder::Fill(0xAA), 77)
            .unwrap();
        assert_eq!(stats, PassStats { rows: 8, bytes: 64, prefetches: 0 });
        assert_eq!(copier.copies(), 0);
        let frame = &bus.frames()[0];
        assert_eq!(frame.cycle_delay, 77);
        assert_eq!(frame.uniform, Some(0xAA));
        assert_eq!(bus.protocol_errors(), 0);
    }

    #[test]
    fn mask_pass_is_passthrough_in_row_order() {
        // 32 px wide → 8 mask bytes per row; 16 staging bytes = 2 rows per chunk
        let mut p = pipeline(32, 8, 16);
        let mut bus = MockPanelBus::capturing();
        let mut copier = MockBulkCopy::new();
        let source: std::vec::Vec<u8> = (0..64u8).collect();
        let stats = p
            .stream_pass(RailsUp::for_test(), &mut bus, &mut copier, &source, RowDecoder::Mask, 1)
            .unwrap();
        assert_eq!(stats.prefetches, 4);
        assert_eq!(copier.copies(), 4);
        assert_eq!(bus.frames()[0].data, source);
        assert_eq!(bus.overlaps(), 8);
        assert_eq!(bus.protocol_errors(), 0);
    }

    #[test]
    fn mono_pass_decodes_through_table() {
        let mut lut = [0u8; MONO_LUT_LEN];
        build_mono_lut(&mono(DriveCode::Black, DriveCode::White), &mut lut);
        let mut p = pipeline(16, 2, 8);
        let mut bus = MockPanelBus::capturing();
        let source = [0xF0, 0x00, 0x0F, 0xFF];
        p.stream_pass(
            RailsUp::for_test(),
            &mut bus,
            &mut MockBulkCopy::new(),
            &source,
            RowDecoder::Mono(&lut),
            1,
        )
        .unwrap();
        assert_eq!(
            bus.frames()[0].data,
            [0x55, 0xAA, 0xAA, 0xAA, 0xAA, 0x55, 0x55, 0x55]
        );
    }

    #[test]
    fn short_source_rejected_before_bus() {
        let mut p = pipeline(32, 8, 16);
        let mut bus = MockPanelBus::new();
        let err = p
            .stream_pass(
                RailsUp::for_test(),
                &mut bus,
                &mut MockBulkCopy::new(),
                &vec![0; 63],
                RowDecoder::Mask,
                1,
            )
            .unwrap_err();
        assert_eq!(err, RefreshError::BufferTooSmall { needed: 64, actual: 63 });
        assert_eq!(bus.frame_count(), 0);
    }

    #[test]
    fn chunk_sizes_for_default_panel() {
        let p = Box::new(StreamPipeline::new(&EngineConfig::DEFAULT).unwrap());
        let lut = [0u8; MONO_LUT_LEN];
        assert_eq!(p.chunk_rows(&RowDecoder::Mono(&lut)), 64);
        assert_eq!(p.chunk_rows(&RowDecoder::Mask), 32);
        assert_eq!(p.chunk_rows(&RowDecoder::Fill(0)), 758);
    }
}
