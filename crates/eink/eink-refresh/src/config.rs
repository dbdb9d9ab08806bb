//! Engine configuration
//!
//! Panel geometry and the timing knobs the power sequencer and pipeline
//! need. Everything has a const default matching the ED060XC3 panel on
//! an STM32H7 with external SDRAM.

use crate::error::ConfigError;
use crate::waveform::PixelDepth;
use platform::dma_aligned_len;

/// Largest drive row the row buffers hold (2 bits per pixel, 2048 px).
pub const MAX_ROW_BYTES: usize = 512;

/// Largest panel height in gate lines. With [`MAX_ROW_BYTES`] this keeps
/// every buffer size under 4 MiB, well inside a 32-bit `usize`.
pub const MAX_ROWS: u32 = 2048;

/// Staging buffer capacity in bytes.
pub const MAX_STAGING_BYTES: usize = 8192;

/// Panel resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PanelGeometry {
    /// Horizontal pixels (source lines)
    pub width: u32,
    /// Vertical pixels (gate lines)
    pub height: u32,
}

// Safety: geometry is validated against MAX_ROW_BYTES and MAX_ROWS before
// use, so every product below is bounded by a few MiB.
#[allow(clippy::arithmetic_side_effects)]
impl PanelGeometry {
    /// 6" 1024×758 ED060XC3.
    pub const ED060XC3: Self = Self::new(1024, 758);

    /// New geometry; validate with [`EngineConfig::validate`].
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Width in pixels as `usize`.
    pub const fn width_px(&self) -> usize {
        self.width as usize
    }

    /// Number of panel rows.
    pub const fn rows(&self) -> usize {
        self.height as usize
    }

    /// Total pixels.
    pub const fn pixels(&self) -> usize {
        self.width_px() * self.rows()
    }

    /// Framebuffer bytes per row at `depth`.
    pub const fn source_row_bytes(&self, depth: PixelDepth) -> usize {
        self.width_px() / depth.pixels_per_byte()
    }

    /// Drive-code bytes per row (2 bits per pixel).
    pub const fn drive_row_bytes(&self) -> usize {
        self.width_px() / 4
    }

    /// Image bytes at `depth`, without padding.
    pub const fn image_len(&self, depth: PixelDepth) -> usize {
        self.source_row_bytes(depth) * self.rows()
    }

    /// Framebuffer bytes at `depth`, rounded to DMA granularity.
    pub const fn framebuffer_len(&self, depth: PixelDepth) -> usize {
        dma_aligned_len(self.image_len(depth))
    }

    /// Bytes every framebuffer slot must hold to serve both depths.
    pub const fn framebuffer_capacity(&self) -> usize {
        self.framebuffer_len(PixelDepth::FourBit)
    }

    /// Difference mask bytes (2 bits per pixel).
    pub const fn mask_len(&self) -> usize {
        self.drive_row_bytes() * self.rows()
    }
}

/// Refresh engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Panel resolution
    pub geometry: PanelGeometry,
    /// Bytes of framebuffer prefetched per bulk copy
    pub staging_bytes: usize,
    /// Power-good poll budget in milliseconds (1 ms per poll)
    pub power_good_timeout_ms: u32,
    /// Delay after each PMIC enable pin
    pub power_step_delay_ms: u32,
    /// Partial updates allowed between forced full updates (0 = never forced)
    pub full_update_threshold: u32,
}

impl EngineConfig {
    /// ED060XC3 with 8 KiB staging, 1 s power-good timeout, 5 ms pin steps.
    pub const DEFAULT: Self = Self::new(PanelGeometry::ED060XC3);

    /// Default timing for `geometry`.
    pub const fn new(geometry: PanelGeometry) -> Self {
        Self {
            geometry,
            staging_bytes: MAX_STAGING_BYTES,
            power_good_timeout_ms: 1000,
            power_step_delay_ms: 5,
            full_update_threshold: 0,
        }
    }

    /// Override the staging size.
    #[must_use]
    pub const fn with_staging_bytes(mut self, bytes: usize) -> Self {
        self.staging_bytes = bytes;
        self
    }

    /// Override the forced full-update threshold.
    #[must_use]
    pub const fn with_full_update_threshold(mut self, n: u32) -> Self {
        self.full_update_threshold = n;
        self
    }

    /// Check geometry against buffer capacities.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.geometry;
        if g.width == 0 || g.width % 8 != 0 {
            return Err(ConfigError::Width(g.width));
        }
        if g.height == 0 || g.height > MAX_ROWS {
            return Err(ConfigError::Height(g.height));
        }
        if g.drive_row_bytes() > MAX_ROW_BYTES {
            return Err(ConfigError::RowTooWide(g.drive_row_bytes()));
        }
        let widest = g.source_row_bytes(PixelDepth::FourBit);
        if self.staging_bytes < widest || self.staging_bytes > MAX_STAGING_BYTES {
            return Err(ConfigError::Staging(self.staging_bytes));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
