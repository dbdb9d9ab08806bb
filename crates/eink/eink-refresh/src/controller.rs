//! Display state controller
//!
//! Owns the framebuffers, the waveform table and every hardware seam, and
//! sequences full and partial updates through them.
//!
//! Ghosting control: a partial update only drives the pixels that differ
//! from what the engine believes is on the panel, so that belief must come
//! from a full update at the current depth. `partial_blocked` is set at
//! start-up and on every depth switch and is cleared only by a completed
//! full update; a blocked partial update is promoted to a full one. A
//! non-zero threshold additionally forces a full update after that many
//! partial ones.

// Safety: pass and row counters are bounded by waveform length times panel
// rows, far below usize::MAX.
#![allow(clippy::arithmetic_side_effects)]

use embedded_hal::delay::DelayNs;
use platform::{BulkCopy, EpdRails, PanelBus, PanelControl};

use crate::canvas::PendingCanvas;
use crate::config::EngineConfig;
use crate::error::RefreshError;
use crate::framebuffer::{FramebufferSet, Role};
use crate::lut::LutEngine;
use crate::mask::build_mask;
use crate::pipeline::{PassStats, RowDecoder, StreamPipeline};
use crate::power::{PowerSequencer, RailsUp};
use crate::waveform::{uniform_code, PhaseColumn, PixelDepth, UpdateKind, Waveform};
use crate::waveform_table::WaveformTable;

/// Snapshot of the controller's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayMode {
    /// Active pixel depth
    pub depth: PixelDepth,
    /// Panel rails are up
    pub rails_enabled: bool,
    /// Next partial update will be promoted to a full update
    pub partial_blocked: bool,
    /// Partial updates since the last full update (counted only with a threshold)
    pub partial_counter: u32,
    /// Partial updates allowed between forced full updates, 0 = unlimited
    pub partial_threshold: u32,
}

/// What the last update actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UpdateStats {
    /// Kind performed; `Full` when a partial request was promoted
    pub kind: UpdateKind,
    /// Clean passes streamed
    pub clean_passes: usize,
    /// Waveform phase passes streamed
    pub phase_passes: usize,
    /// Difference mask passes streamed
    pub mask_passes: usize,
    /// Rows streamed over all passes
    pub rows: usize,
}

impl UpdateStats {
    const fn new(kind: UpdateKind) -> Self {
        Self {
            kind,
            clean_passes: 0,
            phase_passes: 0,
            mask_passes: 0,
            rows: 0,
        }
    }

    /// Total passes streamed.
    pub const fn passes(&self) -> usize {
        self.clean_passes
            .saturating_add(self.phase_passes)
            .saturating_add(self.mask_passes)
    }
}

const NO_SOURCE: &[u8] = &[];

/// Source of one pass; resolved to a decoder when it is streamed.
#[derive(Debug, Clone, Copy)]
enum Pass {
    /// Uniform drive byte, no source
    Fill(u8),
    /// Current framebuffer through the table last built
    Image,
    /// Difference mask in scratch
    Mask,
}

/// The refresh engine.
///
/// - `B`: framebuffer storage
/// - `R`, `L`, `D`: PMIC, control lines and delay for the power sequencer
/// - `P`: panel data bus and row clock
/// - `C`: bulk copy engine
pub struct DisplayController<B, R, L, D, P, C> {
    config: EngineConfig,
    buffers: FramebufferSet<B>,
    power: PowerSequencer<R, L, D>,
    bus: P,
    copier: C,
    waveforms: WaveformTable,
    luts: LutEngine,
    pipeline: StreamPipeline,
    mode: DisplayMode,
    last_update: Option<UpdateStats>,
}

impl<B, R, L, D, P, C> DisplayController<B, R, L, D, P, C>
where
    B: AsRef<[u8]> + AsMut<[u8]>,
    R: EpdRails,
    L: PanelControl,
    D: DelayNs,
    P: PanelBus,
    C: BulkCopy,
{
    /// Set up the engine in 1-bit mode with a white pending image copied
    /// to current. Partial updates stay blocked until the first full one.
    pub fn new(
        config: EngineConfig,
        buffers: FramebufferSet<B>,
        power: PowerSequencer<R, L, D>,
        bus: P,
        copier: C,
    ) -> Result<Self, RefreshError> {
        let pipeline = StreamPipeline::new(&config)?;
        let g = &config.geometry;
        for role in [Role::Current, Role::Pending] {
            check_len(g.framebuffer_capacity(), buffers.get(role))?;
        }
        check_len(g.mask_len(), buffers.get(Role::Scratch))?;

        let mut this = Self {
            config,
            buffers,
            power,
            bus,
            copier,
            waveforms: WaveformTable::new(),
            luts: LutEngine::new(),
            pipeline,
            mode: DisplayMode {
                depth: PixelDepth::OneBit,
                rails_enabled: false,
                partial_blocked: true,
                partial_counter: 0,
                partial_threshold: config.full_update_threshold,
            },
            last_update: None,
        };
        this.clear_pending_framebuffer();
        this.copy_pending_to_current()?;
        log_info!(
            "refresh engine ready: {}x{}, {}",
            config.geometry.width,
            config.geometry.height,
            this.mode.depth.name()
        );
        Ok(this)
    }

    // -----------------------------------------------------------------------
    // Mode
    // -----------------------------------------------------------------------

    /// Current mode.
    pub fn mode(&self) -> DisplayMode {
        DisplayMode {
            rails_enabled: self.power.is_enabled(),
            ..self.mode
        }
    }

    /// Active pixel depth.
    pub const fn pixel_depth(&self) -> PixelDepth {
        self.mode.depth
    }

    /// Switch pixel depth. Clears pending and current to white in the new
    /// packing and blocks partial updates until the next full update.
    /// No-op if `depth` is already active.
    pub fn set_pixel_depth(&mut self, depth: PixelDepth) -> Result<(), RefreshError> {
        if depth == self.mode.depth {
            return Ok(());
        }
        log_info!("depth {} -> {}", self.mode.depth.name(), depth.name());
        self.mode.depth = depth;
        self.clear_pending_framebuffer();
        self.copy_pending_to_current()?;
        self.mode.partial_blocked = true;
        Ok(())
    }

    /// Partial updates allowed before a full update is forced; 0 never
    /// forces one. Resets the partial counter.
    ///
    /// Partial updates are not blocked by this call: the next one runs as a
    /// partial and counts as the first toward the new threshold.
    pub fn set_full_update_threshold(&mut self, threshold: u32) {
        self.mode.partial_threshold = threshold;
        self.mode.partial_counter = 0;
    }

    // -----------------------------------------------------------------------
    // Pending image
    // -----------------------------------------------------------------------

    /// Fill pending with white for the active depth.
    pub fn clear_pending_framebuffer(&mut self) {
        let depth = self.mode.depth;
        let len = self.config.geometry.framebuffer_len(depth);
        self.buffers.fill(Role::Pending, len, depth.fill_value());
    }

    /// Pending image at the active depth, for direct writes between updates.
    pub fn pending_mut(&mut self) -> &mut [u8] {
        let len = self.config.geometry.framebuffer_len(self.mode.depth);
        let buf = self.buffers.get_mut(Role::Pending);
        let end = len.min(buf.len());
        buf.get_mut(..end).unwrap_or_default()
    }

    /// Bulk-copy a prepared image into the start of pending.
    pub fn write_pending(&mut self, image: &[u8]) -> Result<(), RefreshError> {
        let len = self.config.geometry.framebuffer_len(self.mode.depth);
        if image.len() > len {
            return Err(RefreshError::BufferTooSmall {
                needed: image.len(),
                actual: len,
            });
        }
        let dst = prefix_mut(self.buffers.get_mut(Role::Pending), image.len())?;
        self.copier.copy(dst, image);
        Ok(())
    }

    /// `embedded-graphics` target over pending.
    pub fn canvas(&mut self) -> PendingCanvas<'_> {
        let geometry = self.config.geometry;
        let depth = self.mode.depth;
        PendingCanvas::new(self.pending_mut(), geometry, depth)
    }

    /// Image the engine believes is on the panel.
    pub fn current(&self) -> &[u8] {
        self.buffers
            .image(Role::Current, &self.config.geometry, self.mode.depth)
    }

    // -----------------------------------------------------------------------
    // Waveforms and power
    // -----------------------------------------------------------------------

    /// Validate and activate a waveform for its (depth, kind).
    pub fn load_waveform(&mut self, waveform: Waveform) -> Result<(), RefreshError> {
        self.waveforms.load(waveform)?;
        Ok(())
    }

    /// Active waveform for (depth, kind).
    pub fn waveform(&self, depth: PixelDepth, kind: UpdateKind) -> &Waveform {
        self.waveforms.get(depth, kind)
    }

    /// Bring the rails up or down outside an update, e.g. to keep them up
    /// across several updates.
    pub fn set_rails(&mut self, enable: bool) -> Result<(), RefreshError> {
        self.power.set_rails(enable)?;
        Ok(())
    }

    /// True if every rail reports power-good.
    pub fn read_power_rail_health(&mut self) -> Result<bool, RefreshError> {
        Ok(self.power.read_health()?)
    }

    /// PMIC handle, for VCOM and temperature access between updates.
    pub fn pmic(&mut self) -> &mut R {
        self.power.rails_mut()
    }

    /// Panel bus, for inspection between updates.
    pub const fn bus(&self) -> &P {
        &self.bus
    }

    /// Tear down, returning the buffers and hardware handles.
    pub fn into_parts(self) -> (FramebufferSet<B>, PowerSequencer<R, L, D>, P, C) {
        (self.buffers, self.power, self.bus, self.copier)
    }

    /// Stats of the last completed update.
    pub const fn last_update(&self) -> Option<UpdateStats> {
        self.last_update
    }

    // -----------------------------------------------------------------------
    // Updates
    // -----------------------------------------------------------------------

    /// Full update: copy pending to current, run the clean passes, then
    /// every phase of the full waveform over current. Unblocks partial
    /// updates. Rails are left up when `keep_rails_on` is set.
    pub fn display(&mut self, keep_rails_on: bool) -> Result<UpdateStats, RefreshError> {
        let result = self.full_update();
        self.finish(result, keep_rails_on)
    }

    /// Partial update: drive only pixels that differ between current and
    /// pending, then copy pending to current. Promoted to a full update
    /// while blocked or once the threshold is reached.
    pub fn partial_update(&mut self, keep_rails_on: bool) -> Result<UpdateStats, RefreshError> {
        let m = self.mode;
        let over_threshold = m.partial_threshold != 0 && m.partial_counter >= m.partial_threshold;
        if m.partial_blocked || over_threshold {
            log_info!(
                "partial update promoted to full (blocked {}, count {})",
                m.partial_blocked,
                m.partial_counter
            );
            let result = self.full_update();
            let stats = self.finish(result, keep_rails_on)?;
            self.mode.partial_counter = 0;
            return Ok(stats);
        }

        let result = self.mask_update();
        self.finish(result, keep_rails_on)
    }

    fn full_update(&mut self) -> Result<UpdateStats, RefreshError> {
        let depth = self.mode.depth;
        let waveform = *self.waveforms.get(depth, UpdateKind::Full);
        let rails = self.rails_on()?;
        log_debug!("full update: {}", waveform.name);

        self.copy_pending_to_current()?;

        let mut stats = UpdateStats::new(UpdateKind::Full);
        for column in waveform.clean {
            let pass = self.clean_pass(rails, column, waveform.clean_cycle_delay)?;
            stats.clean_passes += 1;
            stats.rows += pass.rows;
        }
        for column in waveform.phases {
            self.luts.build(depth, column);
            let pass = self.stream(rails, Pass::Image, waveform.cycle_delay)?;
            stats.phase_passes += 1;
            stats.rows += pass.rows;
        }

        self.mode.partial_blocked = false;
        Ok(stats)
    }

    fn mask_update(&mut self) -> Result<UpdateStats, RefreshError> {
        let depth = self.mode.depth;
        let waveform = *self.waveforms.get(depth, UpdateKind::Partial);
        let rails = self.rails_on()?;
        log_debug!("partial update: {}", waveform.name);

        let len = self.config.geometry.image_len(depth);
        let (current, pending, scratch) = self.buffers.mask_inputs();
        build_mask(depth, prefix(current, len)?, prefix(pending, len)?, scratch)?;

        let mut stats = UpdateStats::new(UpdateKind::Partial);
        let pass = self.stream(rails, Pass::Mask, waveform.cycle_delay)?;
        stats.mask_passes += 1;
        stats.rows += pass.rows;
        for column in waveform.clean {
            let pass = self.clean_pass(rails, column, waveform.clean_cycle_delay)?;
            stats.clean_passes += 1;
            stats.rows += pass.rows;
        }

        self.copy_pending_to_current()?;
        if self.mode.partial_threshold != 0 {
            self.mode.partial_counter = self.mode.partial_counter.saturating_add(1);
        }
        Ok(stats)
    }

    /// Record stats and drop the rails unless asked to keep them, whether
    /// or not the update succeeded.
    fn finish(
        &mut self,
        result: Result<UpdateStats, RefreshError>,
        keep_rails_on: bool,
    ) -> Result<UpdateStats, RefreshError> {
        let rails_off = if keep_rails_on {
            Ok(())
        } else {
            self.power.set_rails(false)
        };
        let stats = result?;
        rails_off?;
        log_info!(
            "{} update done: {} clean, {} phase, {} mask passes",
            stats.kind.name(),
            stats.clean_passes,
            stats.phase_passes,
            stats.mask_passes
        );
        self.last_update = Some(stats);
        Ok(stats)
    }

    fn rails_on(&mut self) -> Result<RailsUp, RefreshError> {
        Ok(self.power.enable()?)
    }

    /// Uniform clean columns become a fill pass; anything else is a table
    /// pass over current.
    fn clean_pass(
        &mut self,
        rails: RailsUp,
        column: &PhaseColumn,
        cycle_delay: u32,
    ) -> Result<PassStats, RefreshError> {
        match uniform_code(column) {
            Some(code) => self.stream(rails, Pass::Fill(code.fill_byte()), cycle_delay),
            None => {
                self.luts.build(self.mode.depth, column);
                self.stream(rails, Pass::Image, cycle_delay)
            }
        }
    }

    fn stream(
        &mut self,
        rails: RailsUp,
        pass: Pass,
        cycle_delay: u32,
    ) -> Result<PassStats, RefreshError> {
        let geometry = self.config.geometry;
        let depth = self.mode.depth;
        let (decoder, source): (RowDecoder<'_>, &[u8]) = match pass {
            Pass::Fill(value) => (RowDecoder::Fill(value), NO_SOURCE),
            Pass::Image => {
                let decoder = match depth {
                    PixelDepth::FourBit => RowDecoder::Gray(self.luts.gray()),
                    PixelDepth::OneBit => RowDecoder::Mono(self.luts.mono()),
                };
                (decoder, self.buffers.image(Role::Current, &geometry, depth))
            }
            Pass::Mask => (
                RowDecoder::Mask,
                prefix(self.buffers.get(Role::Scratch), geometry.mask_len())?,
            ),
        };
        self.pipeline
            .stream_pass(rails, &mut self.bus, &mut self.copier, source, decoder, cycle_delay)
    }

    fn copy_pending_to_current(&mut self) -> Result<(), RefreshError> {
        let len = self.config.geometry.framebuffer_len(self.mode.depth);
        let (current, pending) = self.buffers.current_and_pending();
        self.copier.copy(prefix_mut(current, len)?, prefix(pending, len)?);
        Ok(())
    }
}

impl<B, R, L, D, P, C> core::fmt::Debug for DisplayController<B, R, L, D, P, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DisplayController")
            .field("config", &self.config)
            .field("mode", &self.mode)
            .field("last_update", &self.last_update)
            .finish_non_exhaustive()
    }
}

fn check_len(needed: usize, buf: &[u8]) -> Result<(), RefreshError> {
    prefix(buf, needed).map(|_| ())
}

fn prefix(buf: &[u8], len: usize) -> Result<&[u8], RefreshError> {
    let actual = buf.len();
    buf.get(..len).ok_or(RefreshError::BufferTooSmall {
        needed: len,
        actual,
    })
}

fn prefix_mut(buf: &mut [u8], len: usize) -> Result<&mut [u8], RefreshError> {
    let actual = buf.len();
    buf.get_mut(..len).ok_or(RefreshError::BufferTooSmall {
        needed: len,
        actual,
    })
}
