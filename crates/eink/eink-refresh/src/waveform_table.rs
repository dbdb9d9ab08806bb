//! Active waveform per (depth, kind) slot.

use crate::error::WaveformError;
use crate::waveform::{default_waveform, PixelDepth, UpdateKind, Waveform, WAVEFORM_TAG};

/// Four slots, each either a loaded waveform or the compiled-in default.
#[derive(Debug, Clone, Default)]
pub struct WaveformTable {
    // Indexed by `slot()`: 1bpp full, 1bpp partial, 4bpp full, 4bpp partial.
    slots: [Option<Waveform>; 4],
}

const fn slot(depth: PixelDepth, kind: UpdateKind) -> usize {
    match (depth, kind) {
        (PixelDepth::OneBit, UpdateKind::Full) => 0,
        (PixelDepth::OneBit, UpdateKind::Partial) => 1,
        (PixelDepth::FourBit, UpdateKind::Full) => 2,
        (PixelDepth::FourBit, UpdateKind::Partial) => 3,
    }
}

impl WaveformTable {
    /// Table serving only the defaults.
    pub const fn new() -> Self {
        Self { slots: [None; 4] }
    }

    /// Validate `waveform` and make it the active one for its own
    /// (depth, kind). On error the slot is left untouched.
    pub fn load(&mut self, waveform: Waveform) -> Result<(), WaveformError> {
        if waveform.tag != WAVEFORM_TAG {
            log_warn!("waveform rejected: bad tag {}", waveform.tag);
            return Err(WaveformError::BadTag {
                found: waveform.tag,
            });
        }
        if waveform.phases.is_empty() {
            log_warn!("waveform rejected: {} has no phases", waveform.name);
            return Err(WaveformError::NoPhases);
        }

        if let Some(s) = self.slots.get_mut(slot(waveform.depth, waveform.kind)) {
            *s = Some(waveform);
        }
        log_info!(
            "waveform {} loaded ({} {}, {} phases, {} clean)",
            waveform.name,
            waveform.depth.name(),
            waveform.kind.name(),
            waveform.phase_count(),
            waveform.clean_phase_count()
        );
        Ok(())
    }

    /// Active waveform for the slot.
    pub fn get(&self, depth: PixelDepth, kind: UpdateKind) -> &Waveform {
        match self.slots.get(slot(depth, kind)) {
            Some(Some(w)) => w,
            _ => default_waveform(depth, kind),
        }
    }

    /// Drop a loaded waveform, falling back to the default.
    pub fn reset(&mut self, depth: PixelDepth, kind: UpdateKind) {
        if let Some(s) = self.slots.get_mut(slot(depth, kind)) {
            *s = None;
        }
    }

    /// True if the slot still serves the compiled-in default.
    pub fn is_default(&self, depth: PixelDepth, kind: UpdateKind) -> bool {
        matches!(self.slots.get(slot(depth, kind)), Some(None))
    }
}
