//! Framebuffer ownership
//!
//! Three large buffers, usually in external SDRAM, each holding exactly
//! one role. The roles are fixed for the life of the set: updates copy
//! pending into current instead of exchanging the two, so no code path
//! ever needs to rotate them.

use crate::config::PanelGeometry;
use crate::error::RefreshError;
use crate::waveform::PixelDepth;

/// What a buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Image currently on the panel
    Current,
    /// Image the caller is drawing
    Pending,
    /// Difference mask workspace
    Scratch,
}

/// The engine's three framebuffers.
///
/// `B` is anything that derefs to bytes: `&'static mut [u8]` carved out
/// of SDRAM on target, `Vec<u8>` or arrays in tests.
#[derive(Debug)]
pub struct FramebufferSet<B> {
    current: B,
    pending: B,
    scratch: B,
}

fn check_len(needed: usize, buf: &[u8]) -> Result<(), RefreshError> {
    if buf.len() < needed {
        return Err(RefreshError::BufferTooSmall {
            needed,
            actual: buf.len(),
        });
    }
    Ok(())
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FramebufferSet<B> {
    /// Take ownership of three buffers sized for `geometry`.
    ///
    /// Current and pending must hold a 4-bit image so depth switches never
    /// reallocate; scratch must hold a difference mask.
    pub fn new(
        geometry: &PanelGeometry,
        current: B,
        pending: B,
        scratch: B,
    ) -> Result<Self, RefreshError> {
        let fb = geometry.framebuffer_capacity();
        check_len(fb, current.as_ref())?;
        check_len(fb, pending.as_ref())?;
        check_len(geometry.mask_len(), scratch.as_ref())?;
        Ok(Self {
            current,
            pending,
            scratch,
        })
    }

    /// Buffer holding `role`.
    pub fn get(&self, role: Role) -> &[u8] {
        match role {
            Role::Current => self.current.as_ref(),
            Role::Pending => self.pending.as_ref(),
            Role::Scratch => self.scratch.as_ref(),
        }
    }

    /// Buffer holding `role`, mutably.
    pub fn get_mut(&mut self, role: Role) -> &mut [u8] {
        match role {
            Role::Current => self.current.as_mut(),
            Role::Pending => self.pending.as_mut(),
            Role::Scratch => self.scratch.as_mut(),
        }
    }

    /// Current (mutable) and pending, for the pending → current copy.
    pub fn current_and_pending(&mut self) -> (&mut [u8], &[u8]) {
        (self.current.as_mut(), self.pending.as_ref())
    }

    /// Current, pending and scratch, for building the difference mask.
    pub fn mask_inputs(&mut self) -> (&[u8], &[u8], &mut [u8]) {
        (
            self.current.as_ref(),
            self.pending.as_ref(),
            self.scratch.as_mut(),
        )
    }

    /// Fill the first `len` bytes of `role` with `value`.
    pub fn fill(&mut self, role: Role, len: usize, value: u8) {
        let buf = self.get_mut(role);
        let end = len.min(buf.len());
        if let Some(region) = buf.get_mut(..end) {
            region.fill(value);
        }
    }

    /// Active image region of `role` at `depth`.
    pub fn image(&self, role: Role, geometry: &PanelGeometry, depth: PixelDepth) -> &[u8] {
        let buf = self.get(role);
        let len = geometry.framebuffer_len(depth).min(buf.len());
        buf.get(..len).unwrap_or_default()
    }
}
