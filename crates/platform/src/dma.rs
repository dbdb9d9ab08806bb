//! Bulk copy abstraction
//!
//! The refresh engine moves framebuffer data between external SDRAM and
//! internal SRAM through a memory-to-memory DMA engine (MDMA on STM32H7).
//! The copy is blocking: the implementation starts the transfer and
//! busy-polls its completion flag before returning.
//!
//! Completion is not bounded. An unresponsive engine hangs the caller,
//! which matches how the hardware behaves when the bus locks up.

/// Transfer granularity the DMA engine requires (word-sized beats).
pub const DMA_ALIGN: usize = 4;

/// Round `len` up to the next multiple of [`DMA_ALIGN`].
///
/// Framebuffers are allocated with this length so that a whole-buffer copy
/// never ends on a partial beat.
#[inline]
#[must_use]
// Safety: rem is in 1..DMA_ALIGN, so DMA_ALIGN - rem cannot underflow.
#[allow(clippy::arithmetic_side_effects)]
pub const fn dma_aligned_len(len: usize) -> usize {
    match len % DMA_ALIGN {
        0 => len,
        rem => len.saturating_add(DMA_ALIGN - rem),
    }
}

/// Blocking memory-to-memory copy primitive.
///
/// Implementations copy `src.len().min(dst.len())` bytes. Callers always
/// pass equal-length slices; the `min` keeps a short destination from
/// turning into an out-of-bounds write on hardware.
pub trait BulkCopy {
    /// Copy `src` into `dst` and wait for completion.
    fn copy(&mut self, dst: &mut [u8], src: &[u8]);
}

impl<T: BulkCopy + ?Sized> BulkCopy for &mut T {
    fn copy(&mut self, dst: &mut [u8], src: &[u8]) {
        (**self).copy(dst, src);
    }
}

/// CPU fallback: `copy_from_slice` on the overlapping prefix.
///
/// Used on the host and on targets where both buffers live in core-coupled
/// memory and a DMA round-trip costs more than the copy itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct CpuCopy;

impl BulkCopy for CpuCopy {
    fn copy(&mut self, dst: &mut [u8], src: &[u8]) {
        let n = dst.len().min(src.len());
        if let (Some(d), Some(s)) = (dst.get_mut(..n), src.get(..n)) {
            d.copy_from_slice(s);
        }
    }
}
