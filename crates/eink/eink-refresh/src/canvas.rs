//! `embedded-graphics` drawing into the pending framebuffer.

// Safety: coordinates are checked against the geometry before any index
// is formed, and indices go through `get_mut`.
#![allow(clippy::arithmetic_side_effects)]

use embedded_graphics::{
    pixelcolor::{Gray4, GrayColor},
    prelude::*,
};

use crate::config::PanelGeometry;
use crate::waveform::PixelDepth;

/// Draw target over the pending image at the active depth.
///
/// 1-bit: luma below 8 sets the pixel black, anything else white. 4-bit:
/// luma is stored as is. Pixels outside the panel are ignored.
pub struct PendingCanvas<'a> {
    buf: &'a mut [u8],
    geometry: PanelGeometry,
    depth: PixelDepth,
}

impl<'a> PendingCanvas<'a> {
    /// Wrap `buf`, packed for `depth`.
    pub fn new(buf: &'a mut [u8], geometry: PanelGeometry, depth: PixelDepth) -> Self {
        Self {
            buf,
            geometry,
            depth,
        }
    }

    /// Packing of the underlying buffer.
    pub const fn depth(&self) -> PixelDepth {
        self.depth
    }

    fn set_pixel(&mut self, point: Point, color: Gray4) {
        let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) else {
            return;
        };
        if x >= self.geometry.width_px() || y >= self.geometry.rows() {
            return;
        }
        let row = self.geometry.source_row_bytes(self.depth);
        let luma = color.luma();
        match self.depth {
            PixelDepth::OneBit => {
                let bit = 0x80 >> (x % 8);
                if let Some(byte) = self.buf.get_mut(y * row + x / 8) {
                    if luma < 8 {
                        *byte |= bit;
                    } else {
                        *byte &= !bit;
                    }
                }
            }
            PixelDepth::FourBit => {
                if let Some(byte) = self.buf.get_mut(y * row + x / 2) {
                    *byte = if x % 2 == 0 {
                        (*byte & 0xF0) | luma
                    } else {
                        (*byte & 0x0F) | (luma << 4)
                    };
                }
            }
        }
    }

    fn fill_byte(&self, color: Gray4) -> u8 {
        let luma = color.luma();
        match self.depth {
            PixelDepth::OneBit if luma < 8 => 0xFF,
            PixelDepth::OneBit => 0x00,
            PixelDepth::FourBit => luma << 4 | luma,
        }
    }
}

impl DrawTarget for PendingCanvas<'_> {
    type Color = Gray4;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let value = self.fill_byte(color);
        let len = self.geometry.image_len(self.depth).min(self.buf.len());
        if let Some(image) = self.buf.get_mut(..len) {
            image.fill(value);
        }
        Ok(())
    }
}

impl OriginDimensions for PendingCanvas<'_> {
    fn size(&self) -> Size {
        Size::new(self.geometry.width, self.geometry.height)
    }
}
