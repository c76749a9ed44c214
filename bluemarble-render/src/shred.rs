//! Shred encoding: one logical pixel drawn as the center of an odd N×N block.
//!
//! Only the center pixel of each block carries the template color. The other
//! pixels are filler so the grid lines of the remote canvas stay visible
//! between template pixels.

use bluemarble_core::{ALPHA_THRESHOLD, IGNORE_COLOR};

use crate::buffer::RgbaBuffer;
use crate::error::RenderError;

/// Default block size: a 1×1 pixel becomes the center of a 3×3 block.
pub const DEFAULT_DRAW_MULTIPLIER: u32 = 3;

/// Alpha of the checkerboard filler drawn around ignore-color pixels.
/// Below [`ALPHA_THRESHOLD`] so it can never be read back as a real color.
const FILLER_ALPHA: u8 = 32;

/// A validated draw multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shred {
    multiplier: u32,
}

impl Shred {
    /// Rejects zero and even multipliers, which have no single center pixel.
    pub fn new(multiplier: u32) -> crate::Result<Self> {
        if multiplier == 0 || multiplier % 2 == 0 {
            return Err(RenderError::InvalidDrawMultiplier(multiplier));
        }
        Ok(Self { multiplier })
    }

    #[inline]
    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Offset of the center pixel inside a block, `(m − 1) / 2`.
    #[inline]
    pub fn center_offset(&self) -> u32 {
        (self.multiplier - 1) / 2
    }

    #[inline]
    pub fn is_center(&self, x: u32, y: u32) -> bool {
        let off = self.center_offset();
        x % self.multiplier == off && y % self.multiplier == off
    }

    /// Positions of every block center in a `width × height` bitmap, row by row.
    pub fn centers(&self, width: u32, height: u32) -> impl Iterator<Item = (u32, u32)> {
        let m = self.multiplier as usize;
        let off = self.center_offset();
        (off..height)
            .step_by(m)
            .flat_map(move |y| (off..width).step_by(m).map(move |x| (x, y)))
    }

    /// A shredded bitmap must consist of whole blocks.
    pub fn check_bitmap(&self, bitmap: &RgbaBuffer) -> crate::Result<()> {
        if bitmap.width % self.multiplier != 0 || bitmap.height % self.multiplier != 0 {
            return Err(RenderError::MisalignedBitmap {
                width: bitmap.width,
                height: bitmap.height,
                multiplier: self.multiplier,
            });
        }
        Ok(())
    }

    /// Expand the `width × height` region of `source` at `(src_x, src_y)` into
    /// a shredded bitmap of `width·m × height·m`.
    pub fn expand(
        &self,
        source: &RgbaBuffer,
        src_x: u32,
        src_y: u32,
        width: u32,
        height: u32,
    ) -> RgbaBuffer {
        let m = self.multiplier;
        let off = self.center_offset();
        let mut out = RgbaBuffer::new(width * m, height * m);
        for ly in 0..height {
            for lx in 0..width {
                let Some(px) = source.pixel(src_x + lx, src_y + ly) else {
                    continue;
                };
                let (bx, by) = (lx * m, ly * m);
                let marks_ignored = px[3] >= ALPHA_THRESHOLD && px[..3] == IGNORE_COLOR;
                if marks_ignored {
                    for dy in 0..m {
                        for dx in 0..m {
                            let shade = if (dx + dy) % 2 == 0 { 0 } else { 255 };
                            out.set_pixel(bx + dx, by + dy, [shade, shade, shade, FILLER_ALPHA]);
                        }
                    }
                }
                out.set_pixel(bx + off, by + off, px);
            }
        }
        out
    }
}

impl Default for Shred {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_DRAW_MULTIPLIER,
        }
    }
}
