use crate::error::RenderError;

/// An RGBA pixel buffer (straight alpha).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaBuffer {
    pub width: u32,
    pub height: u32,
    /// RGBA pixel data, 4 bytes per pixel, row-major order.
    pub pixels: Vec<u8>,
}

impl RgbaBuffer {
    /// Create a new fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    /// Wrap existing RGBA data, checking that its length matches the dimensions.
    pub fn from_raw(width: u32, height: u32, pixels: Vec<u8>) -> crate::Result<Self> {
        if pixels.len() != width as usize * height as usize * 4 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Decode any supported image format (PNG for tiles) into RGBA.
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_raw(width, height, rgba.into_raw())
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// RGBA at `(x, y)`, or `None` outside the buffer.
    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.index(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.pixels[i..i + 4].copy_from_slice(&rgba);
        }
    }

    /// Overwrite only the alpha channel at `(x, y)`.
    #[inline]
    pub fn set_alpha(&mut self, x: u32, y: u32, alpha: u8) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.pixels[i + 3] = alpha;
        }
    }

    /// Nearest-neighbor resample to `width × height`. Integer upscales repeat
    /// every source pixel exactly.
    pub fn scaled_nearest(&self, width: u32, height: u32) -> Self {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut out = Self::new(width, height);
        if self.width == 0 || self.height == 0 {
            return out;
        }
        let row_bytes = width as usize * 4;
        for y in 0..height {
            let sy = (y as u64 * self.height as u64 / height as u64) as u32;
            let dst_row = y as usize * row_bytes;
            for x in 0..width {
                let sx = (x as u64 * self.width as u64 / width as u64) as u32;
                let s = self.index(sx, sy);
                let d = dst_row + x as usize * 4;
                out.pixels[d..d + 4].copy_from_slice(&self.pixels[s..s + 4]);
            }
        }
        out
    }

    /// Copy `src` into this buffer at `(x, y)` without blending, clipped to
    /// the buffer bounds.
    pub fn blit(&mut self, src: &RgbaBuffer, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - x) as usize * 4;
        for row in 0..src.height.min(self.height - y) {
            let s = src.index(0, row);
            let d = self.index(x, y + row);
            self.pixels[d..d + copy_w].copy_from_slice(&src.pixels[s..s + copy_w]);
        }
    }

    /// Source-over composite `src` onto this buffer at `(x, y)`, clipped to
    /// the buffer bounds. No smoothing, no resampling.
    pub fn draw_over(&mut self, src: &RgbaBuffer, x: u32, y: u32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let copy_w = src.width.min(self.width - x) as usize;
        for row in 0..src.height.min(self.height - y) {
            let s_row = src.index(0, row);
            let d_row = self.index(x, y + row);
            for col in 0..copy_w {
                let s = s_row + col * 4;
                let d = d_row + col * 4;
                blend_over(&mut self.pixels[d..d + 4], &src.pixels[s..s + 4]);
            }
        }
    }
}

/// Straight-alpha "source over" for one pixel.
#[inline]
fn blend_over(dst: &mut [u8], src: &[u8]) {
    let sa = src[3] as u32;
    if sa == 0 {
        return;
    }
    if sa == 255 {
        dst.copy_from_slice(src);
        return;
    }
    let da = dst[3] as u32;
    let dst_weight = da * (255 - sa) / 255;
    let out_a = sa + dst_weight;
    for c in 0..3 {
        let v = (src[c] as u32 * sa + dst[c] as u32 * dst_weight + out_a / 2) / out_a;
        dst[c] = v.min(255) as u8;
    }
    dst[3] = out_a.min(255) as u8;
}
