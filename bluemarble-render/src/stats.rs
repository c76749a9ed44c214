//! Per-tile completion statistics.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

use bluemarble_core::{ColorPalette, TileKey, ALPHA_THRESHOLD};

use crate::buffer::RgbaBuffer;
use crate::error::RenderError;
use crate::shred::Shred;

/// Painted / required / wrong counts for one remote tile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileStats {
    pub painted: u64,
    pub required: u64,
    pub wrong: u64,
}

impl AddAssign for TileStats {
    fn add_assign(&mut self, rhs: Self) {
        self.painted += rhs.painted;
        self.required += rhs.required;
        self.wrong += rhs.wrong;
    }
}

/// Compare one shredded template piece against the ground-truth tile.
///
/// `ground_truth` is the remote tile already upscaled by the shred multiplier
/// and captured before any overlay was drawn. Only block centers are read.
///
/// - template transparent: not required; an opaque palette color on the grid
///   there counts as wrong.
/// - template opaque but not a palette color: ignored.
/// - otherwise required; grid transparent is unpainted, exact RGB match is
///   painted, anything else is wrong.
pub fn compute_tile_stats(
    ground_truth: &RgbaBuffer,
    key: &TileKey,
    bitmap: &RgbaBuffer,
    shred: Shred,
) -> crate::Result<TileStats> {
    shred.check_bitmap(bitmap)?;
    if ground_truth.width % shred.multiplier() != 0 || ground_truth.height % shred.multiplier() != 0 {
        return Err(RenderError::MisalignedBitmap {
            width: ground_truth.width,
            height: ground_truth.height,
            multiplier: shred.multiplier(),
        });
    }

    let grid = ColorPalette::grid();
    let offset_x = key.pixel_x as u64 * shred.multiplier() as u64;
    let offset_y = key.pixel_y as u64 * shred.multiplier() as u64;
    let mut stats = TileStats::default();

    for (x, y) in shred.centers(bitmap.width, bitmap.height) {
        let gx = x as u64 + offset_x;
        let gy = y as u64 + offset_y;
        if gx >= ground_truth.width as u64 || gy >= ground_truth.height as u64 {
            continue;
        }
        let (Some(t), Some(g)) = (bitmap.pixel(x, y), ground_truth.pixel(gx as u32, gy as u32)) else {
            continue;
        };

        if t[3] < ALPHA_THRESHOLD {
            if g[3] >= ALPHA_THRESHOLD && grid.contains([g[0], g[1], g[2]]) {
                stats.wrong += 1;
            }
            continue;
        }
        if !grid.contains([t[0], t[1], t[2]]) {
            continue;
        }

        stats.required += 1;
        // Transparent on the grid is unpainted, neither painted nor wrong.
        if g[3] >= ALPHA_THRESHOLD {
            if g[..3] == t[..3] {
                stats.painted += 1;
            } else {
                stats.wrong += 1;
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluemarble_core::TileCoords;

    fn one_pixel_bitmap(rgba: [u8; 4]) -> RgbaBuffer {
        let mut src = RgbaBuffer::new(1, 1);
        src.set_pixel(0, 0, rgba);
        Shred::default().expand(&src, 0, 0, 1, 1)
    }

    fn ground_truth_with(x: u32, y: u32, rgba: [u8; 4]) -> RgbaBuffer {
        let mut tile = RgbaBuffer::new(10, 10);
        tile.set_pixel(x, y, rgba);
        tile.scaled_nearest(30, 30)
    }

    fn key(px: u32, py: u32) -> TileKey {
        TileKey::new(TileCoords::new(0, 0), px, py)
    }

    #[test]
    fn transparent_template_over_palette_color_is_wrong() {
        let bitmap = one_pixel_bitmap([0, 0, 0, 0]);
        let gt = ground_truth_with(2, 3, [255, 255, 255, 255]);
        let stats = compute_tile_stats(&gt, &key(2, 3), &bitmap, Shred::default()).unwrap();
        assert_eq!(stats, TileStats { painted: 0, required: 0, wrong: 1 });
    }

    #[test]
    fn transparent_template_over_foreign_color_is_ignored() {
        let bitmap = one_pixel_bitmap([0, 0, 0, 0]);
        let gt = ground_truth_with(2, 3, [1, 2, 3, 255]);
        let stats = compute_tile_stats(&gt, &key(2, 3), &bitmap, Shred::default()).unwrap();
        assert_eq!(stats, TileStats::default());
    }

    #[test]
    fn off_palette_template_pixels_are_skipped() {
        let bitmap = one_pixel_bitmap([222, 250, 206, 255]);
        let gt = ground_truth_with(0, 0, [0, 0, 0, 255]);
        let stats = compute_tile_stats(&gt, &key(0, 0), &bitmap, Shred::default()).unwrap();
        assert_eq!(stats, TileStats::default());
    }

    #[test]
    fn pieces_past_the_tile_edge_are_clipped() {
        let bitmap = one_pixel_bitmap([237, 28, 36, 255]);
        let gt = RgbaBuffer::new(30, 30);
        let stats = compute_tile_stats(&gt, &key(10, 0), &bitmap, Shred::default()).unwrap();
        assert_eq!(stats, TileStats::default());
    }

    #[test]
    fn misaligned_bitmap_is_an_error() {
        let gt = RgbaBuffer::new(30, 30);
        let bitmap = RgbaBuffer::new(4, 3);
        assert!(compute_tile_stats(&gt, &key(0, 0), &bitmap, Shred::default()).is_err());
    }

    #[test]
    fn stats_accumulate() {
        let mut total = TileStats { painted: 1, required: 2, wrong: 3 };
        total += TileStats { painted: 10, required: 20, wrong: 30 };
        assert_eq!(total, TileStats { painted: 11, required: 22, wrong: 33 });
    }
}
