use std::borrow::Cow;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use bluemarble_core::{ColorPalette, TileCoords};

use crate::buffer::RgbaBuffer;
use crate::error::RenderError;
use crate::export::encode_png;
use crate::shred::Shred;
use crate::stats::{compute_tile_stats, TileStats};
use crate::template::Template;
use crate::tile::TILE_SIZE;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Which template's color toggles decide what gets hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPolicy {
    /// Every template is filtered by the palette of the first template in
    /// drawing order (the "active" template).
    #[default]
    ActiveTemplate,
    /// Every template is filtered by its own palette.
    OwnPalette,
}

/// Fixed parameters of a compositing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeOptions {
    /// Remote tile edge length in logical pixels.
    pub tile_size: u32,
    pub shred: Shred,
    pub filter_policy: FilterPolicy,
}

impl Default for CompositeOptions {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            shred: Shred::default(),
            filter_policy: FilterPolicy::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Output of compositing one remote tile.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// PNG of the upscaled tile with all overlays drawn.
    pub png: Vec<u8>,
    /// Statistics summed over every drawn piece.
    pub stats: TileStats,
    /// Templates with at least one piece on this tile.
    pub templates_drawn: usize,
    pub pieces_drawn: usize,
    /// Pieces whose statistics could not be computed (still drawn).
    pub stats_failures: usize,
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Drawing order
// ---------------------------------------------------------------------------

/// Enabled templates sorted by ascending `sort_id`; ties keep list order.
/// Earlier entries are drawn first, so later ones win overlapping pixels.
pub fn drawing_order(templates: &[Template]) -> Vec<&Template> {
    let mut ordered: Vec<&Template> = templates.iter().filter(|t| t.meta.enabled).collect();
    ordered.sort_by_key(|t| t.meta.sort_id);
    ordered
}

/// Whether any template in `templates` has a piece on `tile`.
pub fn any_touches(templates: &[&Template], tile: TileCoords) -> bool {
    templates.iter().any(|t| t.touches(tile))
}

// ---------------------------------------------------------------------------
// Color filter
// ---------------------------------------------------------------------------

/// Hide the block centers whose color is off-palette or disabled in
/// `palette_source`. Filler pixels are left as they are.
///
/// Borrows `bitmap` unchanged when no color is disabled.
pub fn apply_color_filter<'a>(
    bitmap: &'a RgbaBuffer,
    palette_source: &Template,
    shred: Shred,
) -> crate::Result<Cow<'a, RgbaBuffer>> {
    if !palette_source.has_disabled_colors() {
        return Ok(Cow::Borrowed(bitmap));
    }
    shred.check_bitmap(bitmap)?;

    let grid = ColorPalette::grid();
    let mut filtered = bitmap.clone();
    for (x, y) in shred.centers(bitmap.width, bitmap.height) {
        let Some([r, g, b, a]) = bitmap.pixel(x, y) else {
            continue;
        };
        if a == 0 {
            continue;
        }
        let key = grid.classify([r, g, b]);
        if !key.is_known() || !palette_source.is_color_enabled(key) {
            filtered.set_alpha(x, y, 0);
        }
    }
    Ok(Cow::Owned(filtered))
}

// ---------------------------------------------------------------------------
// Compositing
// ---------------------------------------------------------------------------

/// Draw every piece of `templates` that lands on `tile` over the remote tile
/// image and measure progress against it.
///
/// `templates` must already be in drawing order (see [`drawing_order`]).
/// Statistics are computed against a copy of the upscaled tile taken before
/// the first overlay is drawn. A failed statistics pass or color filter never
/// prevents the piece from being drawn.
pub fn composite_tile(
    tile_bytes: &[u8],
    tile: TileCoords,
    templates: &[&Template],
    options: &CompositeOptions,
) -> crate::Result<CompositeResult> {
    let start = Instant::now();
    if options.tile_size == 0 {
        return Err(RenderError::InvalidTileSize(options.tile_size));
    }
    let shred = options.shred;
    let m = shred.multiplier();
    let draw_size = options.tile_size * m;

    let remote = RgbaBuffer::decode(tile_bytes)?;
    let mut canvas = remote.scaled_nearest(draw_size, draw_size);
    drop(remote);
    let ground_truth = canvas.clone();

    let active = templates.first().copied();
    let mut stats = TileStats::default();
    let mut templates_drawn = 0;
    let mut pieces_drawn = 0;
    let mut stats_failures = 0;

    for &template in templates {
        let palette_source = match options.filter_policy {
            FilterPolicy::ActiveTemplate => active.unwrap_or(template),
            FilterPolicy::OwnPalette => template,
        };

        let mut drew_any = false;
        for (key, bitmap) in template.tiles_on(tile) {
            let (Some(x), Some(y)) = (key.pixel_x.checked_mul(m), key.pixel_y.checked_mul(m)) else {
                warn!(%key, "Piece offset out of range, skipping");
                continue;
            };
            drew_any = true;
            match compute_tile_stats(&ground_truth, key, bitmap, shred) {
                Ok(piece_stats) => stats += piece_stats,
                Err(e) => {
                    warn!(%key, "Failed to compute tile stats: {e}");
                    stats_failures += 1;
                }
            }

            match apply_color_filter(bitmap, palette_source, shred) {
                Ok(visible) => canvas.draw_over(&visible, x, y),
                Err(e) => {
                    warn!(%key, "Failed to apply color filter, drawing unfiltered: {e}");
                    canvas.draw_over(bitmap, x, y);
                }
            }
            pieces_drawn += 1;
        }
        if drew_any {
            templates_drawn += 1;
        }
    }
    drop(ground_truth);

    let png = encode_png(&canvas)?;
    let elapsed = start.elapsed();
    debug!(
        %tile,
        templates_drawn,
        pieces_drawn,
        painted = stats.painted,
        required = stats.required,
        wrong = stats.wrong,
        elapsed_us = elapsed.as_micros() as u64,
        "Tile composited"
    );

    Ok(CompositeResult {
        png,
        stats,
        templates_drawn,
        pieces_drawn,
        stats_failures,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateMeta;
    use bluemarble_core::{ColorKey, TemplateCoords, TileKey};

    const RED: [u8; 4] = [237, 28, 36, 255];
    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn options() -> CompositeOptions {
        CompositeOptions {
            tile_size: 10,
            ..CompositeOptions::default()
        }
    }

    fn template(sort_id: u32, pixels: &[[u8; 4]], anchor: TemplateCoords) -> Template {
        let mut img = RgbaBuffer::new(pixels.len() as u32, 1);
        for (x, px) in pixels.iter().enumerate() {
            img.set_pixel(x as u32, 0, *px);
        }
        let meta = TemplateMeta::new(format!("t{sort_id}"), sort_id, "!");
        Template::slice(meta, &img, anchor, 10, Shred::default())
            .unwrap()
            .template
    }

    fn blank_tile() -> Vec<u8> {
        encode_png(&RgbaBuffer::new(10, 10)).unwrap()
    }

    #[test]
    fn drawing_order_sorts_and_skips_disabled() {
        let anchor = TemplateCoords::new(0, 0, 0, 0);
        let mut hidden = template(0, &[RED], anchor);
        hidden.meta.enabled = false;
        let list = vec![template(5, &[RED], anchor), hidden, template(1, &[RED], anchor)];
        let order: Vec<u32> = drawing_order(&list).iter().map(|t| t.meta.sort_id).collect();
        assert_eq!(order, vec![1, 5]);
    }

    #[test]
    fn later_templates_win_overlaps() {
        let anchor = TemplateCoords::new(0, 0, 2, 2);
        let low = template(0, &[RED], anchor);
        let high = template(1, &[WHITE], anchor);
        let out = composite_tile(&blank_tile(), TileCoords::new(0, 0), &[&low, &high], &options())
            .unwrap();
        let canvas = RgbaBuffer::decode(&out.png).unwrap();
        assert_eq!((canvas.width, canvas.height), (30, 30));
        assert_eq!(canvas.pixel(7, 7), Some(WHITE));
        assert_eq!(out.templates_drawn, 2);
    }

    #[test]
    fn filter_hides_disabled_centers_only() {
        let anchor = TemplateCoords::new(0, 0, 0, 0);
        let mut t = template(0, &[RED, WHITE], anchor);
        t.set_color_enabled(ColorKey::Known([237, 28, 36]), false);
        let bitmap = t.tiles().values().next().unwrap();
        let filtered = apply_color_filter(bitmap, &t, Shred::default()).unwrap();
        assert!(matches!(filtered, Cow::Owned(_)));
        assert_eq!(filtered.pixel(1, 1).map(|p| p[3]), Some(0));
        assert_eq!(filtered.pixel(4, 1), Some(WHITE));
        for (x, y) in [(0, 0), (2, 2), (3, 0)] {
            assert_eq!(filtered.pixel(x, y), bitmap.pixel(x, y));
        }
    }

    #[test]
    fn filter_borrows_when_nothing_disabled() {
        let t = template(0, &[RED], TemplateCoords::new(0, 0, 0, 0));
        let bitmap = t.tiles().values().next().unwrap();
        let filtered = apply_color_filter(bitmap, &t, Shred::default()).unwrap();
        assert!(matches!(filtered, Cow::Borrowed(_)));
    }

    #[test]
    fn active_template_palette_filters_every_template() {
        let anchor = TemplateCoords::new(0, 0, 0, 0);
        let mut active = template(0, &[WHITE], anchor);
        active.set_color_enabled(ColorKey::Known([255, 255, 255]), false);
        let other = template(1, &[RED, WHITE], TemplateCoords::new(0, 0, 5, 5));
        let tile = TileCoords::new(0, 0);

        let shared = composite_tile(&blank_tile(), tile, &[&active, &other], &options()).unwrap();
        let canvas = RgbaBuffer::decode(&shared.png).unwrap();
        // White in the second template is hidden by the active template's toggle.
        assert_eq!(canvas.pixel(19, 16).map(|p| p[3]), Some(0));
        assert_eq!(canvas.pixel(16, 16), Some(RED));

        let own = CompositeOptions {
            filter_policy: FilterPolicy::OwnPalette,
            ..options()
        };
        let separate = composite_tile(&blank_tile(), tile, &[&active, &other], &own).unwrap();
        let canvas = RgbaBuffer::decode(&separate.png).unwrap();
        assert_eq!(canvas.pixel(19, 16), Some(WHITE));
    }

    #[test]
    fn overflowing_piece_offset_is_skipped() {
        let mut block = RgbaBuffer::new(3, 3);
        block.set_pixel(1, 1, RED);
        let tile = TileCoords::new(0, 0);
        let tiles = [(TileKey::new(tile, 1_431_655_766, 0), block)].into_iter().collect();
        let t = Template::from_tiles(TemplateMeta::new("far", 0, "!"), tiles, Shred::default());

        let out = composite_tile(&blank_tile(), tile, &[&t], &options()).unwrap();
        assert_eq!(out.pieces_drawn, 0);
        assert_eq!(out.templates_drawn, 0);
        let canvas = RgbaBuffer::decode(&out.png).unwrap();
        assert!((0..30).all(|x| canvas.pixel(x, 1).map(|p| p[3]) == Some(0)));
    }

    #[test]
    fn undecodable_tile_is_an_error() {
        let t = template(0, &[RED], TemplateCoords::new(0, 0, 0, 0));
        let result = composite_tile(b"not a png", TileCoords::new(0, 0), &[&t], &options());
        assert!(matches!(result, Err(RenderError::Decode(_))));
    }
}
