use std::collections::{BTreeMap, HashSet};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use bluemarble_core::{
    encode_png_data_url, ColorKey, ColorPalette, TemplateCoords, TileCoords, TileKey,
    ALPHA_THRESHOLD, IGNORE_COLOR,
};

use crate::buffer::RgbaBuffer;
use crate::error::RenderError;
use crate::export::encode_png;
use crate::shred::Shred;
use crate::tile::build_piece_grid;

// ---------------------------------------------------------------------------
// Color usage histogram
// ---------------------------------------------------------------------------

/// How often a color appears in a template, and whether it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorUsage {
    #[serde(default)]
    pub count: u64,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl ColorUsage {
    fn first_seen() -> Self {
        Self {
            count: 0,
            enabled: true,
        }
    }
}

/// Per-color usage keyed by palette color (or `other`).
pub type ColorHistogram = BTreeMap<ColorKey, ColorUsage>;

/// Identity and placement of a template, everything except its pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMeta {
    pub display_name: String,
    pub sort_id: u32,
    pub author_id: String,
    pub coords: Option<TemplateCoords>,
    pub enabled: bool,
}

impl TemplateMeta {
    pub fn new(display_name: impl Into<String>, sort_id: u32, author_id: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            sort_id,
            author_id: author_id.into(),
            coords: None,
            enabled: true,
        }
    }

    pub fn with_coords(mut self, coords: TemplateCoords) -> Self {
        self.coords = Some(coords);
        self
    }

    /// `"<sort_id> <author_id>"`, the key of this template in the document.
    pub fn storage_key(&self) -> String {
        format!("{} {}", self.sort_id, self.author_id)
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// One reference image, sliced into shredded pieces keyed by grid position.
#[derive(Debug, Clone)]
pub struct Template {
    pub meta: TemplateMeta,
    tiles: BTreeMap<TileKey, RgbaBuffer>,
    tile_prefixes: HashSet<TileCoords>,
    palette: ColorHistogram,
    required_pixel_count: u64,
}

/// A freshly sliced template plus the persisted form of each piece
/// (`data:image/png;base64,` URLs keyed like the bitmaps).
pub struct SlicedTemplate {
    pub template: Template,
    pub serialized: BTreeMap<TileKey, String>,
}

impl Template {
    /// Build a template from already-shredded pieces, deriving the prefix
    /// index, color histogram, and required-pixel count from the pixels.
    pub fn from_tiles(meta: TemplateMeta, tiles: BTreeMap<TileKey, RgbaBuffer>, shred: Shred) -> Self {
        let tile_prefixes = tiles.keys().map(|k| k.tile).collect();
        let mut palette = ColorHistogram::new();
        let mut required_pixel_count = 0;
        for bitmap in tiles.values() {
            required_pixel_count += scan_bitmap(bitmap, shred, &mut palette);
        }
        Self {
            meta,
            tiles,
            tile_prefixes,
            palette,
            required_pixel_count,
        }
    }

    /// Slice `image` anchored at `anchor` into tile-aligned shredded pieces.
    ///
    /// Pieces are shredded and PNG-encoded in parallel.
    pub fn slice(
        meta: TemplateMeta,
        image: &RgbaBuffer,
        anchor: TemplateCoords,
        tile_size: u32,
        shred: Shred,
    ) -> crate::Result<SlicedTemplate> {
        if tile_size == 0 {
            return Err(RenderError::InvalidTileSize(tile_size));
        }
        if image.width == 0 || image.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: image.width,
                height: image.height,
            });
        }
        anchor.validate(tile_size)?;

        let pieces = build_piece_grid(image.width, image.height, anchor, tile_size);
        debug!(
            pieces = pieces.len(),
            width = image.width,
            height = image.height,
            %anchor,
            "Slicing template"
        );

        let encoded: Vec<(TileKey, RgbaBuffer, String)> = pieces
            .par_iter()
            .map(|piece| {
                let bitmap = shred.expand(image, piece.src_x, piece.src_y, piece.width, piece.height);
                let png = encode_png(&bitmap)?;
                Ok((piece.key, bitmap, encode_png_data_url(&png)))
            })
            .collect::<crate::Result<_>>()?;

        let mut tiles = BTreeMap::new();
        let mut serialized = BTreeMap::new();
        for (key, bitmap, url) in encoded {
            tiles.insert(key, bitmap);
            serialized.insert(key, url);
        }

        let template = Self::from_tiles(meta.with_coords(anchor), tiles, shred);
        info!(
            name = %template.meta.display_name,
            tiles = template.tiles.len(),
            required = template.required_pixel_count,
            colors = template.palette.len(),
            "Template sliced"
        );
        Ok(SlicedTemplate {
            template,
            serialized,
        })
    }

    pub fn storage_key(&self) -> String {
        self.meta.storage_key()
    }

    pub fn tiles(&self) -> &BTreeMap<TileKey, RgbaBuffer> {
        &self.tiles
    }

    pub fn tile_prefixes(&self) -> &HashSet<TileCoords> {
        &self.tile_prefixes
    }

    /// Whether any piece of this template lands on `tile`.
    #[inline]
    pub fn touches(&self, tile: TileCoords) -> bool {
        self.tile_prefixes.contains(&tile)
    }

    /// All pieces landing on `tile`, in key order.
    pub fn tiles_on(&self, tile: TileCoords) -> impl Iterator<Item = (&TileKey, &RgbaBuffer)> {
        let start = TileKey::new(tile, 0, 0);
        let end = TileKey::new(tile, u32::MAX, u32::MAX);
        self.tiles.range(start..=end)
    }

    pub fn palette(&self) -> &ColorHistogram {
        &self.palette
    }

    pub fn required_pixel_count(&self) -> u64 {
        self.required_pixel_count
    }

    /// Whether `key` should be drawn. Colors the template never used count
    /// as enabled.
    #[inline]
    pub fn is_color_enabled(&self, key: ColorKey) -> bool {
        self.palette.get(&key).map_or(true, |u| u.enabled)
    }

    pub fn has_disabled_colors(&self) -> bool {
        self.palette.values().any(|u| !u.enabled)
    }

    /// Toggle one color. Returns `false` if the template does not use it.
    pub fn set_color_enabled(&mut self, key: ColorKey, enabled: bool) -> bool {
        match self.palette.get_mut(&key) {
            Some(usage) => {
                usage.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn set_all_colors_enabled(&mut self, enabled: bool) {
        for usage in self.palette.values_mut() {
            usage.enabled = enabled;
        }
    }

    /// Overlay persisted enabled flags onto the recomputed histogram.
    ///
    /// Known colors take the stored flag; colors only present in storage are
    /// kept with their stored count. Malformed keys are skipped.
    pub fn merge_persisted_palette(&mut self, persisted: &BTreeMap<String, ColorUsage>) {
        for (raw_key, stored) in persisted {
            let key: ColorKey = match raw_key.parse() {
                Ok(k) => k,
                Err(e) => {
                    warn!("Skipping persisted palette entry: {e}");
                    continue;
                }
            };
            self.palette
                .entry(key)
                .and_modify(|u| u.enabled = stored.enabled)
                .or_insert(*stored);
        }
    }

    /// Histogram in its persisted form (`"r,g,b"` / `"other"` keys).
    pub fn palette_for_storage(&self) -> BTreeMap<String, ColorUsage> {
        self.palette
            .iter()
            .map(|(k, u)| (k.to_string(), *u))
            .collect()
    }
}

/// Count the center pixels of one shredded bitmap into `palette`.
///
/// Returns how many of them are required: opaque, not the ignore color, and a
/// grid palette color.
fn scan_bitmap(bitmap: &RgbaBuffer, shred: Shred, palette: &mut ColorHistogram) -> u64 {
    let grid = ColorPalette::grid();
    let mut required = 0;
    for (x, y) in shred.centers(bitmap.width, bitmap.height) {
        let Some([r, g, b, a]) = bitmap.pixel(x, y) else {
            continue;
        };
        if a < ALPHA_THRESHOLD {
            continue;
        }
        let rgb = [r, g, b];
        let key = grid.classify(rgb);
        palette.entry(key).or_insert_with(ColorUsage::first_seen).count += 1;
        if key.is_known() && rgb != IGNORE_COLOR {
            required += 1;
        }
    }
    required
}
