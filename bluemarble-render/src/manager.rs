//! Owns the live template set, the persisted document, and the per-tile
//! progress map, and turns remote tiles into composited tiles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use bluemarble_core::{
    decode_data_url, encode_number, ColorKey, TemplateCoords, TileCoords, TileKey, AUTHOR_ALPHABET,
};

use crate::buffer::RgbaBuffer;
use crate::composite::{any_touches, composite_tile, drawing_order, CompositeOptions, FilterPolicy};
use crate::document::{parse_storage_key, StoredTemplate, TemplateDocument, STORAGE_KEY};
use crate::error::RenderError;
use crate::progress::{ProgressReport, ProgressTracker};
use crate::shred::{Shred, DEFAULT_DRAW_MULTIPLIER};
use crate::stats::TileStats;
use crate::status::{format_count, status_message, StatusSink};
use crate::storage::KeyValueStore;
use crate::template::{ColorHistogram, Template, TemplateMeta};
use crate::tile::TILE_SIZE;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    pub tile_size: u32,
    /// Shred block edge; must be odd.
    pub draw_multiplier: u32,
    pub filter_policy: FilterPolicy,
    pub draw_templates: bool,
    /// Numeric user id encoded into the author id of new templates.
    pub user_id: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            draw_multiplier: DEFAULT_DRAW_MULTIPLIER,
            filter_policy: FilterPolicy::default(),
            draw_templates: true,
            user_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Result of handing one remote tile to the manager.
#[derive(Debug, Clone)]
pub struct TileOutcome {
    /// Composited PNG, or the input bytes when nothing was drawn.
    pub bytes: Vec<u8>,
    pub composited: bool,
    /// Statistics for this tile, when it was composited.
    pub stats: Option<TileStats>,
    pub report: Option<ProgressReport>,
    pub status: Option<String>,
}

impl TileOutcome {
    fn passthrough(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
            composited: false,
            stats: None,
            report: None,
            status: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// `false` when the document belongs to another application.
    pub recognized: bool,
    pub templates: usize,
    pub skipped_tiles: usize,
}

/// Read-only view of one template for listings.
#[derive(Debug, Clone)]
pub struct TemplateSummary {
    pub storage_key: String,
    pub display_name: String,
    pub coords: Option<TemplateCoords>,
    pub enabled: bool,
    pub tile_count: usize,
    pub required_pixel_count: u64,
    pub palette: ColorHistogram,
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TemplateSet {
    templates: Vec<Template>,
    document: Option<TemplateDocument>,
}

impl TemplateSet {
    /// Copy the in-memory flags of `template` into its document entry.
    fn sync_entry(document: &mut Option<TemplateDocument>, template: &Template) {
        if let Some(stored) = document
            .as_mut()
            .and_then(|doc| doc.templates.get_mut(&template.storage_key()))
        {
            stored.enabled = template.meta.enabled;
            stored.palette = template.palette_for_storage();
        }
    }
}

pub struct TemplateManager {
    options: CompositeOptions,
    set: RwLock<TemplateSet>,
    progress: Mutex<ProgressTracker>,
    draw_templates: AtomicBool,
    user_id: AtomicU64,
    store: Arc<dyn KeyValueStore>,
    status: Arc<dyn StatusSink>,
}

impl TemplateManager {
    pub fn new(
        config: &ManagerConfig,
        store: Arc<dyn KeyValueStore>,
        status: Arc<dyn StatusSink>,
    ) -> crate::Result<Self> {
        if config.tile_size == 0 {
            return Err(RenderError::InvalidTileSize(config.tile_size));
        }
        let shred = Shred::new(config.draw_multiplier)?;
        Ok(Self {
            options: CompositeOptions {
                tile_size: config.tile_size,
                shred,
                filter_policy: config.filter_policy,
            },
            set: RwLock::new(TemplateSet::default()),
            progress: Mutex::new(ProgressTracker::new()),
            draw_templates: AtomicBool::new(config.draw_templates),
            user_id: AtomicU64::new(config.user_id.unwrap_or(0)),
            store,
            status,
        })
    }

    pub fn options(&self) -> &CompositeOptions {
        &self.options
    }

    fn read_set(&self) -> RwLockReadGuard<'_, TemplateSet> {
        self.set.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_set(&self) -> RwLockWriteGuard<'_, TemplateSet> {
        self.set.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_progress(&self) -> MutexGuard<'_, ProgressTracker> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- switches -----------------------------------------------------------

    pub fn set_templates_should_be_drawn(&self, value: bool) {
        self.draw_templates.store(value, Ordering::Relaxed);
    }

    pub fn templates_should_be_drawn(&self) -> bool {
        self.draw_templates.load(Ordering::Relaxed)
    }

    /// Author id source for templates created after this call.
    pub fn set_user_id(&self, user_id: u64) {
        self.user_id.store(user_id, Ordering::Relaxed);
    }

    // -- creation -----------------------------------------------------------

    /// Slice `image` into a new template anchored at `coords`, replace the
    /// live template list with it, and persist the document.
    ///
    /// Returns the new template's storage key. Invalid input is reported to
    /// the status sink and leaves the manager untouched.
    pub fn create_template(
        &self,
        image: &RgbaBuffer,
        name: &str,
        coords: TemplateCoords,
    ) -> crate::Result<String> {
        let built = encode_number(self.user_id.load(Ordering::Relaxed), AUTHOR_ALPHABET)
            .map_err(RenderError::from)
            .and_then(|author| {
                let meta = TemplateMeta::new(name, 0, author);
                Template::slice(meta, image, coords, self.options.tile_size, self.options.shred)
            });
        let sliced = match built {
            Ok(sliced) => sliced,
            Err(e) => {
                self.status.report_error(&format!("Failed to create template: {e}"));
                return Err(e);
            }
        };

        let template = sliced.template;
        let storage_key = template.storage_key();
        let total_pixels = template.required_pixel_count();
        let stored = StoredTemplate {
            name: name.to_string(),
            coords: coords.to_string(),
            enabled: true,
            tiles: sliced
                .serialized
                .into_iter()
                .map(|(key, url)| (key.to_string(), url))
                .collect(),
            palette: template.palette_for_storage(),
        };

        let json = {
            let mut set = self.write_set();
            let document = set.document.get_or_insert_with(TemplateDocument::empty);
            document.templates.insert(storage_key.clone(), stored);
            let json = document.to_json_pretty()?;
            // One live template at a time.
            set.templates.clear();
            set.templates.push(template);
            json
        };
        info!(key = %storage_key, name, %coords, "Template created");
        self.persist_json(&json)?;
        self.status.report_status(&format!(
            "Template created at {coords}! Total pixels: {}",
            format_count(total_pixels)
        ));
        Ok(storage_key)
    }

    // -- import / export ----------------------------------------------------

    /// Import a JSON document (from a file or user paste) and persist the
    /// merged result.
    pub fn import_json(&self, json: &str) -> crate::Result<ImportSummary> {
        let summary = self.import_json_inner(json)?;
        if summary.templates > 0 {
            self.persist()?;
        }
        Ok(summary)
    }

    /// Import whatever the store holds under the document key.
    pub fn load_from_store(&self) -> crate::Result<ImportSummary> {
        match self.store.load(STORAGE_KEY)? {
            Some(json) => self.import_json_inner(&json),
            None => {
                debug!("No stored templates");
                Ok(ImportSummary::default())
            }
        }
    }

    fn import_json_inner(&self, json: &str) -> crate::Result<ImportSummary> {
        match TemplateDocument::from_json(json) {
            Ok(Some(document)) => Ok(self.import_document(document)),
            Ok(None) => {
                debug!("Ignoring document from another application");
                Ok(ImportSummary::default())
            }
            Err(e) => {
                self.status
                    .report_error(&format!("Failed to read template document: {e}"));
                Err(e)
            }
        }
    }

    /// Rebuild templates from a recognized document and add them to the live
    /// set. Entries with the same storage key are replaced. Undecodable tiles
    /// are skipped. Foreign documents are ignored.
    pub fn import_document(&self, document: TemplateDocument) -> ImportSummary {
        if !document.is_recognized() {
            debug!(whoami = %document.whoami, "Ignoring document from another application");
            return ImportSummary::default();
        }

        let mut summary = ImportSummary {
            recognized: true,
            ..ImportSummary::default()
        };
        let mut built = Vec::with_capacity(document.templates.len());
        for (storage_key, mut stored) in document.templates {
            let Some((sort_id, author_id)) = parse_storage_key(&storage_key) else {
                warn!(key = %storage_key, "Skipping template with malformed storage key");
                continue;
            };
            let (tiles, skipped) = decode_stored_tiles(&stored.tiles, &self.options);
            summary.skipped_tiles += skipped;

            let mut meta = TemplateMeta::new(stored.name.clone(), sort_id, author_id);
            meta.coords = stored.coords.parse().ok();
            meta.enabled = stored.enabled;
            let mut template = Template::from_tiles(meta, tiles, self.options.shred);
            template.merge_persisted_palette(&stored.palette);
            stored.palette = template.palette_for_storage();
            built.push((storage_key, stored, template));
        }
        summary.templates = built.len();

        let mut set = self.write_set();
        let TemplateSet {
            templates,
            document: current,
        } = &mut *set;
        let current = current.get_or_insert_with(TemplateDocument::empty);
        for (storage_key, stored, template) in built {
            current.templates.insert(storage_key, stored);
            match templates
                .iter_mut()
                .find(|t| t.storage_key() == template.storage_key())
            {
                Some(existing) => *existing = template,
                None => templates.push(template),
            }
        }
        info!(
            templates = summary.templates,
            skipped_tiles = summary.skipped_tiles,
            "Templates imported"
        );
        summary
    }

    /// Current document with palettes and enabled flags taken from the live
    /// templates.
    pub fn export_document(&self) -> TemplateDocument {
        let set = self.read_set();
        let mut document = set.document.clone();
        for template in &set.templates {
            TemplateSet::sync_entry(&mut document, template);
        }
        document.unwrap_or_else(TemplateDocument::empty)
    }

    pub fn export_json(&self) -> crate::Result<String> {
        self.export_document().to_json_pretty()
    }

    /// Write the current document to the store.
    pub fn persist(&self) -> crate::Result<()> {
        let json = self.export_json()?;
        self.persist_json(&json)
    }

    fn persist_json(&self, json: &str) -> crate::Result<()> {
        if let Err(e) = self.store.persist(STORAGE_KEY, json) {
            self.status
                .report_error(&format!("Failed to save templates: {e}"));
            return Err(e.into());
        }
        debug!(bytes = json.len(), "Templates persisted");
        Ok(())
    }

    // -- mutation -----------------------------------------------------------

    /// Remove a template from the live set and the document. Returns `false`
    /// (and changes nothing) for an unknown key.
    pub fn delete_template(&self, storage_key: &str) -> crate::Result<bool> {
        let removed = {
            let mut set = self.write_set();
            let before = set.templates.len();
            set.templates.retain(|t| t.storage_key() != storage_key);
            let from_list = set.templates.len() != before;
            let from_document = set
                .document
                .as_mut()
                .is_some_and(|doc| doc.templates.remove(storage_key).is_some());
            from_list || from_document
        };
        if !removed {
            debug!(key = %storage_key, "Delete of unknown template ignored");
            return Ok(false);
        }
        info!(key = %storage_key, "Template deleted");
        self.persist()?;
        Ok(true)
    }

    /// Toggle one color of one template. Returns `false` if the template
    /// never uses that color.
    pub fn set_color_enabled(
        &self,
        storage_key: &str,
        color: ColorKey,
        enabled: bool,
    ) -> crate::Result<bool> {
        let changed = self.update_template(storage_key, |t| t.set_color_enabled(color, enabled))?;
        if changed {
            debug!(key = %storage_key, %color, enabled, "Color toggled");
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn set_all_colors_enabled(&self, storage_key: &str, enabled: bool) -> crate::Result<()> {
        self.update_template(storage_key, |t| t.set_all_colors_enabled(enabled))?;
        self.persist()
    }

    pub fn set_template_enabled(&self, storage_key: &str, enabled: bool) -> crate::Result<()> {
        self.update_template(storage_key, |t| t.meta.enabled = enabled)?;
        info!(key = %storage_key, enabled, "Template visibility changed");
        self.persist()
    }

    fn update_template<R>(
        &self,
        storage_key: &str,
        apply: impl FnOnce(&mut Template) -> R,
    ) -> crate::Result<R> {
        let mut set = self.write_set();
        let TemplateSet {
            templates,
            document,
        } = &mut *set;
        let template = templates
            .iter_mut()
            .find(|t| t.storage_key() == storage_key)
            .ok_or_else(|| RenderError::UnknownTemplate(storage_key.to_string()))?;
        let result = apply(template);
        TemplateSet::sync_entry(document, template);
        Ok(result)
    }

    // -- queries ------------------------------------------------------------

    pub fn list_templates(&self) -> Vec<TemplateSummary> {
        let set = self.read_set();
        let mut summaries: Vec<TemplateSummary> = set
            .templates
            .iter()
            .map(|t| TemplateSummary {
                storage_key: t.storage_key(),
                display_name: t.meta.display_name.clone(),
                coords: t.meta.coords,
                enabled: t.meta.enabled,
                tile_count: t.tiles().len(),
                required_pixel_count: t.required_pixel_count(),
                palette: t.palette().clone(),
            })
            .collect();
        summaries.sort_by(|a, b| a.storage_key.cmp(&b.storage_key));
        summaries
    }

    pub fn template_count(&self) -> usize {
        self.read_set().templates.len()
    }

    /// Sum of the per-tile statistics recorded so far.
    pub fn progress_totals(&self) -> TileStats {
        self.lock_progress().totals()
    }

    pub fn progress_report(&self) -> ProgressReport {
        let required = total_required(&drawing_order(&self.read_set().templates));
        self.lock_progress().report(required)
    }

    // -- tile pipeline ------------------------------------------------------

    /// Composite all live templates onto one freshly received remote tile.
    ///
    /// Returns the input unchanged when drawing is switched off, when no
    /// template touches the tile, or when the tile cannot be decoded.
    pub fn on_tile_received(&self, bytes: &[u8], tile: TileCoords) -> TileOutcome {
        if !self.templates_should_be_drawn() {
            return TileOutcome::passthrough(bytes);
        }

        let set = self.read_set();
        let ordered = drawing_order(&set.templates);
        if !any_touches(&ordered, tile) {
            return TileOutcome::passthrough(bytes);
        }

        let result = match composite_tile(bytes, tile, &ordered, &self.options) {
            Ok(result) => result,
            Err(e) => {
                warn!(%tile, "Compositing failed: {e}");
                self.status
                    .report_error(&format!("Failed to draw templates on tile {tile}: {e}"));
                return TileOutcome::passthrough(bytes);
            }
        };
        let required = total_required(&ordered);
        drop(ordered);
        drop(set);

        let report = {
            let mut progress = self.lock_progress();
            progress.record(tile, result.stats);
            progress.report(required)
        };
        let message = status_message(result.templates_drawn, &report);
        self.status.report_status(&message);

        TileOutcome {
            bytes: result.png,
            composited: true,
            stats: Some(result.stats),
            report: Some(report),
            status: Some(message),
        }
    }
}

fn total_required(templates: &[&Template]) -> u64 {
    templates.iter().map(|t| t.required_pixel_count()).sum()
}

/// Decode persisted tile URLs in parallel. Returns the decoded bitmaps and
/// how many entries were skipped.
///
/// An entry is skipped when its key does not parse, its offset lies outside
/// the tile, its bitmap does not decode or is not whole shred blocks, or its
/// key repeats one already taken (`"0,0,5,5"` and `"0000,0000,005,005"`).
fn decode_stored_tiles(
    tiles: &BTreeMap<String, String>,
    options: &CompositeOptions,
) -> (BTreeMap<TileKey, RgbaBuffer>, usize) {
    let decoded: Vec<Option<(TileKey, RgbaBuffer)>> = tiles
        .par_iter()
        .map(|(raw_key, url)| match decode_stored_tile(raw_key, url, options) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(key = %raw_key, "Skipping undecodable template tile: {e}");
                None
            }
        })
        .collect();

    let mut skipped = 0;
    let mut pieces = BTreeMap::new();
    for entry in decoded {
        let Some((key, bitmap)) = entry else {
            skipped += 1;
            continue;
        };
        if pieces.contains_key(&key) {
            warn!(%key, "Skipping duplicate template tile");
            skipped += 1;
            continue;
        }
        pieces.insert(key, bitmap);
    }
    (pieces, skipped)
}

fn decode_stored_tile(
    raw_key: &str,
    url: &str,
    options: &CompositeOptions,
) -> crate::Result<(TileKey, RgbaBuffer)> {
    let key: TileKey = raw_key.parse()?;
    if key.pixel_x >= options.tile_size || key.pixel_y >= options.tile_size {
        return Err(RenderError::PieceOutsideTile {
            key: raw_key.to_string(),
            tile_size: options.tile_size,
        });
    }
    let bitmap = RgbaBuffer::decode(&decode_data_url(url)?)?;
    options.shred.check_bitmap(&bitmap)?;
    Ok((key, bitmap))
}
