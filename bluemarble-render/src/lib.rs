pub mod buffer;
pub mod composite;
pub mod document;
pub mod error;
pub mod export;
pub mod manager;
pub mod progress;
pub mod shred;
pub mod stats;
pub mod status;
pub mod storage;
pub mod template;
pub mod tile;

pub use buffer::RgbaBuffer;
pub use composite::{
    apply_color_filter, composite_tile, drawing_order, CompositeOptions, CompositeResult, FilterPolicy,
};
pub use document::{StoredTemplate, TemplateDocument, APP_TAG, SCHEMA_VERSION, STORAGE_KEY};
pub use error::RenderError;
pub use export::encode_png;
pub use manager::{ImportSummary, ManagerConfig, TemplateManager, TemplateSummary, TileOutcome};
pub use progress::{ProgressReport, ProgressTracker};
pub use shred::{Shred, DEFAULT_DRAW_MULTIPLIER};
pub use stats::{compute_tile_stats, TileStats};
pub use status::{format_count, status_message, StatusSink, TracingStatus};
pub use storage::{KeyValueStore, MemoryStore};
pub use template::{ColorHistogram, ColorUsage, SlicedTemplate, Template, TemplateMeta};
pub use tile::{build_piece_grid, TilePiece, TILE_SIZE};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
