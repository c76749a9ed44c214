use thiserror::Error;

/// Errors originating from the tiling, compositing, and persistence pipeline.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid tile size: {0}×{0} (must be > 0)")]
    InvalidTileSize(u32),

    #[error("invalid draw multiplier: {0} (must be odd and >= 1)")]
    InvalidDrawMultiplier(u32),

    #[error("invalid image dimensions: {width}×{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("bitmap {width}×{height} is not made of whole {multiplier}×{multiplier} blocks")]
    MisalignedBitmap {
        width: u32,
        height: u32,
        multiplier: u32,
    },

    #[error("piece {key} starts outside a {tile_size}×{tile_size} tile")]
    PieceOutsideTile { key: String, tile_size: u32 },

    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("PNG encode failed: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("template document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("no template with storage key {0:?}")]
    UnknownTemplate(String),

    #[error(transparent)]
    Core(#[from] bluemarble_core::CoreError),
}
