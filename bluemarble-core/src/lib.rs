pub mod codec;
pub mod coords;
pub mod error;
pub mod palette;

// Re-export primary types for convenience.
pub use codec::{
    decode_base64, decode_data_url, encode_base64, encode_number, encode_png_data_url, AUTHOR_ALPHABET,
};
pub use coords::{TemplateCoords, TileCoords, TileKey};
pub use error::CoreError;
pub use palette::{ColorKey, ColorPalette, PaletteEntry, Rgb, ALPHA_THRESHOLD, IGNORE_COLOR};

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
