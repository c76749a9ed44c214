use thiserror::Error;

/// Errors originating from the core palette, codec, and coordinate types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid color key: {0:?} (expected \"r,g,b\" of a palette color or \"other\")")]
    InvalidColorKey(String),

    #[error("invalid tile key: {0:?} (expected \"TTTT,TTTT,PPP,PPP\")")]
    InvalidTileKey(String),

    #[error("invalid coordinates: {reason}")]
    InvalidCoords { reason: String },

    #[error("invalid encoding alphabet: {reason}")]
    InvalidAlphabet { reason: String },

    #[error("data URL has no payload separator")]
    InvalidDataUrl,

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),
}
