//! Coordinates on the remote grid and the text keys derived from them.
//!
//! The grid is addressed as `(tile x, tile y)` plus a pixel offset inside
//! that tile. Tile coordinates are zero-padded to four digits and pixel
//! offsets to three, so keys sort the same way as text and as numbers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Address of one remote tile. Text form `"TTTT,TTTT"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileCoords {
    pub x: u32,
    pub y: u32,
}

impl TileCoords {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04},{:04}", self.x, self.y)
    }
}

impl FromStr for TileCoords {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [x, y] = parse_fields::<2>(s).ok_or_else(|| CoreError::InvalidCoords {
            reason: format!("expected \"x,y\", got {s:?}"),
        })?;
        Ok(Self { x, y })
    }
}

/// Key of one sliced template piece: the remote tile it lands on plus the
/// pixel offset of its top-left corner inside that tile.
///
/// Text form `"TTTT,TTTT,PPP,PPP"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileKey {
    pub tile: TileCoords,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

impl TileKey {
    pub const fn new(tile: TileCoords, pixel_x: u32, pixel_y: u32) -> Self {
        Self {
            tile,
            pixel_x,
            pixel_y,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{:03},{:03}", self.tile, self.pixel_x, self.pixel_y)
    }
}

impl FromStr for TileKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [tx, ty, px, py] =
            parse_fields::<4>(s).ok_or_else(|| CoreError::InvalidTileKey(s.to_string()))?;
        Ok(Self::new(TileCoords::new(tx, ty), px, py))
    }
}

impl Serialize for TileKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TileKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Top-left anchor of a template on the grid.
///
/// Text form is `"tx, ty, px, py"` (the persisted `coords` field); parsing
/// also accepts the separators without spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateCoords {
    pub tile_x: u32,
    pub tile_y: u32,
    pub pixel_x: u32,
    pub pixel_y: u32,
}

impl TemplateCoords {
    pub const fn new(tile_x: u32, tile_y: u32, pixel_x: u32, pixel_y: u32) -> Self {
        Self {
            tile_x,
            tile_y,
            pixel_x,
            pixel_y,
        }
    }

    /// Reject pixel offsets that fall outside a tile of `tile_size`.
    pub fn validate(&self, tile_size: u32) -> crate::Result<()> {
        if self.pixel_x >= tile_size || self.pixel_y >= tile_size {
            return Err(CoreError::InvalidCoords {
                reason: format!(
                    "pixel offset ({}, {}) must be below the tile size {tile_size}",
                    self.pixel_x, self.pixel_y
                ),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TemplateCoords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, {}, {}",
            self.tile_x, self.tile_y, self.pixel_x, self.pixel_y
        )
    }
}

impl FromStr for TemplateCoords {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let [tx, ty, px, py] = parse_fields::<4>(s).ok_or_else(|| CoreError::InvalidCoords {
            reason: format!("expected four non-negative integers \"tx, ty, px, py\", got {s:?}"),
        })?;
        Ok(Self::new(tx, ty, px, py))
    }
}

/// Parse exactly `N` comma-separated unsigned integers.
fn parse_fields<const N: usize>(s: &str) -> Option<[u32; N]> {
    let mut out = [0u32; N];
    let mut parts = s.split(',');
    for slot in out.iter_mut() {
        *slot = parts.next()?.trim().parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_coords_are_zero_padded() {
        assert_eq!(TileCoords::new(10, 20).to_string(), "0010,0020");
        assert_eq!(TileCoords::new(1231, 47).to_string(), "1231,0047");
    }

    #[test]
    fn tile_key_text_round_trip() {
        let key = TileKey::new(TileCoords::new(1231, 47), 183, 5);
        assert_eq!(key.to_string(), "1231,0047,183,005");
        assert_eq!("1231,0047,183,005".parse::<TileKey>().unwrap(), key);
        // Unpadded keys from older documents still parse.
        assert_eq!("1231,47,183,5".parse::<TileKey>().unwrap(), key);
    }

    #[test]
    fn tile_key_order_follows_tile_then_offset() {
        let a = TileKey::new(TileCoords::new(1, 0), 999, 999);
        let b = TileKey::new(TileCoords::new(1, 1), 0, 0);
        assert!(a < b);
    }

    #[test]
    fn malformed_tile_keys_are_rejected() {
        for bad in ["", "1,2,3", "1,2,3,4,5", "a,b,c,d", "-1,0,0,0"] {
            assert!(bad.parse::<TileKey>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn template_coords_parse_with_and_without_spaces() {
        let expected = TemplateCoords::new(10, 20, 5, 5);
        assert_eq!("10, 20, 5, 5".parse::<TemplateCoords>().unwrap(), expected);
        assert_eq!("10,20,5,5".parse::<TemplateCoords>().unwrap(), expected);
        assert_eq!(expected.to_string(), "10, 20, 5, 5");
    }

    #[test]
    fn garbled_template_coords_are_rejected() {
        assert!("10, 20, 5".parse::<TemplateCoords>().is_err());
        assert!("ten, 20, 5, 5".parse::<TemplateCoords>().is_err());
    }

    #[test]
    fn validate_rejects_offsets_outside_tile() {
        assert!(TemplateCoords::new(0, 0, 999, 0).validate(1000).is_ok());
        assert!(TemplateCoords::new(0, 0, 1000, 0).validate(1000).is_err());
    }
}
