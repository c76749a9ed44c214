//! The fixed color palette of the remote grid.
//!
//! Every pixel a user can place on the grid is one of these 63 colors (plus
//! the `Transparent` sentinel at index 0). Template pixels are classified
//! against this table: an exact RGB match yields [`ColorKey::Known`], anything
//! else collapses into [`ColorKey::Other`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// An RGB triple.
pub type Rgb = [u8; 3];

/// Center pixels with alpha below this are treated as transparent
/// (not required in a template, unpainted on the grid).
pub const ALPHA_THRESHOLD: u8 = 64;

/// Template authors paint this color to mark pixels that never count toward
/// completion (`#DEFACE`).
pub const IGNORE_COLOR: Rgb = [222, 250, 206];

/// One entry of the grid palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteEntry {
    /// Positional id (array index). `0` is the transparent sentinel.
    pub id: u8,
    pub is_premium: bool,
    pub name: &'static str,
    pub rgb: Rgb,
}

impl PaletteEntry {
    /// Whether this entry is the "no paint" sentinel rather than a real color.
    pub fn is_sentinel(&self) -> bool {
        self.id == 0
    }
}

const fn entry(id: u8, is_premium: bool, name: &'static str, rgb: Rgb) -> PaletteEntry {
    PaletteEntry {
        id,
        is_premium,
        name,
        rgb,
    }
}

/// All grid colors, indexed by id.
pub static GRID_PALETTE: [PaletteEntry; 64] = [
    entry(0, false, "Transparent", [0, 0, 0]),
    entry(1, false, "Black", [0, 0, 0]),
    entry(2, false, "Dark Gray", [60, 60, 60]),
    entry(3, false, "Gray", [120, 120, 120]),
    entry(4, false, "Light Gray", [210, 210, 210]),
    entry(5, false, "White", [255, 255, 255]),
    entry(6, false, "Deep Red", [96, 0, 24]),
    entry(7, false, "Red", [237, 28, 36]),
    entry(8, false, "Orange", [255, 127, 39]),
    entry(9, false, "Gold", [246, 170, 9]),
    entry(10, false, "Yellow", [249, 221, 59]),
    entry(11, false, "Light Yellow", [255, 250, 188]),
    entry(12, false, "Dark Green", [14, 185, 104]),
    entry(13, false, "Green", [19, 230, 123]),
    entry(14, false, "Light Green", [135, 255, 94]),
    entry(15, false, "Dark Teal", [12, 129, 110]),
    entry(16, false, "Teal", [16, 174, 166]),
    entry(17, false, "Light Teal", [19, 225, 190]),
    entry(18, false, "Dark Blue", [40, 80, 158]),
    entry(19, false, "Blue", [64, 147, 228]),
    entry(20, false, "Cyan", [96, 247, 242]),
    entry(21, false, "Indigo", [107, 80, 246]),
    entry(22, false, "Light Indigo", [153, 177, 251]),
    entry(23, false, "Dark Purple", [120, 12, 153]),
    entry(24, false, "Purple", [170, 56, 185]),
    entry(25, false, "Light Purple", [224, 159, 249]),
    entry(26, false, "Dark Pink", [203, 0, 122]),
    entry(27, false, "Pink", [236, 31, 128]),
    entry(28, false, "Light Pink", [243, 141, 169]),
    entry(29, false, "Dark Brown", [104, 70, 52]),
    entry(30, false, "Brown", [149, 104, 42]),
    entry(31, false, "Beige", [248, 178, 119]),
    entry(32, true, "Medium Gray", [170, 170, 170]),
    entry(33, true, "Dark Red", [165, 14, 30]),
    entry(34, true, "Light Red", [250, 128, 114]),
    entry(35, true, "Dark Orange", [228, 92, 26]),
    entry(36, true, "Light Tan", [214, 181, 148]),
    entry(37, true, "Dark Goldenrod", [156, 132, 49]),
    entry(38, true, "Goldenrod", [197, 173, 49]),
    entry(39, true, "Light Goldenrod", [232, 212, 95]),
    entry(40, true, "Dark Olive", [74, 107, 58]),
    entry(41, true, "Olive", [90, 148, 74]),
    entry(42, true, "Light Olive", [132, 197, 115]),
    entry(43, true, "Dark Cyan", [15, 121, 159]),
    entry(44, true, "Light Cyan", [187, 250, 242]),
    entry(45, true, "Light Blue", [125, 199, 255]),
    entry(46, true, "Dark Indigo", [77, 49, 184]),
    entry(47, true, "Dark Slate Blue", [74, 66, 132]),
    entry(48, true, "Slate Blue", [122, 113, 196]),
    entry(49, true, "Light Slate Blue", [181, 174, 241]),
    entry(50, true, "Light Brown", [219, 164, 99]),
    entry(51, true, "Dark Beige", [209, 128, 81]),
    entry(52, true, "Light Beige", [255, 197, 165]),
    entry(53, true, "Dark Peach", [155, 82, 73]),
    entry(54, true, "Peach", [209, 128, 120]),
    entry(55, true, "Light Peach", [250, 182, 164]),
    entry(56, true, "Dark Tan", [123, 99, 82]),
    entry(57, true, "Tan", [156, 132, 107]),
    entry(58, true, "Dark Slate", [51, 57, 65]),
    entry(59, true, "Slate", [109, 117, 141]),
    entry(60, true, "Light Slate", [179, 185, 209]),
    entry(61, true, "Dark Stone", [109, 100, 63]),
    entry(62, true, "Stone", [148, 140, 107]),
    entry(63, true, "Light Stone", [205, 197, 158]),
];

// ---------------------------------------------------------------------------
// Palette lookup
// ---------------------------------------------------------------------------

/// Read-only view of the grid palette with O(1) RGB lookup.
#[derive(Debug)]
pub struct ColorPalette {
    entries: &'static [PaletteEntry],
    by_rgb: HashMap<Rgb, u8>,
}

impl ColorPalette {
    /// The shared grid palette, built once per process.
    pub fn grid() -> &'static ColorPalette {
        static GRID: OnceLock<ColorPalette> = OnceLock::new();
        GRID.get_or_init(|| ColorPalette::new(&GRID_PALETTE))
    }

    fn new(entries: &'static [PaletteEntry]) -> Self {
        let by_rgb = entries
            .iter()
            .filter(|e| !e.is_sentinel())
            .map(|e| (e.rgb, e.id))
            .collect();
        Self { entries, by_rgb }
    }

    pub fn entries(&self) -> &'static [PaletteEntry] {
        self.entries
    }

    pub fn by_id(&self, id: u8) -> Option<&'static PaletteEntry> {
        self.entries.get(id as usize)
    }

    /// The non-sentinel entry whose color is exactly `rgb`.
    pub fn entry_for(&self, rgb: Rgb) -> Option<&'static PaletteEntry> {
        self.by_rgb.get(&rgb).and_then(|&id| self.by_id(id))
    }

    #[inline]
    pub fn contains(&self, rgb: Rgb) -> bool {
        self.by_rgb.contains_key(&rgb)
    }

    /// Exact-match classification. No nearest-color fallback.
    #[inline]
    pub fn classify(&self, rgb: Rgb) -> ColorKey {
        if self.contains(rgb) {
            ColorKey::Known(rgb)
        } else {
            ColorKey::Other
        }
    }
}

// ---------------------------------------------------------------------------
// Color key
// ---------------------------------------------------------------------------

/// Key of a template's color histogram.
///
/// Text form is `"r,g,b"` for palette colors and `"other"` for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorKey {
    Known(Rgb),
    Other,
}

impl ColorKey {
    pub fn is_known(&self) -> bool {
        matches!(self, ColorKey::Known(_))
    }

    /// Palette entry backing this key, if any.
    pub fn entry(&self) -> Option<&'static PaletteEntry> {
        match self {
            ColorKey::Known(rgb) => ColorPalette::grid().entry_for(*rgb),
            ColorKey::Other => None,
        }
    }
}

impl fmt::Display for ColorKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorKey::Known([r, g, b]) => write!(f, "{r},{g},{b}"),
            ColorKey::Other => f.write_str("other"),
        }
    }
}

impl FromStr for ColorKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "other" {
            return Ok(ColorKey::Other);
        }
        let invalid = || CoreError::InvalidColorKey(s.to_string());
        let mut channels = [0u8; 3];
        let mut parts = s.split(',');
        for channel in channels.iter_mut() {
            *channel = parts
                .next()
                .and_then(|p| p.trim().parse::<u8>().ok())
                .ok_or_else(invalid)?;
        }
        if parts.next().is_some() || !ColorPalette::grid().contains(channels) {
            return Err(invalid());
        }
        Ok(ColorKey::Known(channels))
    }
}

impl Serialize for ColorKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColorKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
