use bluemarble_core::codec::AUTHOR_ALPHABET;
use bluemarble_core::{encode_number, ColorKey, ColorPalette, TileCoords, TileKey};

#[test]
fn every_grid_color_round_trips_through_its_key() {
    let palette = ColorPalette::grid();
    for entry in palette.entries().iter().filter(|e| !e.is_sentinel()) {
        let key = palette.classify(entry.rgb);
        assert!(key.is_known(), "{} should classify as known", entry.name);
        let parsed: ColorKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
        assert_eq!(parsed.entry().map(|e| e.rgb), Some(entry.rgb));
    }
}

#[test]
fn grid_palette_colors_are_distinct() {
    let palette = ColorPalette::grid();
    let mut seen = std::collections::HashSet::new();
    for entry in palette.entries().iter().filter(|e| !e.is_sentinel()) {
        assert!(seen.insert(entry.rgb), "duplicate color {:?}", entry.rgb);
    }
    assert_eq!(seen.len(), 63);
}

#[test]
fn storage_key_for_first_user_ids() {
    assert_eq!(encode_number(0, AUTHOR_ALPHABET).unwrap(), "!");
    assert_eq!(encode_number(1, AUTHOR_ALPHABET).unwrap(), "#");
    let key = format!("{} {}", 0, encode_number(91, AUTHOR_ALPHABET).unwrap());
    assert_eq!(key, "0 ~");
}

#[test]
fn tile_key_prefix_is_tile_coords() {
    let key: TileKey = "0010,0020,005,005".parse().unwrap();
    assert_eq!(key.tile, TileCoords::new(10, 20));
    assert!(key.to_string().starts_with(&key.tile.to_string()));
}
