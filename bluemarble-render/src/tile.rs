use bluemarble_core::{TemplateCoords, TileCoords, TileKey};

/// Default remote tile size in logical pixels.
pub const TILE_SIZE: u32 = 1000;

/// A rectangular piece of a source image that lands inside one remote tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TilePiece {
    /// Remote tile and pixel offset of the piece's top-left corner.
    pub key: TileKey,
    /// Source-image x of the top-left corner.
    pub src_x: u32,
    /// Source-image y of the top-left corner.
    pub src_y: u32,
    /// Piece width in logical pixels (may be smaller at tile boundaries).
    pub width: u32,
    /// Piece height in logical pixels (may be smaller at tile boundaries).
    pub height: u32,
}

impl TilePiece {
    /// Number of logical pixels in this piece.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Split a `width × height` image anchored at `anchor` into pieces aligned to
/// the remote grid's tile boundaries.
///
/// Every boundary crossing inside the image starts a new piece, so each piece
/// covers exactly one remote tile. `tile_size` must be non-zero and the
/// anchor's pixel offset must lie inside a tile.
pub fn build_piece_grid(
    width: u32,
    height: u32,
    anchor: TemplateCoords,
    tile_size: u32,
) -> Vec<TilePiece> {
    debug_assert!(tile_size > 0);
    let mut pieces = Vec::new();
    let mut y = 0;
    while y < height {
        let abs_y = anchor.pixel_y + y;
        let th = (tile_size - abs_y % tile_size).min(height - y);
        let mut x = 0;
        while x < width {
            let abs_x = anchor.pixel_x + x;
            let tw = (tile_size - abs_x % tile_size).min(width - x);
            let tile = TileCoords::new(
                anchor.tile_x + abs_x / tile_size,
                anchor.tile_y + abs_y / tile_size,
            );
            pieces.push(TilePiece {
                key: TileKey::new(tile, abs_x % tile_size, abs_y % tile_size),
                src_x: x,
                src_y: y,
                width: tw,
                height: th,
            });
            x += tw;
        }
        y += th;
    }
    pieces
}
