use std::sync::{mpsc, Arc};

use tracing::debug;

use bluemarble_core::TileCoords;
use bluemarble_render::{TemplateManager, TileOutcome};

/// Request sent to the tile worker.
pub(crate) enum TileRequest {
    /// Composite the live templates onto one remote tile.
    Composite { tile: TileCoords, bytes: Vec<u8> },
}

/// Response sent back from the tile worker.
pub(crate) enum TileResponse {
    Composited { tile: TileCoords, outcome: TileOutcome },
}

/// Spawn a dedicated thread that feeds remote tiles through `manager`.
///
/// Returns the send-side for requests and the receive-side for responses.
/// The thread runs until the request sender is dropped.
pub(crate) fn spawn_tile_worker(
    manager: Arc<TemplateManager>,
) -> (mpsc::Sender<TileRequest>, mpsc::Receiver<TileResponse>) {
    let (req_tx, req_rx) = mpsc::channel::<TileRequest>();
    let (resp_tx, resp_rx) = mpsc::channel::<TileResponse>();

    std::thread::Builder::new()
        .name("tile-worker".into())
        .spawn(move || {
            debug!("Tile worker thread started");
            while let Ok(request) = req_rx.recv() {
                match request {
                    TileRequest::Composite { tile, bytes } => {
                        let outcome = manager.on_tile_received(&bytes, tile);
                        if resp_tx.send(TileResponse::Composited { tile, outcome }).is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("Tile worker thread exiting");
        })
        .expect("Failed to spawn tile worker thread");

    (req_tx, resp_rx)
}
