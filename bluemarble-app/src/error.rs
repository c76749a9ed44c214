use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the command-line host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot tell tile coordinates from {0} (expected .../<x>/<y>.png or --tile)")]
    UnknownTile(PathBuf),

    #[error("tile worker stopped unexpectedly")]
    WorkerGone,

    #[error(transparent)]
    Render(#[from] bluemarble_render::RenderError),

    #[error(transparent)]
    Core(#[from] bluemarble_core::CoreError),
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
