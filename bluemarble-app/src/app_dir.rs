//! Directories used by the command-line host. Data lives next to the
//! executable so a standalone install is self-contained; configuration lives
//! in the OS config directory.

use std::path::PathBuf;

/// Directory containing the running executable. Falls back to current directory if unavailable.
pub fn exe_directory() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Default directory for the persisted template document.
pub fn storage_directory() -> PathBuf {
    exe_directory().join("storage")
}

/// Default directory for composited tiles.
pub fn composited_directory() -> PathBuf {
    exe_directory().join("composited")
}

/// OS configuration directory for BlueMarble.
pub fn config_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "BlueMarble")
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(exe_directory)
}
