use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error};

use bluemarble_render::KeyValueStore;

/// Key-value store backed by one JSON file per key in a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn directory(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(key)))
    }
}

impl KeyValueStore for FileStore {
    fn persist(&self, key: &str, value: &str) -> io::Result<()> {
        if let Err(e) = fs::create_dir_all(&self.dir) {
            error!("Failed to create storage directory {}: {e}", self.dir.display());
            return Err(e);
        }
        let path = self.path_for(key);
        // Write next to the target, then rename over it.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Wrote {} ({} bytes)", path.display(), value.len());
        Ok(())
    }

    fn load(&self, key: &str) -> io::Result<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No stored value at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Turn a storage key into a safe filename (no extension).
fn sanitize_filename(key: &str) -> String {
    let sanitized: String = key
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "value".to_string()
    } else {
        sanitized
    }
}
