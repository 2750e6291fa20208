use crate::{fsync_dir, StoreError};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

/// Replace `path` with `bytes` atomically.
///
/// The data is written to a temporary file in the same directory, synced,
/// and renamed over the destination, so readers see either the old document
/// or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(StoreError::io(dir))?;
    tmp.write_all(bytes).map_err(StoreError::io(path))?;
    tmp.as_file().sync_all().map_err(StoreError::io(path))?;
    tmp.persist(path).map_err(|e| StoreError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    fsync_dir(dir).map_err(StoreError::io(dir))?;
    debug!("wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}
