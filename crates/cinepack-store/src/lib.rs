//! Package directory layout, content digests, and atomic writes for cinepack.
//!
//! This crate provides the storage layer of a package: `PackageLayout` for the
//! file names of package documents, `make_digest` and `DigestCache` for the
//! base64 SHA-1 digests recorded in packing lists, `write_atomic` for
//! crash-safe document writes, and `verify_package_integrity` for checking a
//! package on disk against its packing list.

pub mod digest;
pub mod integrity;
pub mod layout;
pub mod write;

pub use digest::{make_digest, DigestCache};
pub use integrity::{verify_package_integrity, IntegrityFailure, IntegrityReport};
pub use layout::PackageLayout;
pub use write::write_atomic;

use cinepack_schema::SchemaError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory so that a preceding `rename()` is durable.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("integrity check failed for '{path}': expected {expected}, got {actual}")]
    IntegrityFailure {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("could not find an AssetMap in {0}")]
    AssetMapNotFound(PathBuf),
    #[error("no packing list referenced by the AssetMap in {0}")]
    PackingListNotFound(PathBuf),
}

impl StoreError {
    /// Adapter for `map_err` that attaches `path` to an I/O error.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
        move |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
