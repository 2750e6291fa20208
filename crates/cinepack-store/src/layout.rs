use crate::StoreError;
use cinepack_schema::AssetId;
use std::fs;
use std::path::{Path, PathBuf};

const VOLINDEX_FILE: &str = "VOLINDEX.xml";
const ASSETMAP_FILE: &str = "ASSETMAP.xml";
const LEGACY_ASSETMAP_FILE: &str = "ASSETMAP";

/// File names inside a package directory.
///
/// Documents live flat in the root: `<id>_pkl.xml`, `<id>_cpl.xml`,
/// `VOLINDEX.xml` and `ASSETMAP.xml` (or the extensionless `ASSETMAP` written
/// by older tools).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    root: PathBuf,
}

impl PackageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn pkl_path(&self, id: &AssetId) -> PathBuf {
        self.root.join(format!("{id}_pkl.xml"))
    }

    #[inline]
    pub fn cpl_path(&self, id: &AssetId) -> PathBuf {
        self.root.join(format!("{id}_cpl.xml"))
    }

    #[inline]
    pub fn volindex_path(&self) -> PathBuf {
        self.root.join(VOLINDEX_FILE)
    }

    #[inline]
    pub fn assetmap_path(&self) -> PathBuf {
        self.root.join(ASSETMAP_FILE)
    }

    #[inline]
    pub fn legacy_assetmap_path(&self) -> PathBuf {
        self.root.join(LEGACY_ASSETMAP_FILE)
    }

    /// The AssetMap present on disk. The legacy name wins when both exist.
    pub fn find_assetmap(&self) -> Result<PathBuf, StoreError> {
        [self.legacy_assetmap_path(), self.assetmap_path()]
            .into_iter()
            .find(|p| p.is_file())
            .ok_or_else(|| StoreError::AssetMapNotFound(self.root.clone()))
    }

    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(StoreError::io(&self.root))
    }

    /// `path` relative to the package root when it lives inside it, otherwise
    /// unchanged.
    pub fn relative_path(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf)
    }

    /// Resolve a path read from an AssetMap against the package root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}
