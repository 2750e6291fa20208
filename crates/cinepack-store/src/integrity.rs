use crate::digest::make_digest;
use crate::layout::PackageLayout;
use crate::StoreError;
use cinepack_schema::{root_element_name, AssetMap, PackingList};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

#[derive(Debug, Serialize)]
pub struct IntegrityFailure {
    pub id: String,
    pub reason: String,
}

/// Locate the packing list named by an asset map: the entry flagged
/// `PackingList`, else the first XML file whose root is `PackingList`.
fn find_packing_list(layout: &PackageLayout, map: &AssetMap) -> Result<PathBuf, StoreError> {
    if let Some(asset) = map.assets.iter().find(|a| a.packing_list) {
        return Ok(layout.resolve(&asset.chunk()?.path));
    }
    for asset in &map.assets {
        let path = layout.resolve(&asset.chunk()?.path);
        if path.extension().is_some_and(|e| e == "xml")
            && matches!(root_element_name(&path).as_deref(), Ok("PackingList"))
        {
            return Ok(path);
        }
    }
    Err(StoreError::PackingListNotFound(layout.root().to_path_buf()))
}

/// Check every packing-list entry of the package at `layout` against the
/// file the asset map names for it: the file must exist, and its size and
/// SHA-1 digest must match.
pub fn verify_package_integrity(layout: &PackageLayout) -> Result<IntegrityReport, StoreError> {
    let map = AssetMap::parse_file(&layout.find_assetmap()?)?;
    let pkl_path = find_packing_list(layout, &map)?;
    let pkl = PackingList::parse_file(&pkl_path)?;
    debug!(
        "verifying {} assets listed in {}",
        pkl.assets.len(),
        pkl_path.display()
    );

    let mut report = IntegrityReport {
        checked: pkl.assets.len(),
        ..Default::default()
    };

    for entry in &pkl.assets {
        let id = entry.id.to_string();
        let path = match map.path_of(&entry.id) {
            Ok(p) => layout.resolve(p),
            Err(e) => {
                report.failed.push(IntegrityFailure {
                    id,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let size = match fs::metadata(&path) {
            Ok(m) => m.len(),
            Err(e) => {
                report.failed.push(IntegrityFailure {
                    id,
                    reason: format!("cannot read {}: {e}", path.display()),
                });
                continue;
            }
        };
        if size != entry.size {
            report.failed.push(IntegrityFailure {
                id,
                reason: format!(
                    "size mismatch for {}: expected {}, found {size}",
                    path.display(),
                    entry.size
                ),
            });
            continue;
        }

        match make_digest(&path, None) {
            Ok(actual) if actual == entry.hash => report.passed += 1,
            Ok(actual) => {
                warn!("hash mismatch for {}", path.display());
                report.failed.push(IntegrityFailure {
                    id,
                    reason: format!(
                        "hash mismatch for {}: expected {}, got {actual}",
                        path.display(),
                        entry.hash
                    ),
                });
            }
            Err(e) => report.failed.push(IntegrityFailure {
                id,
                reason: e.to_string(),
            }),
        }
    }

    Ok(report)
}
