use crate::asset::{write_chunk_list, Asset, PackageAsset};
use crate::cpl::Cpl;
use crate::notes::{EqualityOptions, NoteType};
use crate::DcpError;
use cinepack_mxf::EssenceBackend;
use cinepack_schema::{
    root_element_name, AssetId, AssetMap, PackageMetadata, PackingList, XmlWriter, AM_NAMESPACE,
    PKL_NAMESPACE,
};
use cinepack_store::{write_atomic, PackageLayout};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for [`Dcp::read`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fail when an essence file cannot be opened instead of leaving its
    /// reel slot unavailable.
    pub require_mxfs: bool,
}

/// Where [`Dcp::write_xml`] put the package documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenPackage {
    pub pkl_id: AssetId,
    pub pkl_path: PathBuf,
    pub volindex_path: PathBuf,
    pub assetmap_path: PathBuf,
}

/// A Digital Cinema Package: a directory holding one or more CPLs and the
/// Packing List, Volume Index, and Asset Map that describe them.
#[derive(Debug)]
pub struct Dcp {
    layout: PackageLayout,
    cpls: Vec<Arc<Cpl>>,
    packing_list: Option<PackingList>,
}

impl Dcp {
    /// An empty package rooted at `directory`. Nothing is touched on disk
    /// until [`write_xml`](Self::write_xml).
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            layout: PackageLayout::new(directory),
            cpls: Vec::new(),
            packing_list: None,
        }
    }

    pub fn directory(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &PackageLayout {
        &self.layout
    }

    pub fn cpls(&self) -> &[Arc<Cpl>] {
        &self.cpls
    }

    pub fn add_cpl(&mut self, cpl: Arc<Cpl>) {
        self.cpls.push(cpl);
    }

    /// The Packing List found by [`read`](Self::read); `None` for a package
    /// composed in memory.
    pub fn packing_list(&self) -> Option<&PackingList> {
        self.packing_list.as_ref()
    }

    /// Every asset of every CPL, sorted by id with duplicates removed.
    pub fn assets(&self) -> Vec<Asset> {
        let mut assets: Vec<Asset> = self.cpls.iter().flat_map(|c| c.assets()).collect();
        assets.sort_by_key(PackageAsset::id);
        assets.dedup_by_key(|a| a.id());
        assets
    }

    /// Write every CPL, then the Packing List, Volume Index, and Asset Map.
    pub fn write_xml(&self, metadata: &PackageMetadata) -> Result<WrittenPackage, DcpError> {
        self.layout.initialize()?;
        for cpl in &self.cpls {
            cpl.write_xml(metadata)?;
        }

        let assets = self.assets();
        let pkl_id = AssetId::new();
        let pkl_path = self.layout.pkl_path(&pkl_id);
        self.write_pkl(&pkl_id, &pkl_path, &assets, metadata)?;
        let pkl_size = fs::metadata(&pkl_path)
            .map(|m| m.len())
            .map_err(|e| DcpError::file(format!("could not read file size: {e}"), &pkl_path))?;

        let volindex_path = self.layout.volindex_path();
        let mut w = XmlWriter::document("VolumeIndex", &[("xmlns", AM_NAMESPACE)])?;
        w.text_element("Index", "1")?;
        write_atomic(&volindex_path, &w.finish("VolumeIndex")?)?;

        let assetmap_path = self.layout.assetmap_path();
        let mut w = XmlWriter::document("AssetMap", &[("xmlns", AM_NAMESPACE)])?;
        w.text_element("Id", AssetId::new().urn())?
            .text_element("Creator", &metadata.creator)?
            .text_element("VolumeCount", "1")?
            .text_element("IssueDate", &metadata.issue_date)?
            .text_element("Issuer", &metadata.issuer)?
            .open("AssetList")?;

        w.open("Asset")?
            .text_element("Id", pkl_id.urn())?
            .text_element("PackingList", "true")?;
        write_chunk_list(&mut w, &self.layout.relative_path(&pkl_path), pkl_size)?;
        w.close("Asset")?;
        for cpl in &self.cpls {
            cpl.write_to_assetmap(&mut w, &self.layout)?;
        }
        for asset in &assets {
            asset.write_to_assetmap(&mut w, &self.layout)?;
        }
        w.close("AssetList")?;
        write_atomic(&assetmap_path, &w.finish("AssetMap")?)?;

        info!(
            "wrote package with {} CPLs and {} assets to {}",
            self.cpls.len(),
            assets.len(),
            self.layout.root().display()
        );
        Ok(WrittenPackage {
            pkl_id,
            pkl_path,
            volindex_path,
            assetmap_path,
        })
    }

    fn write_pkl(
        &self,
        id: &AssetId,
        path: &Path,
        assets: &[Asset],
        metadata: &PackageMetadata,
    ) -> Result<(), DcpError> {
        let annotation = self.cpls.first().map(|c| c.name()).unwrap_or_default();
        let mut w = XmlWriter::document("PackingList", &[("xmlns", PKL_NAMESPACE)])?;
        w.text_element("Id", id.urn())?
            .text_element("AnnotationText", annotation)?
            .text_element("IssueDate", &metadata.issue_date)?
            .text_element("Issuer", &metadata.issuer)?
            .text_element("Creator", &metadata.creator)?
            .open("AssetList")?;
        for asset in assets {
            asset.write_to_pkl(&mut w)?;
        }
        for cpl in &self.cpls {
            cpl.write_to_pkl(&mut w)?;
        }
        w.close("AssetList")?;
        write_atomic(path, &w.finish("PackingList")?)?;
        debug!("wrote packing list {}", path.display());
        Ok(())
    }

    /// Read the package in `directory` through its Asset Map.
    ///
    /// Essence files are not classified here; they are opened by the CPLs
    /// that reference them.
    pub fn read(
        directory: impl Into<PathBuf>,
        backend: &Arc<dyn EssenceBackend>,
        options: ReadOptions,
    ) -> Result<Self, DcpError> {
        let layout = PackageLayout::new(directory);
        let assetmap_path = layout
            .find_assetmap()
            .map_err(|e| DcpError::Read(e.to_string()))?;
        let asset_map = AssetMap::parse_file(&assetmap_path)?;
        debug!(
            "reading package {} ({} assets)",
            layout.root().display(),
            asset_map.assets.len()
        );

        let mut cpl_files = Vec::new();
        let mut pkl_path = None;
        for asset in &asset_map.assets {
            let relative = asset.chunk()?.path.clone();
            let path = layout.resolve(&relative);
            if is_essence(&path) {
                continue;
            }
            let root = match root_element_name(&path) {
                Ok(root) => root,
                Err(e) => {
                    debug!("not classifying {}: {e}", path.display());
                    continue;
                }
            };
            match root.as_str() {
                "CompositionPlaylist" => cpl_files.push(relative),
                "PackingList" => {
                    if pkl_path.is_some() {
                        return Err(DcpError::Read("duplicate PKLs found".to_owned()));
                    }
                    pkl_path = Some(path);
                }
                // Loaded by the CPL that references it.
                "DCSubtitle" => {}
                other => debug!("ignoring {} with root element {other}", path.display()),
            }
        }

        if cpl_files.is_empty() {
            return Err(DcpError::Read(format!(
                "no CPL files found in {}",
                layout.root().display()
            )));
        }
        let pkl_path = pkl_path.ok_or_else(|| {
            DcpError::Read(format!("no PKL file found in {}", layout.root().display()))
        })?;
        let packing_list = PackingList::parse_file(&pkl_path)?;

        let cpls = cpl_files
            .iter()
            .map(|file| {
                Cpl::read(
                    layout.root(),
                    file,
                    &asset_map,
                    backend,
                    options.require_mxfs,
                )
                .map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;

        for cpl in &cpls {
            if packing_list.asset(&cpl.id()).is_none() {
                warn!(
                    "CPL {} is not listed in packing list {}",
                    cpl.id(),
                    pkl_path.display()
                );
            }
        }

        Ok(Self {
            layout,
            cpls,
            packing_list: Some(packing_list),
        })
    }

    /// Compare with `other` CPL by CPL, in the order each package lists them.
    pub fn equals(
        &self,
        other: &Dcp,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        if self.cpls.len() != other.cpls.len() {
            note(
                NoteType::Error,
                format!(
                    "CPL counts differ: {} against {}",
                    self.cpls.len(),
                    other.cpls.len()
                ),
            );
            return Ok(false);
        }

        let mut equal = true;
        for (a, b) in self.cpls.iter().zip(&other.cpls) {
            if !a.equals(b, opt, note)? {
                equal = false;
            }
        }
        Ok(equal)
    }
}

/// MXF containers and fonts, which are never package documents.
fn is_essence(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("mxf") || e.eq_ignore_ascii_case("ttf"))
}
