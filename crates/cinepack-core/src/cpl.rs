use crate::asset::{Asset, AssetFile, PackageAsset, ReelTiming};
use crate::notes::{EqualityOptions, NoteType};
use crate::picture::{PictureAsset, PictureKind};
use crate::reel::{Essence, MissingEssence, Reel};
use crate::sound::SoundAsset;
use crate::subtitle::SubtitleAsset;
use crate::DcpError;
use cinepack_mxf::EssenceBackend;
use cinepack_schema::{
    AssetId, AssetMap, ContentKind, CplDocument, CplReel, CplReelAsset, Digest, PackageMetadata,
    SchemaError, XmlWriter, CPL_NAMESPACE,
};
use cinepack_store::write_atomic;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// A Composition Playlist: a titled, ordered list of reels.
#[derive(Debug)]
pub struct Cpl {
    file: AssetFile,
    name: String,
    content_kind: ContentKind,
    length: i64,
    fps: i32,
    reels: Vec<Arc<Reel>>,
}

impl Cpl {
    /// A new, empty CPL stored as `<id>_cpl.xml` in `directory`.
    pub fn new(
        directory: impl Into<PathBuf>,
        name: &str,
        content_kind: ContentKind,
        length: i64,
        fps: i32,
    ) -> Self {
        let id = AssetId::new();
        Self {
            file: AssetFile::new(id, directory, format!("{id}_cpl.xml")),
            name: name.to_owned(),
            content_kind,
            length,
            fps,
            reels: Vec::new(),
        }
    }

    /// Parse the CPL at `file` (relative to `directory`) and open the essence
    /// of every reel through `asset_map`.
    ///
    /// Essence that cannot be opened leaves its slot `Unavailable`, unless
    /// `require_mxfs` is set, in which case the error is returned.
    pub fn read(
        directory: &Path,
        file: &Path,
        asset_map: &AssetMap,
        backend: &Arc<dyn EssenceBackend>,
        require_mxfs: bool,
    ) -> Result<Self, DcpError> {
        let path = directory.join(file);
        let doc = CplDocument::parse_file(&path)
            .map_err(|e| DcpError::file(format!("could not load CPL file: {e}"), &path))?;

        let mut fps = 0;
        let mut length: i64 = 0;
        let mut reels = Vec::with_capacity(doc.reels.len());
        for cpl_reel in &doc.reels {
            let picture = cpl_reel.picture()?;
            fps = picture.edit_rate.as_fps();
            length = length
                .checked_add(picture.duration)
                .ok_or_else(|| SchemaError::InvalidValue {
                    field: "Duration".to_owned(),
                    value: format!("{} in reel {}", picture.duration, cpl_reel.id),
                })?;

            let reel = read_reel(directory, cpl_reel, asset_map, backend, require_mxfs)?;
            reels.push(Arc::new(reel));
        }
        debug!(
            "read CPL {} with {} reels from {}",
            doc.id,
            reels.len(),
            path.display()
        );

        Ok(Self {
            file: AssetFile::new(doc.id, directory, file),
            name: if doc.annotation_text.is_empty() {
                doc.content_title_text
            } else {
                doc.annotation_text
            },
            content_kind: doc.content_kind,
            length,
            fps,
            reels,
        })
    }

    pub fn id(&self) -> AssetId {
        self.file.id()
    }

    pub fn file(&self) -> &AssetFile {
        &self.file
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content_kind(&self) -> ContentKind {
        self.content_kind
    }

    /// Total length in frames.
    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn fps(&self) -> i32 {
        self.fps
    }

    pub fn reels(&self) -> &[Arc<Reel>] {
        &self.reels
    }

    pub fn add_reel(&mut self, reel: Arc<Reel>) {
        self.reels.push(reel);
    }

    /// Every loaded asset of every reel, in reel order. Shared assets appear
    /// once per reel that holds them.
    pub fn assets(&self) -> Vec<Asset> {
        self.reels.iter().flat_map(|r| r.assets()).collect()
    }

    /// Write `<id>_cpl.xml`, then digest the written file so the CPL can be
    /// listed in a Packing List.
    pub fn write_xml(&self, metadata: &PackageMetadata) -> Result<(), DcpError> {
        let id = self.id();
        let version = format!("{id}_{}", metadata.issue_date);

        let mut w = XmlWriter::document("CompositionPlaylist", &[("xmlns", CPL_NAMESPACE)])?;
        w.text_element("Id", id.urn())?
            .text_element("AnnotationText", &self.name)?
            .text_element("IssueDate", &metadata.issue_date)?
            .text_element("Creator", &metadata.creator)?
            .text_element("ContentTitleText", &self.name)?
            .text_element("ContentKind", self.content_kind.as_str())?
            .open("ContentVersion")?
            .text_element("Id", format!("urn:uri:{version}"))?
            .text_element("LabelText", &version)?
            .close("ContentVersion")?
            .empty("RatingList")?
            .open("ReelList")?;
        for reel in &self.reels {
            reel.write_to_cpl(&mut w)?;
        }
        w.close("ReelList")?;
        let bytes = w.finish("CompositionPlaylist")?;

        let path = self.file.path();
        write_atomic(&path, &bytes)?;
        let digest = self.file.refresh_digest()?;
        debug!("wrote CPL {} ({digest})", path.display());
        Ok(())
    }

    /// Compare with `other`, reporting every difference found.
    ///
    /// Metadata mismatches do not stop the comparison; the reels are still
    /// walked pairwise so that the notes form a full diff.
    pub fn equals(
        &self,
        other: &Cpl,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        let mut equal = true;

        if opt.compare_metadata {
            if self.name != other.name {
                note(
                    NoteType::Error,
                    format!("CPL names differ: {} against {}", self.name, other.name),
                );
                equal = false;
            }
            if self.content_kind != other.content_kind {
                note(
                    NoteType::Error,
                    format!(
                        "content kinds differ: {} against {}",
                        self.content_kind, other.content_kind
                    ),
                );
                equal = false;
            }
            if self.fps != other.fps {
                note(
                    NoteType::Error,
                    format!("frames per second differ: {} against {}", self.fps, other.fps),
                );
                equal = false;
            }
            if self.length != other.length {
                note(
                    NoteType::Error,
                    format!("lengths differ: {} against {}", self.length, other.length),
                );
                equal = false;
            }
        }

        if self.reels.len() != other.reels.len() {
            note(
                NoteType::Error,
                format!(
                    "reel counts differ: {} against {}",
                    self.reels.len(),
                    other.reels.len()
                ),
            );
            return Ok(false);
        }

        for (a, b) in self.reels.iter().zip(&other.reels) {
            if !a.equals(b, opt, note)? {
                equal = false;
            }
        }
        Ok(equal)
    }
}

impl PackageAsset for Cpl {
    fn id(&self) -> AssetId {
        self.file.id()
    }

    fn file_path(&self) -> PathBuf {
        self.file.path()
    }

    fn digest(&self) -> Result<Digest, DcpError> {
        self.file.digest()
    }

    fn size(&self) -> Result<u64, DcpError> {
        self.file.size()
    }

    fn pkl_type(&self) -> &'static str {
        "text/xml"
    }

    fn annotation_text(&self) -> String {
        self.name.clone()
    }
}

/// Whether a reel's picture is stereoscopic: an explicit stereoscopic
/// element says so, and so does a frame rate that differs from the edit
/// rate.
fn is_stereoscopic(reel: &CplReel, picture: &CplReelAsset) -> bool {
    reel.main_stereoscopic_picture.is_some() || picture.effective_frame_rate() != picture.edit_rate
}

fn read_reel(
    directory: &Path,
    reel: &CplReel,
    asset_map: &AssetMap,
    backend: &Arc<dyn EssenceBackend>,
    require_mxfs: bool,
) -> Result<Reel, DcpError> {
    let picture_ref = reel.picture()?;
    let stereoscopic = is_stereoscopic(reel, picture_ref);
    let kind = if stereoscopic {
        PictureKind::Stereo
    } else {
        PictureKind::Mono
    };

    let picture = {
        let file = asset_file(directory, asset_map, picture_ref)?;
        let path = file.path();
        load(picture_ref, path, stereoscopic, require_mxfs, || {
            PictureAsset::read(
                file,
                kind,
                Arc::clone(backend),
                picture_ref.entry_point,
                picture_ref.duration,
            )
        })?
    };

    let sound = match &reel.main_sound {
        Some(r) => {
            let file = asset_file(directory, asset_map, r)?;
            let path = file.path();
            Some(load(r, path, false, require_mxfs, || {
                SoundAsset::read(file, Arc::clone(backend), r.entry_point, r.duration)
            })?)
        }
        None => None,
    };

    let subtitle = match &reel.main_subtitle {
        Some(r) => {
            let file = asset_file(directory, asset_map, r)?;
            let path = file.path();
            Some(load(r, path, false, require_mxfs, || {
                SubtitleAsset::read(file, timing_of(r))
            })?)
        }
        None => None,
    };

    Ok(Reel::from_parts(reel.id, picture, sound, subtitle))
}

fn asset_file(
    directory: &Path,
    asset_map: &AssetMap,
    reference: &CplReelAsset,
) -> Result<AssetFile, DcpError> {
    let path = asset_map.path_of(&reference.id)?;
    Ok(AssetFile::new(reference.id, directory, path))
}

fn timing_of(reference: &CplReelAsset) -> ReelTiming {
    ReelTiming {
        edit_rate: reference.edit_rate,
        intrinsic_duration: reference.intrinsic_duration,
        entry_point: reference.entry_point,
        duration: reference.duration,
    }
}

/// Errors that mean the essence file itself could not be opened.
fn is_unopenable(e: &DcpError) -> bool {
    matches!(
        e,
        DcpError::Essence(_) | DcpError::File { .. } | DcpError::Schema(SchemaError::Io { .. })
    )
}

fn load<T>(
    reference: &CplReelAsset,
    path: PathBuf,
    stereoscopic: bool,
    require_mxfs: bool,
    open: impl FnOnce() -> Result<T, DcpError>,
) -> Result<Essence<T>, DcpError> {
    match open() {
        Ok(asset) => Ok(Essence::Loaded(Arc::new(asset))),
        Err(e) if !require_mxfs && is_unopenable(&e) => {
            warn!("could not open essence {}: {e}", path.display());
            Ok(Essence::Unavailable(MissingEssence {
                reference: reference.clone(),
                path,
                reason: e.to_string(),
                stereoscopic,
            }))
        }
        Err(e) => Err(e),
    }
}
