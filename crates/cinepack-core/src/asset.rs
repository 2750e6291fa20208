use crate::notes::{EqualityOptions, NoteType};
use crate::picture::PictureAsset;
use crate::sound::SoundAsset;
use crate::subtitle::SubtitleAsset;
use crate::DcpError;
use cinepack_mxf::{EssenceWriter, Frame};
use cinepack_schema::{AssetId, Digest, Fraction, XmlWriter};
use cinepack_store::{make_digest, DigestCache, PackageLayout};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The file behind a package asset: its id, where it lives, and a cache of
/// its digest.
///
/// The cache is invalidated on every write through this crate, so a digest
/// is never reused across a rewrite of the file.
#[derive(Debug, Clone)]
pub struct AssetFile {
    id: AssetId,
    directory: PathBuf,
    file_name: PathBuf,
    digest: DigestCache,
}

impl AssetFile {
    /// `file_name` is taken relative to `directory` unless it is absolute.
    pub fn new(id: AssetId, directory: impl Into<PathBuf>, file_name: impl Into<PathBuf>) -> Self {
        Self {
            id,
            directory: directory.into(),
            file_name: file_name.into(),
            digest: DigestCache::new(),
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn file_name(&self) -> &Path {
        &self.file_name
    }

    pub fn path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    pub fn digest(&self) -> Result<Digest, DcpError> {
        Ok(self.digest.get_or_compute(&self.path())?)
    }

    /// Recompute the digest from the file as it is now.
    pub fn refresh_digest(&self) -> Result<Digest, DcpError> {
        let digest = make_digest(&self.path(), None)?;
        self.digest.set(digest.clone());
        Ok(digest)
    }

    pub fn invalidate_digest(&self) {
        self.digest.invalidate();
    }

    pub fn size(&self) -> Result<u64, DcpError> {
        let path = self.path();
        fs::metadata(&path)
            .map(|m| m.len())
            .map_err(|e| DcpError::file(format!("could not read file size: {e}"), path))
    }

    /// Baseline comparison of two files: equal digests or an `ERROR` note.
    pub fn equals(
        &self,
        other: &AssetFile,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        if self.digest()? != other.digest()? {
            note(NoteType::Error, "asset hashes differ".to_owned());
            return Ok(false);
        }
        Ok(true)
    }
}

/// An entry of a package's Packing List and Asset Map.
pub trait PackageAsset {
    fn id(&self) -> AssetId;

    fn file_path(&self) -> PathBuf;

    fn digest(&self) -> Result<Digest, DcpError>;

    fn size(&self) -> Result<u64, DcpError>;

    /// MIME-like type recorded in the Packing List.
    fn pkl_type(&self) -> &'static str;

    fn annotation_text(&self) -> String {
        self.id().to_string()
    }

    fn write_to_pkl(&self, w: &mut XmlWriter) -> Result<(), DcpError> {
        w.open("Asset")?
            .text_element("Id", self.id().urn())?
            .text_element("AnnotationText", self.annotation_text())?
            .text_element("Hash", self.digest()?.as_str())?
            .text_element("Size", self.size()?.to_string())?
            .text_element("Type", self.pkl_type())?
            .close("Asset")?;
        Ok(())
    }

    fn write_to_assetmap(&self, w: &mut XmlWriter, layout: &PackageLayout) -> Result<(), DcpError> {
        w.open("Asset")?.text_element("Id", self.id().urn())?;
        write_chunk_list(w, &layout.relative_path(&self.file_path()), self.size()?)?;
        w.close("Asset")?;
        Ok(())
    }
}

/// A single-volume, single-chunk `ChunkList`.
pub(crate) fn write_chunk_list(
    w: &mut XmlWriter,
    path: &Path,
    length: u64,
) -> Result<(), DcpError> {
    w.open("ChunkList")?
        .open("Chunk")?
        .text_element("Path", path.to_string_lossy())?
        .text_element("VolumeIndex", "1")?
        .text_element("Offset", "0")?
        .text_element("Length", length.to_string())?
        .close("Chunk")?
        .close("ChunkList")?;
    Ok(())
}

/// Timing of an asset inside a reel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReelTiming {
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub entry_point: i64,
    pub duration: i64,
}

impl ReelTiming {
    /// Play every frame of a container of `intrinsic_duration` frames.
    pub fn whole(edit_rate: Fraction, intrinsic_duration: i64) -> Self {
        Self {
            edit_rate,
            intrinsic_duration,
            entry_point: 0,
            duration: intrinsic_duration,
        }
    }
}

/// Writes essence frames into an asset's container, one per call, in
/// presentation order.
///
/// Progress is reported as `0.5 * i / total` after frame `i`; the upper half
/// of the range belongs to whatever follows, such as digesting the file.
/// Dropping the writer without [`finalize`](Self::finalize) discards the
/// partial container.
pub struct AssetWriter<'a> {
    file: &'a AssetFile,
    timing: &'a mut ReelTiming,
    inner: Box<dyn EssenceWriter>,
    progress: Option<(i64, Box<dyn FnMut(f32) + 'a>)>,
}

impl<'a> AssetWriter<'a> {
    pub(crate) fn new(
        file: &'a AssetFile,
        timing: &'a mut ReelTiming,
        inner: Box<dyn EssenceWriter>,
    ) -> Self {
        file.invalidate_digest();
        Self {
            file,
            timing,
            inner,
            progress: None,
        }
    }

    /// Report progress against an expected total of `total_frames`.
    pub fn set_progress(&mut self, total_frames: i64, callback: impl FnMut(f32) + 'a) {
        self.progress = Some((total_frames, Box::new(callback)));
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), DcpError> {
        self.inner.write_frame(frame)?;
        if let Some((total, callback)) = self.progress.as_mut() {
            if *total > 0 {
                let index = self.inner.frames_written() - 1;
                callback(0.5 * index as f32 / *total as f32);
            }
        }
        Ok(())
    }

    pub fn frames_written(&self) -> i64 {
        self.inner.frames_written()
    }

    /// Complete the container; the asset then plays all of its frames.
    pub fn finalize(self) -> Result<i64, DcpError> {
        let frames = self.inner.finalize()?;
        *self.timing = ReelTiming::whole(self.timing.edit_rate, frames);
        self.file.invalidate_digest();
        Ok(frames)
    }
}

/// A picture, sound, or subtitle asset held by one or more reels.
#[derive(Debug, Clone)]
pub enum Asset {
    Picture(Arc<PictureAsset>),
    Sound(Arc<SoundAsset>),
    Subtitle(Arc<SubtitleAsset>),
}

impl Asset {
    fn inner(&self) -> &dyn PackageAsset {
        match self {
            Asset::Picture(p) => &**p,
            Asset::Sound(s) => &**s,
            Asset::Subtitle(s) => &**s,
        }
    }

    pub fn equals(
        &self,
        other: &Asset,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        match (self, other) {
            (Asset::Picture(a), Asset::Picture(b)) => a.equals(b, opt, note),
            (Asset::Sound(a), Asset::Sound(b)) => a.equals(b, opt, note),
            (Asset::Subtitle(a), Asset::Subtitle(b)) => a.equals(b, opt, note),
            _ => {
                note(NoteType::Error, "asset types differ".to_owned());
                Ok(false)
            }
        }
    }
}

impl PackageAsset for Asset {
    fn id(&self) -> AssetId {
        self.inner().id()
    }

    fn file_path(&self) -> PathBuf {
        self.inner().file_path()
    }

    fn digest(&self) -> Result<Digest, DcpError> {
        self.inner().digest()
    }

    fn size(&self) -> Result<u64, DcpError> {
        self.inner().size()
    }

    fn pkl_type(&self) -> &'static str {
        self.inner().pkl_type()
    }
}
