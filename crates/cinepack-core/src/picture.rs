use crate::asset::{AssetFile, AssetWriter, PackageAsset, ReelTiming};
use crate::notes::{EqualityOptions, NoteType};
use crate::DcpError;
use cinepack_mxf::{
    EssenceBackend, EssenceDescriptor, EssenceKind, Frame, PictureDecoder, PictureDescriptor,
    WriterInfo,
};
use cinepack_schema::{AssetId, Digest, Fraction, PackageMetadata};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureKind {
    Mono,
    /// Left and right eyes interleaved in one container.
    Stereo,
}

impl PictureKind {
    /// Container frames per edit unit.
    pub fn edit_rate_factor(self) -> i32 {
        match self {
            PictureKind::Mono => 1,
            PictureKind::Stereo => 2,
        }
    }

    pub fn essence_kind(self) -> EssenceKind {
        match self {
            PictureKind::Mono => EssenceKind::MonoPicture,
            PictureKind::Stereo => EssenceKind::StereoPicture,
        }
    }

    /// Element naming this picture in a CPL reel.
    pub fn cpl_node_name(self) -> &'static str {
        match self {
            PictureKind::Mono => "MainPicture",
            PictureKind::Stereo => "msp-cpl:MainStereoscopicPicture",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A mono or stereoscopic picture track.
pub struct PictureAsset {
    file: AssetFile,
    kind: PictureKind,
    size: Size,
    timing: ReelTiming,
    backend: Arc<dyn EssenceBackend>,
}

impl std::fmt::Debug for PictureAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PictureAsset")
            .field("file", &self.file)
            .field("kind", &self.kind)
            .field("size", &self.size)
            .field("timing", &self.timing)
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl PictureAsset {
    /// Open an existing container and read its descriptor. No frame is
    /// decoded.
    pub fn read(
        file: AssetFile,
        kind: PictureKind,
        backend: Arc<dyn EssenceBackend>,
        entry_point: i64,
        duration: i64,
    ) -> Result<Self, DcpError> {
        let descriptor = backend.read_descriptor(&file.path(), kind.essence_kind())?;
        let picture = descriptor.as_picture().ok_or_else(|| {
            DcpError::file("essence file does not hold pictures", file.path())
        })?;
        Ok(Self {
            size: Size::new(picture.width, picture.height),
            timing: ReelTiming {
                edit_rate: picture.edit_rate,
                intrinsic_duration: picture.intrinsic_duration,
                entry_point,
                duration,
            },
            file,
            kind,
            backend,
        })
    }

    /// A picture asset with no frames yet, to be filled by
    /// [`start_write`](Self::start_write) or [`create`](Self::create).
    pub fn new(
        file: AssetFile,
        kind: PictureKind,
        edit_rate: Fraction,
        size: Size,
        backend: Arc<dyn EssenceBackend>,
    ) -> Self {
        Self {
            file,
            kind,
            size,
            timing: ReelTiming::whole(edit_rate, 0),
            backend,
        }
    }

    pub fn file(&self) -> &AssetFile {
        &self.file
    }

    pub fn kind(&self) -> PictureKind {
        self.kind
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn timing(&self) -> &ReelTiming {
        &self.timing
    }

    pub fn edit_rate(&self) -> Fraction {
        self.timing.edit_rate
    }

    /// Container frame rate: the edit rate times the edit rate factor.
    pub fn frame_rate(&self) -> Result<Fraction, DcpError> {
        Ok(self.timing.edit_rate.scaled(self.kind.edit_rate_factor())?)
    }

    pub fn intrinsic_duration(&self) -> i64 {
        self.timing.intrinsic_duration
    }

    pub fn entry_point(&self) -> i64 {
        self.timing.entry_point
    }

    pub fn duration(&self) -> i64 {
        self.timing.duration
    }

    pub fn get_frame(&self, n: i64) -> Result<Frame, DcpError> {
        Ok(self
            .backend
            .read_frame(&self.file.path(), self.kind.essence_kind(), n)?)
    }

    fn descriptor(&self) -> Result<EssenceDescriptor, DcpError> {
        Ok(EssenceDescriptor::Picture(PictureDescriptor {
            width: self.size.width,
            height: self.size.height,
            edit_rate: self.timing.edit_rate,
            frame_rate: self.frame_rate()?,
            intrinsic_duration: self.timing.intrinsic_duration,
        }))
    }

    /// Start writing the container. With `overwrite` unset an existing file
    /// is an error.
    pub fn start_write(
        &mut self,
        overwrite: bool,
        metadata: &PackageMetadata,
    ) -> Result<AssetWriter<'_>, DcpError> {
        let info = writer_info(self.file.id(), metadata);
        let descriptor = self.descriptor()?;
        let inner = self.backend.open_for_write(
            &self.file.path(),
            self.kind.essence_kind(),
            &descriptor,
            &info,
            overwrite,
        )?;
        Ok(AssetWriter::new(&self.file, &mut self.timing, inner))
    }

    /// Wrap a list of JPEG2000 codestreams, one file per frame. Stereo
    /// pictures take the files in left/right pairs.
    pub fn create(
        &mut self,
        files: &[PathBuf],
        metadata: &PackageMetadata,
        progress: Option<&mut dyn FnMut(f32)>,
    ) -> Result<i64, DcpError> {
        let parts = self.kind.essence_kind().parts_per_frame();
        if files.len() % parts != 0 {
            return Err(DcpError::file(
                format!("stereo pictures need an even number of frame files, got {}", files.len()),
                self.file.path(),
            ));
        }
        let total = (files.len() / parts) as i64;
        let kind = self.kind;

        let mut writer = self.start_write(true, metadata)?;
        if let Some(cb) = progress {
            writer.set_progress(total, cb);
        }
        for chunk in files.chunks(parts) {
            let mut buffers = chunk
                .iter()
                .map(|path| {
                    fs::read(path).map_err(|e| {
                        DcpError::file(
                            format!("could not open JPEG2000 file for reading: {e}"),
                            path.clone(),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let frame = match kind {
                PictureKind::Mono => Frame::Mono(buffers.remove(0)),
                PictureKind::Stereo => {
                    let right = buffers.remove(1);
                    Frame::Stereo {
                        left: buffers.remove(0),
                        right,
                    }
                }
            };
            writer.write(&frame)?;
        }
        let frames = writer.finalize()?;
        debug!("wrapped {frames} picture frames into {}", self.file.path().display());
        Ok(frames)
    }

    /// Compare with `other` down to individual frames.
    ///
    /// Equal file digests settle the comparison at once. Otherwise the
    /// descriptors, the frame counts, and then every frame are compared,
    /// with a `PROGRESS` note per frame.
    pub fn equals(
        &self,
        other: &PictureAsset,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        if self.kind != other.kind {
            note(
                NoteType::Error,
                "picture assets differ in stereoscopy".to_owned(),
            );
            return Ok(false);
        }
        if self.file.digest()? == other.file.digest()? {
            return Ok(true);
        }
        if !opt.compare_frames {
            return self.file.equals(&other.file, note);
        }
        note(
            NoteType::Note,
            "asset hashes differ; comparing essence".to_owned(),
        );

        let kind = self.kind.essence_kind();
        let desc_a = self.backend.read_descriptor(&self.file.path(), kind)?;
        let desc_b = other.backend.read_descriptor(&other.file.path(), kind)?;
        if !descriptors_equal(&desc_a, &desc_b, note) {
            return Ok(false);
        }

        let count = desc_a.intrinsic_duration();
        let other_count = desc_b.intrinsic_duration();
        let decoder = self.backend.picture_decoder();
        for i in 0..count {
            if i >= other_count {
                note(
                    NoteType::Error,
                    "this asset has more frames than the other".to_owned(),
                );
                return Ok(false);
            }
            note(
                NoteType::Progress,
                format!("Comparing video frame {i} of {count}"),
            );
            let frame_a = self.get_frame(i)?;
            let frame_b = other.get_frame(i)?;
            for (a, b) in frame_a.parts().into_iter().zip(frame_b.parts()) {
                if !frame_buffer_equals(i, opt, note, a, b, decoder)? {
                    return Ok(false);
                }
            }
        }
        if other_count > count {
            note(
                NoteType::Error,
                "the other asset has more frames than this one".to_owned(),
            );
            return Ok(false);
        }
        Ok(true)
    }
}

pub(crate) fn writer_info(id: AssetId, metadata: &PackageMetadata) -> WriterInfo {
    WriterInfo {
        company_name: metadata.company_name.clone(),
        product_name: metadata.product_name.clone(),
        product_version: metadata.product_version.clone(),
        ..WriterInfo::new(id)
    }
}

fn descriptors_equal(
    a: &EssenceDescriptor,
    b: &EssenceDescriptor,
    note: &mut dyn FnMut(NoteType, String),
) -> bool {
    let (Some(a), Some(b)) = (a.as_picture(), b.as_picture()) else {
        note(NoteType::Error, "essence is not picture essence".to_owned());
        return false;
    };
    let mut differ = |field: &str| {
        note(
            NoteType::Error,
            format!("video MXF picture descriptors differ: {field}"),
        );
    };
    let mut equal = true;
    if a.width != b.width || a.height != b.height {
        differ("size");
        equal = false;
    }
    if a.edit_rate != b.edit_rate {
        differ("edit rate");
        equal = false;
    }
    if a.frame_rate != b.frame_rate {
        differ("frame rate");
        equal = false;
    }
    equal
}

/// Compare one compressed buffer of frame `index`. Byte-identical buffers are
/// equal; otherwise, given a decoder, the decoded samples must stay within
/// the mean and standard deviation limits of `opt`.
fn frame_buffer_equals(
    index: i64,
    opt: &EqualityOptions,
    note: &mut dyn FnMut(NoteType, String),
    a: &[u8],
    b: &[u8],
    decoder: Option<&dyn PictureDecoder>,
) -> Result<bool, DcpError> {
    if a == b {
        return Ok(true);
    }
    let Some(decoder) = decoder else {
        note(
            NoteType::Error,
            format!("J2K data for frame {index} differ"),
        );
        return Ok(false);
    };

    let samples_a = decoder.decode(a)?;
    let samples_b = decoder.decode(b)?;
    if samples_a.len() != samples_b.len() {
        note(
            NoteType::Error,
            format!("image sizes for frame {index} differ"),
        );
        return Ok(false);
    }
    if samples_a.is_empty() {
        return Ok(true);
    }

    let diffs: Vec<f64> = samples_a
        .iter()
        .zip(&samples_b)
        .map(|(x, y)| f64::from((x - y).abs()))
        .collect();
    let n = diffs.len() as f64;
    let mean = diffs.iter().sum::<f64>() / n;
    let std_dev = (diffs.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n).sqrt();

    if mean > opt.max_mean_pixel_error {
        note(
            NoteType::Error,
            format!(
                "mean difference {mean:.4} in frame {index} exceeds {}",
                opt.max_mean_pixel_error
            ),
        );
        return Ok(false);
    }
    if std_dev > opt.max_std_dev_pixel_error {
        note(
            NoteType::Error,
            format!(
                "standard deviation {std_dev:.4} in frame {index} exceeds {}",
                opt.max_std_dev_pixel_error
            ),
        );
        return Ok(false);
    }
    note(
        NoteType::Note,
        format!("frame {index} within tolerance: mean {mean:.4}, standard deviation {std_dev:.4}"),
    );
    Ok(true)
}

impl PackageAsset for PictureAsset {
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
        "application/mxf"
    }
}
