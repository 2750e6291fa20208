use crate::asset::{AssetFile, AssetWriter, PackageAsset, ReelTiming};
use crate::notes::{EqualityOptions, NoteType};
use crate::picture::writer_info;
use crate::DcpError;
use cinepack_mxf::{EssenceBackend, EssenceDescriptor, EssenceKind, Frame, SoundDescriptor};
use cinepack_schema::{AssetId, Digest, Fraction, PackageMetadata};
use std::path::PathBuf;
use std::sync::Arc;

/// A PCM sound track, one block of interleaved samples per edit unit.
pub struct SoundAsset {
    file: AssetFile,
    channels: u16,
    sampling_rate: u32,
    bits_per_sample: u16,
    timing: ReelTiming,
    backend: Arc<dyn EssenceBackend>,
}

impl std::fmt::Debug for SoundAsset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundAsset")
            .field("file", &self.file)
            .field("channels", &self.channels)
            .field("sampling_rate", &self.sampling_rate)
            .field("bits_per_sample", &self.bits_per_sample)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl SoundAsset {
    pub fn read(
        file: AssetFile,
        backend: Arc<dyn EssenceBackend>,
        entry_point: i64,
        duration: i64,
    ) -> Result<Self, DcpError> {
        let descriptor = backend.read_descriptor(&file.path(), EssenceKind::Sound)?;
        let sound = descriptor
            .as_sound()
            .ok_or_else(|| DcpError::file("essence file does not hold sound", file.path()))?;
        Ok(Self {
            channels: sound.channels,
            sampling_rate: sound.sampling_rate,
            bits_per_sample: sound.bits_per_sample,
            timing: ReelTiming {
                edit_rate: sound.edit_rate,
                intrinsic_duration: sound.intrinsic_duration,
                entry_point,
                duration,
            },
            file,
            backend,
        })
    }

    /// A 24-bit sound asset with no frames yet.
    pub fn new(
        file: AssetFile,
        edit_rate: Fraction,
        channels: u16,
        sampling_rate: u32,
        backend: Arc<dyn EssenceBackend>,
    ) -> Self {
        Self {
            file,
            channels,
            sampling_rate,
            bits_per_sample: 24,
            timing: ReelTiming::whole(edit_rate, 0),
            backend,
        }
    }

    pub fn file(&self) -> &AssetFile {
        &self.file
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn timing(&self) -> &ReelTiming {
        &self.timing
    }

    pub fn edit_rate(&self) -> Fraction {
        self.timing.edit_rate
    }

    pub fn intrinsic_duration(&self) -> i64 {
        self.timing.intrinsic_duration
    }

    pub fn duration(&self) -> i64 {
        self.timing.duration
    }

    pub fn get_frame(&self, n: i64) -> Result<Frame, DcpError> {
        Ok(self
            .backend
            .read_frame(&self.file.path(), EssenceKind::Sound, n)?)
    }

    pub fn start_write(
        &mut self,
        overwrite: bool,
        metadata: &PackageMetadata,
    ) -> Result<AssetWriter<'_>, DcpError> {
        let descriptor = EssenceDescriptor::Sound(SoundDescriptor {
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            bits_per_sample: self.bits_per_sample,
            edit_rate: self.timing.edit_rate,
            intrinsic_duration: self.timing.intrinsic_duration,
        });
        let inner = self.backend.open_for_write(
            &self.file.path(),
            EssenceKind::Sound,
            &descriptor,
            &writer_info(self.file.id(), metadata),
            overwrite,
        )?;
        Ok(AssetWriter::new(&self.file, &mut self.timing, inner))
    }

    /// Compare with `other` sample by sample. Equal digests settle it at once.
    pub fn equals(
        &self,
        other: &SoundAsset,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
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

        let mut equal = true;
        let mut differ = |field: &str| {
            note(
                NoteType::Error,
                format!("audio MXF descriptors differ: {field}"),
            );
            equal = false;
        };
        if self.channels != other.channels {
            differ("channel count");
        }
        if self.sampling_rate != other.sampling_rate {
            differ("sampling rate");
        }
        if self.bits_per_sample != other.bits_per_sample {
            differ("bits per sample");
        }
        if self.timing.edit_rate != other.timing.edit_rate {
            differ("edit rate");
        }
        if !equal {
            return Ok(false);
        }

        let count = self.timing.intrinsic_duration;
        if count != other.timing.intrinsic_duration {
            note(
                NoteType::Error,
                format!(
                    "audio frame counts differ: {count} against {}",
                    other.timing.intrinsic_duration
                ),
            );
            return Ok(false);
        }

        let width = usize::from(self.bits_per_sample.div_ceil(8)).clamp(1, 4);
        for i in 0..count {
            note(
                NoteType::Progress,
                format!("Comparing audio frame {i} of {count}"),
            );
            let a = self.get_frame(i)?;
            let b = other.get_frame(i)?;
            let (Frame::Sound(a), Frame::Sound(b)) = (&a, &b) else {
                return Err(DcpError::file(
                    "essence file does not hold sound",
                    self.file.path(),
                ));
            };
            if a == b {
                continue;
            }
            if a.len() != b.len() {
                note(
                    NoteType::Error,
                    format!("PCM data sizes of frame {i} differ"),
                );
                return Ok(false);
            }
            let worst = a
                .chunks(width)
                .zip(b.chunks(width))
                .map(|(x, y)| (i64::from(sample(x)) - i64::from(sample(y))).abs())
                .max()
                .unwrap_or(0);
            if worst > i64::from(opt.max_audio_sample_error) {
                note(
                    NoteType::Error,
                    format!("PCM data difference of {worst} in frame {i}"),
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Little-endian signed PCM sample of up to four bytes.
fn sample(bytes: &[u8]) -> i32 {
    let n = bytes.len().min(4);
    if n == 0 {
        return 0;
    }
    let mut raw = [0u8; 4];
    raw[4 - n..].copy_from_slice(&bytes[..n]);
    // Arithmetic shift back down sign-extends.
    i32::from_le_bytes(raw) >> (8 * (4 - n))
}

impl PackageAsset for SoundAsset {
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

#[cfg(test)]
mod tests {
    use super::*;
    use cinepack_mxf::FramedBackend;
    use std::path::Path;

    const FPS: Fraction = Fraction::new(24, 1);

    fn write_sound(dir: &Path, name: &str, frames: &[Vec<u8>]) -> SoundAsset {
        let file = AssetFile::new(AssetId::new(), dir, name);
        let mut asset = SoundAsset::new(file, FPS, 1, 48_000, Arc::new(FramedBackend::new()));
        let mut writer = asset.start_write(false, &PackageMetadata::default()).unwrap();
        for f in frames {
            writer.write(&Frame::Sound(f.clone())).unwrap();
        }
        writer.finalize().unwrap();
        asset
    }

    fn compare(a: &SoundAsset, b: &SoundAsset, opt: &EqualityOptions) -> (bool, Vec<String>) {
        let mut notes = Vec::new();
        let equal = a
            .equals(b, opt, &mut |kind, msg| {
                if kind == NoteType::Error {
                    notes.push(msg);
                }
            })
            .unwrap();
        (equal, notes)
    }

    #[test]
    fn samples_are_sign_extended() {
        assert_eq!(sample(&[0xff, 0xff, 0xff]), -1);
        assert_eq!(sample(&[0x01, 0x00, 0x00]), 1);
        assert_eq!(sample(&[0x00, 0x00, 0x80]), -8_388_608);
        assert_eq!(sample(&[0xff, 0x7f]), 32_767);
        assert_eq!(sample(&[0x80]), -128);
    }

    #[test]
    fn read_back_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_sound(dir.path(), "a.mxf", &[vec![0; 6], vec![1; 6]]);
        let file = AssetFile::new(written.file().id(), dir.path(), "a.mxf");
        let read = SoundAsset::read(file, Arc::new(FramedBackend::new()), 0, 2).unwrap();
        assert_eq!(read.channels(), 1);
        assert_eq!(read.sampling_rate(), 48_000);
        assert_eq!(read.bits_per_sample(), 24);
        assert_eq!(read.intrinsic_duration(), 2);
        assert_eq!(read.get_frame(1).unwrap(), Frame::Sound(vec![1; 6]));
    }

    #[test]
    fn sound_file_is_not_a_picture() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_sound(dir.path(), "a.mxf", &[vec![0; 3]]);
        let file = AssetFile::new(written.file().id(), dir.path(), "a.mxf");
        let backend: Arc<dyn EssenceBackend> = Arc::new(FramedBackend::new());
        assert!(crate::PictureAsset::read(file, crate::PictureKind::Mono, backend, 0, 1).is_err());
    }

    #[test]
    fn sample_error_tolerance() {
        let dir = tempfile::tempdir().unwrap();
        // One 24-bit sample: 5 against 8.
        let a = write_sound(dir.path(), "a.mxf", &[vec![5, 0, 0]]);
        let b = write_sound(dir.path(), "b.mxf", &[vec![8, 0, 0]]);

        let (equal, notes) = compare(&a, &b, &EqualityOptions::default());
        assert!(!equal);
        assert_eq!(notes, vec!["PCM data difference of 3 in frame 0".to_owned()]);

        let loose = EqualityOptions {
            max_audio_sample_error: 3,
            ..EqualityOptions::default()
        };
        assert!(compare(&a, &b, &loose).0);
    }

    #[test]
    fn frame_counts_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_sound(dir.path(), "a.mxf", &[vec![0; 3], vec![0; 3]]);
        let b = write_sound(dir.path(), "b.mxf", &[vec![0; 3]]);
        let (equal, notes) = compare(&a, &b, &EqualityOptions::default());
        assert!(!equal);
        assert!(notes[0].contains("frame counts differ"));
    }

    #[test]
    fn descriptor_differences_are_all_listed() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_sound(dir.path(), "a.mxf", &[vec![0; 3]]);
        let file = AssetFile::new(AssetId::new(), dir.path(), "b.mxf");
        let mut b = SoundAsset::new(
            file,
            Fraction::new(25, 1),
            6,
            96_000,
            Arc::new(FramedBackend::new()),
        );
        let mut writer = b.start_write(false, &PackageMetadata::default()).unwrap();
        writer.write(&Frame::Sound(vec![0; 18])).unwrap();
        writer.finalize().unwrap();

        let (equal, notes) = compare(&a, &b, &EqualityOptions::default());
        assert!(!equal);
        assert_eq!(notes.len(), 3);
    }
}
