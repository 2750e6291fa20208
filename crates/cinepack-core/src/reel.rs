use crate::asset::{Asset, PackageAsset, ReelTiming};
use crate::notes::{EqualityOptions, NoteType};
use crate::picture::{PictureAsset, PictureKind, Size};
use crate::sound::SoundAsset;
use crate::subtitle::SubtitleAsset;
use crate::DcpError;
use cinepack_schema::{AssetId, CplReelAsset, Fraction, XmlWriter};
use std::path::PathBuf;
use std::sync::Arc;

/// Namespace of the SMPTE 429-10 stereoscopic picture extension.
pub const STEREO_PICTURE_NAMESPACE: &str =
    "http://www.smpte-ra.org/schemas/429-10/2008/Main-Stereo-Picture-CPL";

/// A reel slot whose essence could not be opened while reading a CPL.
///
/// The CPL reference is kept, so the reel still knows its timing and can be
/// written back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingEssence {
    pub reference: CplReelAsset,
    pub path: PathBuf,
    pub reason: String,
    pub stereoscopic: bool,
}

impl MissingEssence {
    fn timing(&self) -> ReelTiming {
        ReelTiming {
            edit_rate: self.reference.edit_rate,
            intrinsic_duration: self.reference.intrinsic_duration,
            entry_point: self.reference.entry_point,
            duration: self.reference.duration,
        }
    }
}

/// The asset behind a reel slot, or why it is not there.
#[derive(Debug)]
pub enum Essence<T> {
    Loaded(Arc<T>),
    Unavailable(MissingEssence),
}

impl<T> Clone for Essence<T> {
    fn clone(&self) -> Self {
        match self {
            Essence::Loaded(asset) => Essence::Loaded(Arc::clone(asset)),
            Essence::Unavailable(missing) => Essence::Unavailable(missing.clone()),
        }
    }
}

impl<T> Essence<T> {
    pub fn loaded(&self) -> Option<&Arc<T>> {
        match self {
            Essence::Loaded(asset) => Some(asset),
            Essence::Unavailable(_) => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Essence::Loaded(_))
    }
}

/// One picture with optional sound and subtitles, played together.
#[derive(Debug, Clone)]
pub struct Reel {
    id: AssetId,
    picture: Essence<PictureAsset>,
    sound: Option<Essence<SoundAsset>>,
    subtitle: Option<Essence<SubtitleAsset>>,
}

impl Reel {
    pub fn new(
        picture: Arc<PictureAsset>,
        sound: Option<Arc<SoundAsset>>,
        subtitle: Option<Arc<SubtitleAsset>>,
    ) -> Self {
        Self::from_parts(
            AssetId::new(),
            Essence::Loaded(picture),
            sound.map(Essence::Loaded),
            subtitle.map(Essence::Loaded),
        )
    }

    pub fn from_parts(
        id: AssetId,
        picture: Essence<PictureAsset>,
        sound: Option<Essence<SoundAsset>>,
        subtitle: Option<Essence<SubtitleAsset>>,
    ) -> Self {
        Self {
            id,
            picture,
            sound,
            subtitle,
        }
    }

    pub fn id(&self) -> AssetId {
        self.id
    }

    pub fn picture(&self) -> &Essence<PictureAsset> {
        &self.picture
    }

    pub fn sound(&self) -> Option<&Essence<SoundAsset>> {
        self.sound.as_ref()
    }

    pub fn subtitle(&self) -> Option<&Essence<SubtitleAsset>> {
        self.subtitle.as_ref()
    }

    /// Frames of the picture that this reel plays.
    pub fn duration(&self) -> i64 {
        match &self.picture {
            Essence::Loaded(p) => p.duration(),
            Essence::Unavailable(m) => m.reference.duration,
        }
    }

    pub fn edit_rate(&self) -> Fraction {
        match &self.picture {
            Essence::Loaded(p) => p.edit_rate(),
            Essence::Unavailable(m) => m.reference.edit_rate,
        }
    }

    pub fn is_stereoscopic(&self) -> bool {
        match &self.picture {
            Essence::Loaded(p) => p.kind() == PictureKind::Stereo,
            Essence::Unavailable(m) => m.stereoscopic,
        }
    }

    /// The loaded assets of this reel: picture, sound, subtitle.
    pub fn assets(&self) -> Vec<Asset> {
        let mut assets = Vec::with_capacity(3);
        if let Some(p) = self.picture.loaded() {
            assets.push(Asset::Picture(Arc::clone(p)));
        }
        if let Some(s) = self.sound.as_ref().and_then(Essence::loaded) {
            assets.push(Asset::Sound(Arc::clone(s)));
        }
        if let Some(s) = self.subtitle.as_ref().and_then(Essence::loaded) {
            assets.push(Asset::Subtitle(Arc::clone(s)));
        }
        assets
    }

    /// Write this reel's `<Reel>` element into a CPL's `ReelList`.
    pub fn write_to_cpl(&self, w: &mut XmlWriter) -> Result<(), DcpError> {
        w.open("Reel")?
            .text_element("Id", self.id.urn())?
            .open("AssetList")?;

        let kind = if self.is_stereoscopic() {
            PictureKind::Stereo
        } else {
            PictureKind::Mono
        };
        let picture = match &self.picture {
            Essence::Loaded(p) => Reference {
                id: p.file().id(),
                annotation: p.annotation_text(),
                timing: *p.timing(),
                frame_rate: Some(p.frame_rate()?),
                aspect: Some(p.size()),
            },
            Essence::Unavailable(m) => Reference {
                frame_rate: Some(m.reference.effective_frame_rate()),
                ..Reference::missing(m)
            },
        };
        picture.write(w, kind.cpl_node_name())?;

        if let Some(sound) = &self.sound {
            let reference = match sound {
                Essence::Loaded(s) => Reference::loaded(&**s, *s.timing()),
                Essence::Unavailable(m) => Reference::missing(m),
            };
            reference.write(w, "MainSound")?;
        }
        if let Some(subtitle) = &self.subtitle {
            let reference = match subtitle {
                Essence::Loaded(s) => Reference::loaded(&**s, *s.timing()),
                Essence::Unavailable(m) => Reference::missing(m),
            };
            reference.write(w, "MainSubtitle")?;
        }

        w.close("AssetList")?.close("Reel")?;
        Ok(())
    }

    /// Compare slot by slot. A slot present on one side only makes the
    /// reels differ; present slots compare their assets.
    pub fn equals(
        &self,
        other: &Reel,
        opt: &EqualityOptions,
        note: &mut dyn FnMut(NoteType, String),
    ) -> Result<bool, DcpError> {
        if !essence_equals("picture", &self.picture, &other.picture, note, |a, b, note| {
            a.equals(b, opt, note)
        })? {
            return Ok(false);
        }

        match (&self.sound, &other.sound) {
            (Some(a), Some(b)) => {
                if !essence_equals("sound", a, b, note, |a, b, note| a.equals(b, opt, note))? {
                    return Ok(false);
                }
            }
            (None, None) => {}
            _ => {
                note(NoteType::Error, "reel has different assets: sound".to_owned());
                return Ok(false);
            }
        }

        match (&self.subtitle, &other.subtitle) {
            (Some(a), Some(b)) => {
                essence_equals("subtitle", a, b, note, |a, b, note| a.equals(b, opt, note))
            }
            (None, None) => Ok(true),
            _ => {
                note(
                    NoteType::Error,
                    "reel has different assets: subtitle".to_owned(),
                );
                Ok(false)
            }
        }
    }
}

fn essence_equals<T>(
    slot: &str,
    a: &Essence<T>,
    b: &Essence<T>,
    note: &mut dyn FnMut(NoteType, String),
    compare: impl FnOnce(&T, &T, &mut dyn FnMut(NoteType, String)) -> Result<bool, DcpError>,
) -> Result<bool, DcpError> {
    match (a, b) {
        (Essence::Loaded(a), Essence::Loaded(b)) => compare(a.as_ref(), b.as_ref(), note),
        (Essence::Unavailable(a), Essence::Unavailable(b)) => {
            note(
                NoteType::Note,
                format!("{slot} essence unavailable on both sides; comparing CPL timing only"),
            );
            if a.timing() != b.timing() {
                note(NoteType::Error, format!("{slot} reel timing differs"));
                return Ok(false);
            }
            Ok(true)
        }
        _ => {
            note(
                NoteType::Error,
                format!("{slot} essence is unavailable on one side"),
            );
            Ok(false)
        }
    }
}

/// What a CPL says about one asset of a reel.
struct Reference {
    id: AssetId,
    annotation: String,
    timing: ReelTiming,
    frame_rate: Option<Fraction>,
    aspect: Option<Size>,
}

impl Reference {
    fn loaded(asset: &dyn PackageAsset, timing: ReelTiming) -> Self {
        Self {
            id: asset.id(),
            annotation: asset.annotation_text(),
            timing,
            frame_rate: None,
            aspect: None,
        }
    }

    fn missing(m: &MissingEssence) -> Self {
        Self {
            id: m.reference.id,
            annotation: m
                .reference
                .annotation_text
                .clone()
                .unwrap_or_else(|| m.reference.id.to_string()),
            timing: m.timing(),
            frame_rate: None,
            aspect: None,
        }
    }

    fn write(&self, w: &mut XmlWriter, element: &str) -> Result<(), DcpError> {
        if element.starts_with("msp-cpl:") {
            w.open_with(element, &[("xmlns:msp-cpl", STEREO_PICTURE_NAMESPACE)])?;
        } else {
            w.open(element)?;
        }
        w.text_element("Id", self.id.urn())?
            .text_element("AnnotationText", &self.annotation)?
            .text_element("EditRate", self.timing.edit_rate.to_string())?
            .text_element("IntrinsicDuration", self.timing.intrinsic_duration.to_string())?
            .text_element("EntryPoint", self.timing.entry_point.to_string())?
            .text_element("Duration", self.timing.duration.to_string())?;
        if let Some(rate) = self.frame_rate {
            w.text_element("FrameRate", rate.to_string())?;
        }
        if let Some(size) = self.aspect {
            w.text_element("ScreenAspectRatio", format!("{} {}", size.width, size.height))?;
        }
        w.close(element)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetFile;
    use cinepack_mxf::{EssenceBackend, FramedBackend, Frame};
    use cinepack_schema::{PackageMetadata, XmlNode};
    use std::path::Path;

    const FPS: Fraction = Fraction::new(24, 1);

    fn picture(dir: &Path, name: &str, kind: PictureKind, frames: usize) -> Arc<PictureAsset> {
        let backend: Arc<dyn EssenceBackend> = Arc::new(FramedBackend::new());
        let file = AssetFile::new(AssetId::new(), dir, name);
        let mut asset = PictureAsset::new(file, kind, FPS, Size::new(1998, 1080), backend);
        let mut writer = asset.start_write(false, &PackageMetadata::default()).unwrap();
        for i in 0..frames {
            let frame = match kind {
                PictureKind::Mono => Frame::Mono(vec![i as u8; 8]),
                PictureKind::Stereo => Frame::Stereo {
                    left: vec![i as u8; 8],
                    right: vec![i as u8 + 1; 8],
                },
            };
            writer.write(&frame).unwrap();
        }
        writer.finalize().unwrap();
        Arc::new(asset)
    }

    fn missing(duration: i64) -> MissingEssence {
        MissingEssence {
            reference: CplReelAsset {
                id: AssetId::new(),
                annotation_text: None,
                edit_rate: FPS,
                intrinsic_duration: duration,
                entry_point: 0,
                duration,
                frame_rate: None,
            },
            path: PathBuf::from("gone.mxf"),
            reason: "not found".to_owned(),
            stereoscopic: false,
        }
    }

    fn fragment(reel: &Reel) -> XmlNode {
        let mut w = XmlWriter::new();
        reel.write_to_cpl(&mut w).unwrap();
        let text = String::from_utf8(w.into_bytes()).unwrap();
        XmlNode::parse_str(&text).unwrap()
    }

    #[test]
    fn mono_reel_fragment() {
        let dir = tempfile::tempdir().unwrap();
        let p = picture(dir.path(), "p.mxf", PictureKind::Mono, 3);
        let reel = Reel::new(Arc::clone(&p), None, None);

        let node = fragment(&reel);
        assert_eq!(node.name, "Reel");
        assert_eq!(node.id_child("Id").unwrap(), reel.id());
        let main = node.child("AssetList").unwrap().child("MainPicture").unwrap();
        assert_eq!(main.id_child("Id").unwrap(), p.file().id());
        assert_eq!(main.fraction_child("EditRate").unwrap(), FPS);
        assert_eq!(main.fraction_child("FrameRate").unwrap(), FPS);
        assert_eq!(main.number_child::<i64>("Duration").unwrap(), 3);
        assert_eq!(main.number_child::<i64>("EntryPoint").unwrap(), 0);
        assert_eq!(main.string_child("ScreenAspectRatio").unwrap(), "1998 1080");
    }

    #[test]
    fn stereo_reel_uses_stereoscopic_element() {
        let dir = tempfile::tempdir().unwrap();
        let reel = Reel::new(picture(dir.path(), "p.mxf", PictureKind::Stereo, 2), None, None);
        let node = fragment(&reel);
        let list = node.child("AssetList").unwrap();
        assert!(list.optional_child("MainPicture").is_none());
        let stereo = list.child("MainStereoscopicPicture").unwrap();
        assert_eq!(stereo.fraction_child("FrameRate").unwrap(), Fraction::new(48, 1));
    }

    #[test]
    fn unavailable_picture_keeps_its_reference() {
        let reel = Reel::from_parts(
            AssetId::new(),
            Essence::Unavailable(missing(48)),
            None,
            None,
        );
        assert_eq!(reel.duration(), 48);
        assert!(reel.assets().is_empty());
        let node = fragment(&reel);
        let main = node.child("AssetList").unwrap().child("MainPicture").unwrap();
        assert_eq!(main.number_child::<i64>("Duration").unwrap(), 48);
    }

    #[test]
    fn assets_lists_loaded_slots_only() {
        let dir = tempfile::tempdir().unwrap();
        let reel = Reel::from_parts(
            AssetId::new(),
            Essence::Loaded(picture(dir.path(), "p.mxf", PictureKind::Mono, 1)),
            Some(Essence::Unavailable(missing(1))),
            None,
        );
        let assets = reel.assets();
        assert_eq!(assets.len(), 1);
        assert!(matches!(assets[0], Asset::Picture(_)));
    }

    #[test]
    fn slot_presence_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let p = picture(dir.path(), "p.mxf", PictureKind::Mono, 1);
        let a = Reel::from_parts(
            AssetId::new(),
            Essence::Loaded(Arc::clone(&p)),
            Some(Essence::Unavailable(missing(1))),
            None,
        );
        let b = Reel::new(p, None, None);

        let mut errors = Vec::new();
        let equal = a
            .equals(&b, &EqualityOptions::default(), &mut |kind, msg| {
                if kind == NoteType::Error {
                    errors.push(msg);
                }
            })
            .unwrap();
        assert!(!equal);
        assert_eq!(errors, vec!["reel has different assets: sound".to_owned()]);
    }

    #[test]
    fn same_picture_compares_equal() {
        let dir = tempfile::tempdir().unwrap();
        let p = picture(dir.path(), "p.mxf", PictureKind::Mono, 2);
        let a = Reel::new(Arc::clone(&p), None, None);
        let b = Reel::new(p, None, None);
        assert!(a
            .equals(&b, &EqualityOptions::default(), &mut |_, _| {})
            .unwrap());
    }

    #[test]
    fn loaded_against_unavailable_differs() {
        let dir = tempfile::tempdir().unwrap();
        let a = Reel::new(picture(dir.path(), "p.mxf", PictureKind::Mono, 1), None, None);
        let b = Reel::from_parts(AssetId::new(), Essence::Unavailable(missing(1)), None, None);
        let mut errors = Vec::new();
        let equal = a
            .equals(&b, &EqualityOptions::default(), &mut |kind, msg| {
                if kind == NoteType::Error {
                    errors.push(msg);
                }
            })
            .unwrap();
        assert!(!equal);
        assert!(errors[0].contains("unavailable on one side"));
    }
}
