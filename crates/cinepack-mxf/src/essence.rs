use cinepack_schema::{AssetId, Fraction};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What an essence container holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EssenceKind {
    MonoPicture,
    StereoPicture,
    Sound,
}

impl EssenceKind {
    /// Number of buffers in one frame of this kind.
    pub fn parts_per_frame(self) -> usize {
        match self {
            EssenceKind::StereoPicture => 2,
            EssenceKind::MonoPicture | EssenceKind::Sound => 1,
        }
    }
}

impl fmt::Display for EssenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EssenceKind::MonoPicture => "mono picture",
            EssenceKind::StereoPicture => "stereo picture",
            EssenceKind::Sound => "sound",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PictureDescriptor {
    pub width: u32,
    pub height: u32,
    pub edit_rate: Fraction,
    pub frame_rate: Fraction,
    pub intrinsic_duration: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoundDescriptor {
    pub channels: u16,
    pub sampling_rate: u32,
    pub bits_per_sample: u16,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
}

/// Essence metadata read without decoding any frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EssenceDescriptor {
    Picture(PictureDescriptor),
    Sound(SoundDescriptor),
}

impl EssenceDescriptor {
    pub fn intrinsic_duration(&self) -> i64 {
        match self {
            EssenceDescriptor::Picture(p) => p.intrinsic_duration,
            EssenceDescriptor::Sound(s) => s.intrinsic_duration,
        }
    }

    pub fn edit_rate(&self) -> Fraction {
        match self {
            EssenceDescriptor::Picture(p) => p.edit_rate,
            EssenceDescriptor::Sound(s) => s.edit_rate,
        }
    }

    pub(crate) fn set_intrinsic_duration(&mut self, frames: i64) {
        match self {
            EssenceDescriptor::Picture(p) => p.intrinsic_duration = frames,
            EssenceDescriptor::Sound(s) => s.intrinsic_duration = frames,
        }
    }

    pub fn as_picture(&self) -> Option<&PictureDescriptor> {
        match self {
            EssenceDescriptor::Picture(p) => Some(p),
            EssenceDescriptor::Sound(_) => None,
        }
    }

    pub fn as_sound(&self) -> Option<&SoundDescriptor> {
        match self {
            EssenceDescriptor::Sound(s) => Some(s),
            EssenceDescriptor::Picture(_) => None,
        }
    }

    /// Whether this descriptor can describe essence of `kind`.
    pub fn fits(&self, kind: EssenceKind) -> bool {
        matches!(
            (self, kind),
            (
                EssenceDescriptor::Picture(_),
                EssenceKind::MonoPicture | EssenceKind::StereoPicture
            ) | (EssenceDescriptor::Sound(_), EssenceKind::Sound)
        )
    }
}

/// One edit unit of essence: a compressed picture, a left/right pair, or a
/// block of interleaved PCM samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Mono(Vec<u8>),
    Stereo { left: Vec<u8>, right: Vec<u8> },
    Sound(Vec<u8>),
}

impl Frame {
    pub fn kind(&self) -> EssenceKind {
        match self {
            Frame::Mono(_) => EssenceKind::MonoPicture,
            Frame::Stereo { .. } => EssenceKind::StereoPicture,
            Frame::Sound(_) => EssenceKind::Sound,
        }
    }

    /// The buffers of this frame in storage order (left before right).
    pub fn parts(&self) -> Vec<&[u8]> {
        match self {
            Frame::Mono(data) | Frame::Sound(data) => vec![data.as_slice()],
            Frame::Stereo { left, right } => vec![left.as_slice(), right.as_slice()],
        }
    }

    pub(crate) fn from_parts(kind: EssenceKind, mut parts: Vec<Vec<u8>>) -> Option<Frame> {
        if parts.len() != kind.parts_per_frame() {
            return None;
        }
        Some(match kind {
            EssenceKind::MonoPicture => Frame::Mono(parts.remove(0)),
            EssenceKind::Sound => Frame::Sound(parts.remove(0)),
            EssenceKind::StereoPicture => {
                let right = parts.remove(1);
                let left = parts.remove(0);
                Frame::Stereo { left, right }
            }
        })
    }

    pub fn byte_len(&self) -> usize {
        self.parts().iter().map(|p| p.len()).sum()
    }
}

/// Key used to encrypt essence as it is written.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    pub key_id: AssetId,
    pub key: [u8; 16],
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Identification the package model hands to an essence writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterInfo {
    pub asset_id: AssetId,
    pub encryption: Option<EncryptionContext>,
    pub company_name: String,
    pub product_name: String,
    pub product_version: String,
}

impl WriterInfo {
    pub fn new(asset_id: AssetId) -> Self {
        Self {
            asset_id,
            encryption: None,
            company_name: String::new(),
            product_name: String::new(),
            product_version: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_frame_parts_keep_eye_order() {
        let frame = Frame::Stereo {
            left: vec![1],
            right: vec![2, 3],
        };
        assert_eq!(frame.parts(), vec![&[1u8][..], &[2u8, 3][..]]);
        assert_eq!(frame.byte_len(), 3);
        let rebuilt =
            Frame::from_parts(EssenceKind::StereoPicture, vec![vec![1], vec![2, 3]]).unwrap();
        assert_eq!(rebuilt, frame);
    }

    #[test]
    fn from_parts_rejects_wrong_count() {
        assert!(Frame::from_parts(EssenceKind::MonoPicture, vec![vec![1], vec![2]]).is_none());
        assert!(Frame::from_parts(EssenceKind::StereoPicture, vec![vec![1]]).is_none());
    }

    #[test]
    fn descriptor_fits_kind() {
        let picture = EssenceDescriptor::Picture(PictureDescriptor {
            width: 1998,
            height: 1080,
            edit_rate: Fraction::new(24, 1),
            frame_rate: Fraction::new(24, 1),
            intrinsic_duration: 0,
        });
        assert!(picture.fits(EssenceKind::MonoPicture));
        assert!(picture.fits(EssenceKind::StereoPicture));
        assert!(!picture.fits(EssenceKind::Sound));
    }

    #[test]
    fn encryption_key_not_in_debug_output() {
        let ctx = EncryptionContext {
            key_id: AssetId::parse("00000000-0000-4000-8000-000000000000").unwrap(),
            key: [0xAB; 16],
        };
        let text = format!("{ctx:?}");
        assert!(!text.contains("171"));
        assert!(text.contains("key_id"));
    }
}
