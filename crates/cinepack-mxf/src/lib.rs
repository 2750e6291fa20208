//! Essence container boundary for cinepack.
//!
//! Picture and sound assets keep their frames in an essence container (MXF
//! in a real package). This crate defines what the package model needs from
//! such a container, the `EssenceBackend` / `EssenceWriter` / `PictureDecoder`
//! traits, and ships one backend: `framed`, a frame-indexed container used for
//! authoring and tests where no MXF toolkit is available.

pub mod backend;
pub mod decoder;
pub mod essence;
pub mod framed;

pub use backend::{select_backend, EssenceBackend, EssenceWriter, PictureDecoder};
pub use decoder::RawSampleDecoder;
pub use essence::{
    EncryptionContext, EssenceDescriptor, EssenceKind, Frame, PictureDescriptor, SoundDescriptor,
    WriterInfo,
};
pub use framed::FramedBackend;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EssenceError {
    #[error("could not open essence file {path} for reading: {reason}")]
    Open { path: PathBuf, reason: String },
    #[error("could not read frame {index} of {path}: {reason}")]
    ReadFrame {
        path: PathBuf,
        index: i64,
        reason: String,
    },
    #[error("could not write essence file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
    #[error("essence file {0} already exists")]
    AlreadyExists(PathBuf),
    #[error("frame {index} is out of range for {path} ({count} frames)")]
    FrameOutOfRange {
        path: PathBuf,
        index: i64,
        count: i64,
    },
    #[error("frame does not match a {0} essence")]
    FrameKindMismatch(EssenceKind),
    #[error("essence backend '{0}' is not available")]
    BackendUnavailable(String),
    #[error("{backend} backend does not support {feature}")]
    Unsupported {
        backend: String,
        feature: &'static str,
    },
    #[error("picture decode failed: {0}")]
    Decode(String),
}

impl EssenceError {
    pub(crate) fn open(path: &std::path::Path, reason: impl ToString) -> Self {
        EssenceError::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: &std::path::Path, reason: impl ToString) -> Self {
        EssenceError::Write {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn essence_error_display_open_names_path() {
        let e = EssenceError::open(std::path::Path::new("/pkg/video.mxf"), "bad magic");
        let msg = e.to_string();
        assert!(msg.contains("/pkg/video.mxf"));
        assert!(msg.contains("bad magic"));
    }

    #[test]
    fn essence_error_display_out_of_range() {
        let e = EssenceError::FrameOutOfRange {
            path: PathBuf::from("a.mxf"),
            index: 30,
            count: 24,
        };
        let msg = e.to_string();
        assert!(msg.contains("30"));
        assert!(msg.contains("24"));
    }

    #[test]
    fn essence_error_display_kind_mismatch() {
        let e = EssenceError::FrameKindMismatch(EssenceKind::StereoPicture);
        assert!(e.to_string().contains("stereo"));
    }
}
