//! Digital Cinema Package model for cinepack.
//!
//! This crate ties the schema, store, and essence layers together into the
//! package model: picture, sound, and subtitle assets, reels, Composition
//! Playlists (`Cpl`) and whole packages (`Dcp`). It writes the Packing List,
//! Volume Index, and Asset Map of a package, reads existing packages through
//! their Asset Map, and compares two packages down to individual frames,
//! reporting every difference as a note.

pub mod asset;
pub mod cpl;
pub mod dcp;
pub mod notes;
pub mod picture;
pub mod reel;
pub mod sound;
pub mod subtitle;
pub mod transfer;

pub use asset::{Asset, AssetFile, AssetWriter, PackageAsset};
pub use cpl::Cpl;
pub use dcp::{Dcp, ReadOptions, WrittenPackage};
pub use notes::{EqualityOptions, Note, NoteType};
pub use picture::{PictureAsset, PictureKind, Size};
pub use reel::{Essence, MissingEssence, Reel};
pub use sound::SoundAsset;
pub use subtitle::{SubtitleAsset, SubtitleEvent};
pub use transfer::{GammaTransferFunction, ModifiedGammaTransferFunction, TransferFunction};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DcpError {
    #[error("schema error: {0}")]
    Schema(#[from] cinepack_schema::SchemaError),
    #[error("store error: {0}")]
    Store(#[from] cinepack_store::StoreError),
    #[error("essence error: {0}")]
    Essence(#[from] cinepack_mxf::EssenceError),
    #[error("package read error: {0}")]
    Read(String),
    #[error("{message} ({})", path.display())]
    File { message: String, path: PathBuf },
}

impl DcpError {
    pub(crate) fn file(message: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        DcpError::File {
            message: message.into(),
            path: path.into(),
        }
    }
}
