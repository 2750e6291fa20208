//! Identifiers, package metadata, and XML document shapes for cinepack.
//!
//! This crate defines the schema layer of a Digital Cinema Package: typed
//! identifiers (`AssetId`, `Digest`), content classification (`ContentKind`),
//! rates and timecodes, the `PackageMetadata` configuration value stamped into
//! written documents, and read-side models of the AssetMap, Packing List and
//! Composition Playlist built on a small owned XML tree (`XmlNode`).

pub mod content;
pub mod fraction;
pub mod metadata;
pub mod timecode;
pub mod types;
pub mod xml;

pub use content::ContentKind;
pub use fraction::Fraction;
pub use metadata::{
    format_issue_date, parse_metadata_file, parse_metadata_str, MetadataError, PackageMetadata,
};
pub use timecode::Timecode;
pub use types::{AssetId, Digest};
pub use xml::asset_map::{AssetMap, AssetMapAsset, Chunk};
pub use xml::cpl::{CplDocument, CplReel, CplReelAsset};
pub use xml::node::{root_element_name, XmlNode};
pub use xml::pkl::{PackingList, PklAsset};
pub use xml::writer::XmlWriter;

use std::path::PathBuf;
use thiserror::Error;

/// Namespace of SMPTE 429-7 Composition Playlists.
pub const CPL_NAMESPACE: &str = "http://www.smpte-ra.org/schemas/429-7/2006/CPL";
/// Namespace of SMPTE 429-8 Packing Lists.
pub const PKL_NAMESPACE: &str = "http://www.smpte-ra.org/schemas/429-8/2007/PKL";
/// Namespace of SMPTE 429-9 Asset Maps and Volume Indexes.
pub const AM_NAMESPACE: &str = "http://www.smpte-ra.org/schemas/429-9/2007/AM";

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML write failed: {0}")]
    Write(#[from] std::io::Error),
    #[error("malformed XML: {0}")]
    Malformed(String),
    #[error("missing node '{child}' in '{parent}'")]
    MissingNode { parent: String, child: String },
    #[error("invalid value for '{field}': '{value}'")]
    InvalidValue { field: String, value: String },
    #[error("unknown content kind: {0}")]
    UnknownContentKind(String),
    #[error("unsupported asset chunk count {count} for asset {id}")]
    UnsupportedChunkCount { id: String, count: usize },
    #[error("asset {0} not found in asset map")]
    AssetNotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_display_missing_node() {
        let e = SchemaError::MissingNode {
            parent: "Reel".to_owned(),
            child: "Id".to_owned(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Reel"));
        assert!(msg.contains("Id"));
    }

    #[test]
    fn schema_error_display_chunk_count() {
        let e = SchemaError::UnsupportedChunkCount {
            id: "abc".to_owned(),
            count: 2,
        };
        let msg = e.to_string();
        assert!(msg.contains("abc"));
        assert!(msg.contains('2'));
    }

    #[test]
    fn schema_error_display_io_names_path() {
        let e = SchemaError::Io {
            path: PathBuf::from("/tmp/ASSETMAP.xml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(e.to_string().contains("/tmp/ASSETMAP.xml"));
    }
}
