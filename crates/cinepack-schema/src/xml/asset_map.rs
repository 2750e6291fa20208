use crate::{AssetId, SchemaError, XmlNode};
use std::path::{Path, PathBuf};

/// One file (or part of a file) backing an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub path: PathBuf,
    pub volume_index: u32,
    pub offset: u64,
    pub length: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMapAsset {
    pub id: AssetId,
    pub packing_list: bool,
    pub chunks: Vec<Chunk>,
}

impl AssetMapAsset {
    /// The single chunk of this asset. Parsing guarantees there is exactly one.
    pub fn chunk(&self) -> Result<&Chunk, SchemaError> {
        match self.chunks.as_slice() {
            [only] => Ok(only),
            other => Err(SchemaError::UnsupportedChunkCount {
                id: self.id.to_string(),
                count: other.len(),
            }),
        }
    }
}

/// Read side of `ASSETMAP` / `ASSETMAP.xml`: asset id to file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMap {
    pub id: AssetId,
    pub assets: Vec<AssetMapAsset>,
}

impl AssetMap {
    pub fn parse_file(path: &Path) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_file(path)?)
    }

    pub fn parse_str(input: &str) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_str(input)?)
    }

    fn from_node(root: &XmlNode) -> Result<Self, SchemaError> {
        if root.name != "AssetMap" {
            return Err(SchemaError::Malformed(format!(
                "expected AssetMap root element, found {}",
                root.name
            )));
        }

        let mut assets = Vec::new();
        for node in root.child("AssetList")?.children_named("Asset") {
            let id = node.id_child("Id")?;
            let mut chunks = Vec::new();
            for chunk in node.child("ChunkList")?.children_named("Chunk") {
                chunks.push(Chunk {
                    path: PathBuf::from(chunk.string_child("Path")?),
                    volume_index: chunk.optional_number_child("VolumeIndex")?.unwrap_or(1),
                    offset: chunk.optional_number_child("Offset")?.unwrap_or(0),
                    length: chunk.optional_number_child("Length")?,
                });
            }
            // Multi-chunk and multi-volume assets are not supported.
            if chunks.len() != 1 {
                return Err(SchemaError::UnsupportedChunkCount {
                    id: id.to_string(),
                    count: chunks.len(),
                });
            }
            assets.push(AssetMapAsset {
                id,
                packing_list: node.bool_child("PackingList"),
                chunks,
            });
        }

        Ok(AssetMap {
            id: root.id_child("Id")?,
            assets,
        })
    }

    pub fn asset_from_id(&self, id: &AssetId) -> Result<&AssetMapAsset, SchemaError> {
        self.assets
            .iter()
            .find(|a| a.id == *id)
            .ok_or_else(|| SchemaError::AssetNotFound(id.to_string()))
    }

    /// Path of the file backing `id`, as written in the asset map.
    pub fn path_of(&self, id: &AssetId) -> Result<&Path, SchemaError> {
        Ok(self.asset_from_id(id)?.chunk()?.path.as_path())
    }
}
