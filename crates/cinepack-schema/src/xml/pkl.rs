use crate::{AssetId, Digest, SchemaError, XmlNode};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PklAsset {
    pub id: AssetId,
    pub annotation_text: Option<String>,
    pub hash: Digest,
    pub size: u64,
    pub asset_type: String,
}

/// Read side of a `<uuid>_pkl.xml` Packing List.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackingList {
    pub id: AssetId,
    pub annotation_text: Option<String>,
    pub issue_date: String,
    pub issuer: String,
    pub creator: String,
    pub assets: Vec<PklAsset>,
}

impl PackingList {
    pub fn parse_file(path: &Path) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_file(path)?)
    }

    pub fn parse_str(input: &str) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_str(input)?)
    }

    fn from_node(root: &XmlNode) -> Result<Self, SchemaError> {
        if root.name != "PackingList" {
            return Err(SchemaError::Malformed(format!(
                "expected PackingList root element, found {}",
                root.name
            )));
        }

        let mut assets = Vec::new();
        for node in root.child("AssetList")?.children_named("Asset") {
            assets.push(PklAsset {
                id: node.id_child("Id")?,
                annotation_text: node.optional_string_child("AnnotationText"),
                hash: Digest::new(node.string_child("Hash")?),
                size: node.number_child("Size")?,
                asset_type: node.string_child("Type")?,
            });
        }

        Ok(PackingList {
            id: root.id_child("Id")?,
            annotation_text: root.optional_string_child("AnnotationText"),
            issue_date: root.optional_string_child("IssueDate").unwrap_or_default(),
            issuer: root.optional_string_child("Issuer").unwrap_or_default(),
            creator: root.optional_string_child("Creator").unwrap_or_default(),
            assets,
        })
    }

    pub fn asset(&self, id: &AssetId) -> Option<&PklAsset> {
        self.assets.iter().find(|a| a.id == *id)
    }
}
