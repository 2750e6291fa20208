use crate::{AssetId, ContentKind, Fraction, SchemaError, XmlNode};
use std::path::Path;

/// An asset reference inside a reel's `AssetList`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CplReelAsset {
    pub id: AssetId,
    pub annotation_text: Option<String>,
    pub edit_rate: Fraction,
    pub intrinsic_duration: i64,
    pub entry_point: i64,
    pub duration: i64,
    /// Only picture assets carry a frame rate, and not always.
    pub frame_rate: Option<Fraction>,
}

impl CplReelAsset {
    fn from_node(node: &XmlNode) -> Result<Self, SchemaError> {
        let intrinsic_duration: i64 = node.number_child("IntrinsicDuration")?;
        let entry_point: i64 = node.optional_number_child("EntryPoint")?.unwrap_or(0);
        let duration = match node.optional_number_child("Duration")? {
            Some(duration) => duration,
            None => intrinsic_duration.checked_sub(entry_point).ok_or_else(|| {
                SchemaError::InvalidValue {
                    field: "EntryPoint".to_owned(),
                    value: format!("{entry_point} against IntrinsicDuration {intrinsic_duration}"),
                }
            })?,
        };
        Ok(CplReelAsset {
            id: node.id_child("Id")?,
            annotation_text: node.optional_string_child("AnnotationText"),
            edit_rate: node.fraction_child("EditRate")?,
            intrinsic_duration,
            entry_point,
            duration,
            frame_rate: node.optional_fraction_child("FrameRate")?,
        })
    }

    /// The stated frame rate, or the edit rate when none is given.
    pub fn effective_frame_rate(&self) -> Fraction {
        self.frame_rate.unwrap_or(self.edit_rate)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CplReel {
    pub id: AssetId,
    pub main_picture: Option<CplReelAsset>,
    pub main_stereoscopic_picture: Option<CplReelAsset>,
    pub main_sound: Option<CplReelAsset>,
    pub main_subtitle: Option<CplReelAsset>,
}

impl CplReel {
    fn from_node(node: &XmlNode) -> Result<Self, SchemaError> {
        let list = node.child("AssetList")?;
        let slot = |name: &str| {
            list.optional_child(name)
                .map(CplReelAsset::from_node)
                .transpose()
        };
        Ok(CplReel {
            id: node.id_child("Id")?,
            main_picture: slot("MainPicture")?,
            main_stereoscopic_picture: slot("MainStereoscopicPicture")?,
            main_sound: slot("MainSound")?,
            main_subtitle: slot("MainSubtitle")?,
        })
    }

    /// The picture reference of this reel, preferring an explicit
    /// stereoscopic element over a mono one.
    pub fn picture(&self) -> Result<&CplReelAsset, SchemaError> {
        self.main_stereoscopic_picture
            .as_ref()
            .or(self.main_picture.as_ref())
            .ok_or_else(|| SchemaError::MissingNode {
                parent: format!("Reel {}", self.id),
                child: "MainPicture".to_owned(),
            })
    }
}

/// Read side of a `<uuid>_cpl.xml` Composition Playlist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CplDocument {
    pub id: AssetId,
    pub annotation_text: String,
    pub content_title_text: String,
    pub content_kind: ContentKind,
    pub reels: Vec<CplReel>,
}

impl CplDocument {
    pub fn parse_file(path: &Path) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_file(path)?)
    }

    pub fn parse_str(input: &str) -> Result<Self, SchemaError> {
        Self::from_node(&XmlNode::parse_str(input)?)
    }

    fn from_node(root: &XmlNode) -> Result<Self, SchemaError> {
        if root.name != "CompositionPlaylist" {
            return Err(SchemaError::Malformed(format!(
                "expected CompositionPlaylist root element, found {}",
                root.name
            )));
        }

        let reels = root
            .child("ReelList")?
            .children_named("Reel")
            .map(CplReel::from_node)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CplDocument {
            id: root.id_child("Id")?,
            annotation_text: root.optional_string_child("AnnotationText").unwrap_or_default(),
            content_title_text: root.string_child("ContentTitleText")?,
            content_kind: root.string_child("ContentKind")?.parse()?,
            reels,
        })
    }
}
