use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of a composition, written as `ContentKind` in a CPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Feature,
    Short,
    Trailer,
    Test,
    Transitional,
    Rating,
    Teaser,
    Policy,
    #[serde(rename = "psa")]
    PublicServiceAnnouncement,
    Advertisement,
}

impl ContentKind {
    pub const ALL: [ContentKind; 10] = [
        ContentKind::Feature,
        ContentKind::Short,
        ContentKind::Trailer,
        ContentKind::Test,
        ContentKind::Transitional,
        ContentKind::Rating,
        ContentKind::Teaser,
        ContentKind::Policy,
        ContentKind::PublicServiceAnnouncement,
        ContentKind::Advertisement,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Feature => "feature",
            ContentKind::Short => "short",
            ContentKind::Trailer => "trailer",
            ContentKind::Test => "test",
            ContentKind::Transitional => "transitional",
            ContentKind::Rating => "rating",
            ContentKind::Teaser => "teaser",
            ContentKind::Policy => "policy",
            ContentKind::PublicServiceAnnouncement => "psa",
            ContentKind::Advertisement => "advertisement",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = SchemaError;

    /// Case-insensitive; some encoders write `Feature` rather than `feature`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        ContentKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| SchemaError::UnknownContentKind(s.to_owned()))
    }
}
