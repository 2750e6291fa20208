use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse metadata: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("metadata field '{0}' must not be empty")]
    EmptyField(&'static str),
}

/// Issuer, creator, and issue date stamped into every written document.
///
/// Passed explicitly to each write so that one process can produce packages
/// with different issuers.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PackageMetadata {
    #[serde(default = "default_creator")]
    pub issuer: String,
    #[serde(default = "default_creator")]
    pub creator: String,
    #[serde(default = "default_issue_date")]
    pub issue_date: String,
    #[serde(default = "default_company_name")]
    pub company_name: String,
    #[serde(default = "default_product_name")]
    pub product_name: String,
    #[serde(default = "default_product_version")]
    pub product_version: String,
}

impl Default for PackageMetadata {
    fn default() -> Self {
        Self {
            issuer: default_creator(),
            creator: default_creator(),
            issue_date: default_issue_date(),
            company_name: default_company_name(),
            product_name: default_product_name(),
            product_version: default_product_version(),
        }
    }
}

impl PackageMetadata {
    #[must_use]
    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.issuer = issuer.to_owned();
        self
    }

    #[must_use]
    pub fn with_creator(mut self, creator: &str) -> Self {
        self.creator = creator.to_owned();
        self
    }

    #[must_use]
    pub fn with_issue_date(mut self, issue_date: &str) -> Self {
        self.issue_date = issue_date.to_owned();
        self
    }

    pub fn validate(&self) -> Result<(), MetadataError> {
        if self.issuer.trim().is_empty() {
            return Err(MetadataError::EmptyField("issuer"));
        }
        if self.creator.trim().is_empty() {
            return Err(MetadataError::EmptyField("creator"));
        }
        if self.issue_date.trim().is_empty() {
            return Err(MetadataError::EmptyField("issue_date"));
        }
        Ok(())
    }
}

/// Current UTC time in the form used by `IssueDate` elements.
pub fn format_issue_date(now: chrono::DateTime<chrono::Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S+00:00").to_string()
}

fn default_creator() -> String {
    format!("cinepack {}", env!("CARGO_PKG_VERSION"))
}

fn default_issue_date() -> String {
    format_issue_date(chrono::Utc::now())
}

fn default_company_name() -> String {
    "cinepack".to_owned()
}

fn default_product_name() -> String {
    "cinepack".to_owned()
}

fn default_product_version() -> String {
    env!("CARGO_PKG_VERSION").to_owned()
}

pub fn parse_metadata_str(input: &str) -> Result<PackageMetadata, MetadataError> {
    let metadata: PackageMetadata = toml::from_str(input)?;
    metadata.validate()?;
    Ok(metadata)
}

pub fn parse_metadata_file(path: impl AsRef<Path>) -> Result<PackageMetadata, MetadataError> {
    let content = fs::read_to_string(path)?;
    parse_metadata_str(&content)
}
