//! The `keg` descriptor file.
//!
//! A keg's root marker is also its metadata: a YAML document with a title,
//! an `updated` timestamp in the keg layout, and a handful of optional
//! fields. Unknown keys are ignored.
//!
//! ```yaml
//! title: Example Keg
//! updated: 2023-01-01 00:00:00Z
//! kegv: 2023-01
//! creator: https://github.com/example
//! urls:
//!   - https://example.com
//! indexes:
//!   - file: dex/nodes.tsv
//!     summary: all nodes by id
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::models::KegTimestamp;

/// An index file listed by the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KegIndex {
    pub file: String,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Parsed `keg` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KegDescriptor {
    pub title: String,
    pub kegv: Option<String>,
    pub creator: Option<String>,
    pub state: Option<String>,
    pub updated: KegTimestamp,
    pub summary: Option<String>,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default)]
    pub indexes: Vec<KegIndex>,
}

/// Lenient mirror of [`KegDescriptor`] so required fields can be reported
/// by name instead of as a serde message.
#[derive(Deserialize)]
struct RawDescriptor {
    title: Option<String>,
    kegv: Option<String>,
    creator: Option<String>,
    state: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    urls: Option<Vec<String>>,
    indexes: Option<Vec<KegIndex>>,
}

/// Parses the contents of a `keg` file.
pub fn parse_descriptor(contents: &str) -> Result<KegDescriptor, ParseError> {
    let raw: RawDescriptor =
        serde_yaml_ng::from_str(contents).map_err(|e| ParseError::Yaml(e.to_string()))?;

    let title = raw.title.ok_or(ParseError::MissingField { field: "title" })?;
    let updated = raw
        .updated
        .ok_or(ParseError::MissingField { field: "updated" })?;
    let updated = KegTimestamp::parse(&updated)?;

    Ok(KegDescriptor {
        title,
        kegv: raw.kegv,
        creator: raw.creator,
        state: raw.state,
        updated,
        summary: raw.summary,
        urls: raw.urls.unwrap_or_default(),
        indexes: raw.indexes.unwrap_or_default(),
    })
}

impl KegDescriptor {
    /// Re-serializes the descriptor as a `keg` YAML document.
    pub fn to_yaml(&self) -> Result<String, ParseError> {
        serde_yaml_ng::to_string(self).map_err(|e| ParseError::Yaml(e.to_string()))
    }
}
