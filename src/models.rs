//! Core data models shared by the keg pipeline.
//!
//! These types describe where a keg comes from ([`RepoRef`]) and what its
//! index is made of ([`Node`]), along with the fixed timestamp layout used
//! by every keg file ([`KegTimestamp`]).

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{KegError, ParseError, Result};

/// `chrono` rendition of the keg timestamp layout, `2006-01-02 15:04:05Z`.
///
/// The trailing `Z` is a literal character, not an offset.
pub const KEG_TIMESTAMP_LAYOUT: &str = "%Y-%m-%d %H:%M:%SZ";

/// A timestamp in the keg layout `YYYY-MM-DD HH:MM:SSZ`.
///
/// Serializes (YAML and JSON alike) as that exact string, so a parsed value
/// re-emits the text it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KegTimestamp(DateTime<Utc>);

impl KegTimestamp {
    /// Parses `value`, which must match the layout byte for byte.
    pub fn parse(value: &str) -> std::result::Result<Self, ParseError> {
        let invalid = || ParseError::Timestamp {
            value: value.to_string(),
        };

        if !has_layout_shape(value) {
            return Err(invalid());
        }

        NaiveDateTime::parse_from_str(value, KEG_TIMESTAMP_LAYOUT)
            .map(|naive| Self(naive.and_utc()))
            .map_err(|_| invalid())
    }

    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

// chrono accepts unpadded fields and trailing offsets in some positions;
// the keg layout is fixed width. `%S` also admits a leap second (`60`),
// which the layout does not.
fn has_layout_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 20
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            10 => *b == b' ',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        })
        && bytes[17] <= b'5'
}

impl From<DateTime<Utc>> for KegTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt.trunc_subsecs(0))
    }
}

impl FromStr for KegTimestamp {
    type Err = ParseError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KegTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(KEG_TIMESTAMP_LAYOUT))
    }
}

impl Serialize for KegTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for KegTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Identifier of one keg entry.
///
/// Any integer a dex row carries is accepted, sign included.
pub type NodeId = i64;

/// One entry of a dex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub timestamp: KegTimestamp,
    pub title: String,
}

/// Dex entries keyed by id.
pub type NodeMap = BTreeMap<NodeId, Node>;

/// A remote repository (`owner/name`) and the branch to read, if not the
/// default one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    owner: String,
    name: String,
    branch: Option<String>,
}

impl RepoRef {
    /// Builds a reference after checking both parts are plain GitHub names.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let owner = owner.into();
        let name = name.into();
        validate_segment("owner", &owner)?;
        validate_segment("repository", &name)?;
        Ok(Self {
            owner,
            name,
            branch: None,
        })
    }

    /// Parses an `owner/name` slug.
    pub fn parse(slug: &str) -> Result<Self> {
        let (owner, name) = slug.split_once('/').ok_or_else(|| {
            KegError::InvalidRepoRef(format!("expected owner/repo, got {:?}", slug))
        })?;
        Self::new(owner, name)
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Result<Self> {
        let branch = branch.into();
        if branch.is_empty() || branch.starts_with('-') || branch.chars().any(char::is_whitespace)
        {
            return Err(KegError::InvalidRepoRef(format!(
                "invalid branch name {:?}",
                branch
            )));
        }
        self.branch = Some(branch);
        Ok(self)
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn branch(&self) -> Option<&str> {
        self.branch.as_deref()
    }

    /// Clone URL under a hosting base such as `https://github.com`.
    pub fn clone_url(&self, base: &str) -> String {
        format!(
            "{}/{}/{}.git",
            base.trim_end_matches('/'),
            self.owner,
            self.name
        )
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_segment(what: &str, value: &str) -> Result<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(KegError::InvalidRepoRef(format!(
            "invalid {} name {:?}",
            what, value
        )))
    }
}
