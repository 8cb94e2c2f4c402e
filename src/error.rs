//! Typed errors for the keg pipeline.
//!
//! Every failure a request can hit is a [`KegError`] variant, so the HTTP
//! layer picks a status code from the variant instead of inspecting
//! messages. Parser failures are grouped under [`ParseError`] and carry the
//! row, line, or field that failed.

use thiserror::Error;

use crate::models::NodeId;

#[derive(Error, Debug)]
pub enum KegError {
    #[error("invalid repository reference: {0}")]
    InvalidRepoRef(String),

    #[error("repository does not exist: {owner}/{name}")]
    RepositoryNotFound { owner: String, name: String },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("repository has no commits")]
    RepositoryEmpty,

    #[error("no keg found in repo")]
    NoKegFound,

    #[error("no dex found in keg")]
    NoDexFound,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("no such entry found")]
    EntryNotFound(NodeId),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("keg descriptor is missing required field `{field}`")]
    MissingField { field: &'static str },

    #[error("keg descriptor is not valid YAML: {0}")]
    Yaml(String),

    #[error("invalid timestamp {value:?}: expected layout YYYY-MM-DD HH:MM:SSZ")]
    Timestamp { value: String },

    #[error("not enough tsv parts in dex entry at row {row}: expected 3, found {found}")]
    NotEnoughTsvParts { row: usize, found: usize },

    #[error("invalid node id {value:?} in dex entry at row {row}")]
    InvalidId { row: usize, value: String },

    #[error("invalid timestamp {value:?} in dex entry at row {row}")]
    InvalidTimestamp { row: usize, value: String },

    #[error("unrecognised changelog entry at line {line}")]
    InvalidChangelogLine { line: usize },

    #[error("{path} is not valid UTF-8")]
    NotUtf8 { path: String },
}

pub type Result<T> = std::result::Result<T, KegError>;
