//! Dex (entry index) parsing.
//!
//! A keg lists its entries in a dex. Two on-disk formats are supported,
//! tried in the order of [`DexFormat::ALL`]:
//!
//! | Format | File | Row shape |
//! |--------|------|-----------|
//! | [`DexFormat::Tsv`] | `dex/nodes.tsv` | `id<TAB>YYYY-MM-DD HH:MM:SSZ<TAB>title` |
//! | [`DexFormat::Changelog`] | `dex/changes.md` | `* YYYY-MM-DD HH:MM:SSZ [title](../id)` |
//!
//! The TSV table is the primary format; the changelog list is the legacy
//! layout older kegs still carry. Callers go through [`load_dex`] (or
//! [`DexFormat::parse`]) and never pick a format themselves.
//!
//! Any malformed row fails the whole parse. When two rows share an id the
//! later one replaces the earlier one.

use serde::Serialize;

use crate::error::{KegError, ParseError, Result};
use crate::locate::keg_path;
use crate::models::{KegTimestamp, Node, NodeId, NodeMap};
use crate::snapshot::Snapshot;

/// On-disk dex formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DexFormat {
    Tsv,
    Changelog,
}

impl DexFormat {
    /// Every supported format, in lookup priority order.
    pub const ALL: [DexFormat; 2] = [DexFormat::Tsv, DexFormat::Changelog];

    /// Keg-relative path of the file holding this format.
    pub fn file_name(self) -> &'static str {
        match self {
            DexFormat::Tsv => "dex/nodes.tsv",
            DexFormat::Changelog => "dex/changes.md",
        }
    }

    pub fn parse(self, contents: &str) -> std::result::Result<NodeMap, ParseError> {
        match self {
            DexFormat::Tsv => parse_dex(&read_tsv(contents)),
            DexFormat::Changelog => parse_changelog(contents),
        }
    }
}

/// Entry index of one commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dex {
    pub commit: String,
    pub format: DexFormat,
    pub nodes: NodeMap,
}

impl Dex {
    pub fn lookup(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Reads the dex of the keg rooted at `base`.
///
/// Uses the first format whose file exists. [`KegError::NoDexFound`] if
/// none does.
pub async fn load_dex(snapshot: &dyn Snapshot, base: &str) -> Result<Dex> {
    for format in DexFormat::ALL {
        let path = keg_path(base, format.file_name());
        let Some(contents) = snapshot.read_file(&path).await? else {
            continue;
        };

        let nodes = format.parse(&contents)?;
        tracing::debug!(path = %path, ?format, nodes = nodes.len(), "parsed dex");

        return Ok(Dex {
            commit: snapshot.commit().to_string(),
            format,
            nodes,
        });
    }

    Err(KegError::NoDexFound)
}

/// Builds the node map from tokenized TSV rows.
///
/// Row numbers in errors are 1-based.
pub fn parse_dex(rows: &[Vec<String>]) -> std::result::Result<NodeMap, ParseError> {
    let mut nodes = NodeMap::new();

    for (i, fields) in rows.iter().enumerate() {
        let row = i + 1;
        let [id, timestamp, title] = fields.as_slice() else {
            return Err(ParseError::NotEnoughTsvParts {
                row,
                found: fields.len(),
            });
        };

        let id: NodeId = id.parse().map_err(|_| ParseError::InvalidId {
            row,
            value: id.clone(),
        })?;
        let timestamp = KegTimestamp::parse(timestamp).map_err(|_| ParseError::InvalidTimestamp {
            row,
            value: timestamp.clone(),
        })?;

        nodes.insert(
            id,
            Node {
                id,
                timestamp,
                title: title.clone(),
            },
        );
    }

    Ok(nodes)
}

/// Splits tab-separated text into rows of fields.
///
/// Quoting is lazy, since dex files are written by hand:
/// - a `"` inside an unquoted field is kept as-is;
/// - a field starting with `"` runs to the next `"` followed by a tab or
///   line end, may span tabs and newlines, and reads `""` as `"`;
/// - any other `"` inside a quoted field is kept as-is;
/// - an unterminated quoted field runs to the end of the input.
///
/// Empty lines are skipped and `\r\n` is read as `\n`.
pub fn read_tsv(input: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut chars = input.chars().peekable();
    let mut at_field_start = true;

    while let Some(c) = chars.next() {
        match c {
            '"' if at_field_start => {
                at_field_start = false;
                while let Some(q) = chars.next() {
                    if q != '"' {
                        field.push(q);
                        continue;
                    }
                    match chars.peek() {
                        Some('"') => {
                            chars.next();
                            field.push('"');
                        }
                        Some('\t') | Some('\n') | Some('\r') | None => break,
                        Some(_) => field.push('"'),
                    }
                }
            }
            '\t' => {
                row.push(std::mem::take(&mut field));
                at_field_start = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                end_line(&mut rows, &mut row, &mut field, at_field_start);
                at_field_start = true;
            }
            other => {
                at_field_start = false;
                field.push(other);
            }
        }
    }
    end_line(&mut rows, &mut row, &mut field, at_field_start);

    rows
}

fn end_line(
    rows: &mut Vec<Vec<String>>,
    row: &mut Vec<String>,
    field: &mut String,
    at_field_start: bool,
) {
    // A line with no separators and no content is blank.
    if row.is_empty() && field.is_empty() && at_field_start {
        return;
    }
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
}

/// Parses the legacy `dex/changes.md` list.
///
/// Line numbers in errors are 1-based; blank lines are skipped.
pub fn parse_changelog(input: &str) -> std::result::Result<NodeMap, ParseError> {
    let mut nodes = NodeMap::new();

    for (i, line) in input.lines().enumerate() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let node =
            parse_changelog_line(line).ok_or(ParseError::InvalidChangelogLine { line: i + 1 })?;
        nodes.insert(node.id, node);
    }

    Ok(nodes)
}

fn parse_changelog_line(line: &str) -> Option<Node> {
    let rest = line.strip_prefix("* ")?;
    let timestamp = KegTimestamp::parse(rest.get(..20)?).ok()?;
    let link = rest.get(20..)?.strip_prefix(" [")?.strip_suffix(')')?;

    // Titles may contain brackets; the link target follows the last `](`.
    let (title, target) = link.rsplit_once("](")?;
    let target = target.trim_end_matches('/');
    let id = target
        .strip_prefix("../")
        .or_else(|| target.strip_prefix('/'))
        .unwrap_or(target);
    let id: NodeId = id.parse().ok()?;

    Some(Node {
        id,
        timestamp,
        title: title.to_string(),
    })
}
