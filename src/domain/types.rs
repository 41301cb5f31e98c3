//! Pure data types for the merge report domain.
//! No I/O; serde derives describe the JSON the HTTP layer exchanges.

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize, Serializer};
use indexmap::IndexMap;
use std::fmt;

/// Display format used for every timestamp in the report.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder for author data that could not be read.
pub const UNKNOWN: &str = "unknown";

/// First 8 hex chars of a commit id.
pub fn short_hash(hash: &str) -> String {
    hash.chars().take(8).collect()
}

/// Render epoch seconds as `YYYY-MM-DD HH:MM:SS` in local time.
pub fn format_timestamp(seconds: i64) -> String {
    match Local.timestamp_opt(seconds, 0).single() {
        Some(dt) => dt.format(DATE_FORMAT).to_string(),
        None => seconds.to_string(),
    }
}

/// A git commit with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub timestamp: i64,
}

impl Commit {
    /// First line of the message, surrounding whitespace trimmed.
    pub fn summary(&self) -> &str {
        let trimmed = self.message.trim();
        trimmed.lines().next().unwrap_or(trimmed).trim()
    }

    pub fn date(&self) -> String {
        format_timestamp(self.timestamp)
    }
}

/// Where a listed branch lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchKind {
    Local,
    Remote(String),
}

impl fmt::Display for BranchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BranchKind::Local => write!(f, "local"),
            BranchKind::Remote(remote) => write!(f, "remote ({})", remote),
        }
    }
}

impl Serialize for BranchKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of the branch listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchInfo {
    pub index: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: BranchKind,
    pub last_commit: String,
    pub last_commit_date: String,
    pub author_name: String,
    pub author_email: String,
    pub commit_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorInfo {
    pub author_name: String,
    pub author_email: String,
}

impl AuthorInfo {
    pub fn unknown() -> Self {
        Self {
            author_name: UNKNOWN.to_string(),
            author_email: UNKNOWN.to_string(),
        }
    }
}

/// Outcome of checking one source branch against a target.
///
/// When `is_merged` is false every other field is `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeResolution {
    pub is_merged: bool,
    pub merge_date: Option<String>,
    #[serde(rename = "merge_commit")]
    pub merge_commit_display: Option<String>,
    pub merge_author: Option<String>,
    pub change_request_id: Option<String>,
    pub commit_hash: Option<String>,
}

impl MergeResolution {
    pub fn not_merged() -> Self {
        Self::default()
    }

    /// Merged through a merge commit, optionally tagged with a change request.
    pub fn via_merge_commit(merge: &Commit, change_request_id: Option<String>) -> Self {
        let display = match &change_request_id {
            Some(id) => format!("{} ({})", id, merge.short_hash),
            None => format!("{} (merge commit)", merge.short_hash),
        };
        Self {
            is_merged: true,
            merge_date: Some(merge.date()),
            merge_commit_display: Some(display),
            merge_author: Some(merge.author.clone()),
            change_request_id,
            commit_hash: Some(merge.short_hash.clone()),
        }
    }

    /// The source tip itself was found in the target's history.
    pub fn via_direct_commit(commit: &Commit) -> Self {
        Self::without_merge_commit(commit, "direct commit")
    }

    /// Reachable by ancestry only; no specific merge event was found.
    pub fn via_ancestry(source_tip: &Commit) -> Self {
        Self::without_merge_commit(source_tip, "direct merge")
    }

    fn without_merge_commit(commit: &Commit, marker: &str) -> Self {
        Self {
            is_merged: true,
            merge_date: Some(commit.date()),
            merge_commit_display: Some(format!("{} ({})", commit.short_hash, marker)),
            merge_author: Some(commit.author.clone()),
            change_request_id: None,
            commit_hash: Some(commit.short_hash.clone()),
        }
    }
}

/// Hosting platform description used to build UI links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub name: String,
    pub base_url: String,
    pub merge_request_path: String,
    pub commit_path: String,
    #[serde(default)]
    pub ssh_prefix: String,
    #[serde(default)]
    pub https_prefix: String,
}

/// A saved repository entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub platform: String,
}

/// The persisted configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub repositories: Vec<RepositoryConfig>,
    #[serde(default)]
    /// Scanned in file order when matching repository URLs.
    pub platforms: IndexMap<String, PlatformProfile>,
}
