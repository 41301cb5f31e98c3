//! Pure report logic: keyword filtering and result ordering.
//! No I/O - all functions are data in, data out.

use super::types::{MergeResolution, PlatformProfile, DATE_FORMAT};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::cmp::Reverse;

/// One branch's line in the merge report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub branch_name: String,
    #[serde(flatten)]
    pub resolution: MergeResolution,
    pub author_name: Option<String>,
    pub author_email: Option<String>,
    pub gitlab_url: Option<String>,
    pub project_path: Option<String>,
    pub platform_config: Option<PlatformProfile>,
    pub merge_request_url: Option<String>,
    pub commit_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReportRow {
    /// Row for a branch whose check failed; reported as not merged.
    pub fn failed(branch_name: &str, error: impl ToString) -> Self {
        Self {
            branch_name: branch_name.to_string(),
            resolution: MergeResolution::not_merged(),
            author_name: None,
            author_email: None,
            gitlab_url: None,
            project_path: None,
            platform_config: None,
            merge_request_url: None,
            commit_url: None,
            error: Some(error.to_string()),
        }
    }
}

/// Split a comma-separated keyword string, trimming each entry.
pub fn parse_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
        .collect()
}

/// Case-sensitive substring match against any keyword.
pub fn matches_any(branch: &str, keywords: &[String]) -> bool {
    keywords.iter().any(|k| branch.contains(k.as_str()))
}

/// Merged rows first, newest merge date first; rows whose date does not
/// parse trail the merged group. Not-merged rows keep their relative order.
pub fn sort_rows(rows: &mut [ReportRow]) {
    rows.sort_by_key(|row| Reverse(sort_key(row)));
}

fn sort_key(row: &ReportRow) -> (bool, Option<NaiveDateTime>) {
    if !row.resolution.is_merged {
        return (false, None);
    }
    let date = row
        .resolution
        .merge_date
        .as_deref()
        .and_then(|d| NaiveDateTime::parse_from_str(d, DATE_FORMAT).ok());
    (true, date)
}
