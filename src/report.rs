//! Merge report assembly over all branches matching a keyword list.

use crate::branches::{all_branch_names, branch_author};
use crate::domain::{matches_any, sort_rows, AppConfig, ReportRow};
use crate::error::Result;
use crate::merge::check_merge;
use crate::platform::{project_path, resolve_platform, PlatformLinks};
use crate::session::RepoSession;
use tracing::{info, warn};

/// Check every branch whose name contains one of `keywords` against `target`.
///
/// Branches are processed one after another. A branch that fails yields a
/// row carrying the error instead of aborting the report.
pub fn check_merge_status(
    session: &RepoSession,
    config: &AppConfig,
    keywords: &[String],
    target: &str,
) -> Result<Vec<ReportRow>> {
    let repo = session.repo();
    let links = platform_links(session, config);

    let candidates: Vec<String> = all_branch_names(repo)?
        .into_iter()
        .filter(|name| matches_any(name, keywords))
        .collect();
    info!(candidates = candidates.len(), target, "checking merge status");

    let mut rows: Vec<ReportRow> = candidates
        .iter()
        .map(|branch| match build_row(session, &links, branch, target) {
            Ok(row) => row,
            Err(e) => {
                warn!(branch = %branch, error = %e, "merge check failed");
                ReportRow::failed(branch, e)
            }
        })
        .collect();

    sort_rows(&mut rows);
    Ok(rows)
}

fn build_row(
    session: &RepoSession,
    links: &PlatformLinks,
    branch: &str,
    target: &str,
) -> Result<ReportRow> {
    let repo = session.repo();
    let resolution = check_merge(repo, branch, target)?;
    let author = branch_author(repo, branch);

    let merge_request_url = resolution
        .change_request_id
        .as_deref()
        .and_then(|id| links.merge_request_url(id));
    let commit_url = resolution
        .commit_hash
        .as_deref()
        .and_then(|hash| links.commit_url(hash));

    Ok(ReportRow {
        branch_name: branch.to_string(),
        resolution,
        author_name: Some(author.author_name),
        author_email: Some(author.author_email),
        gitlab_url: Some(links.profile.base_url.clone()),
        project_path: Some(links.project_path.clone()),
        platform_config: Some(links.profile.clone()),
        merge_request_url,
        commit_url,
        error: None,
    })
}

/// Platform profile and project path for the session's repository.
pub fn platform_links(session: &RepoSession, config: &AppConfig) -> PlatformLinks {
    let profile = resolve_platform(config, &session.input);
    let urls: Vec<String> = match session.repo().remotes() {
        Ok(remotes) => remotes.into_iter().filter_map(|r| r.url).collect(),
        Err(e) => {
            warn!(error = %e, "could not list remotes");
            Vec::new()
        }
    };
    let path = project_path(&profile, urls.iter().map(String::as_str));
    PlatformLinks::new(profile, path)
}
