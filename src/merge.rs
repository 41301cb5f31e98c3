//! Merge status resolution.
//!
//! A source branch counts as merged when its tip is an ancestor of the
//! target tip. For merged branches the engine then looks for the event that
//! brought the tip in, in this order:
//!
//! 1. the newest of the last [`MERGE_WINDOW`] merge commits on the target
//!    whose message names the branch and that contain the source tip;
//! 2. the source tip itself, found by searching the target log for its short
//!    hash (at most [`DIRECT_WINDOW`] entries);
//! 3. otherwise the source tip's own metadata (fast-forward or direct push).
//!
//! Steps 2 and 3 rely on ancestry alone and can misattribute squash merges.

use crate::domain::{extract_change_request_id, Commit, MergeResolution};
use crate::error::Result;
use crate::ports::{GitRepo, LogQuery};
use tracing::{debug, warn};

pub const MERGE_WINDOW: usize = 50;
pub const DIRECT_WINDOW: usize = 10;

/// A branch name resolved to a tip commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRef {
    /// `None` for a local branch, else the remote it was found under.
    pub remote: Option<String>,
    pub target: String,
}

/// Local branch first, then each remote in configuration order.
pub fn resolve_branch(repo: &dyn GitRepo, name: &str) -> Result<Option<ResolvedRef>> {
    if let Some(target) = repo.find_local_branch(name)? {
        return Ok(Some(ResolvedRef {
            remote: None,
            target,
        }));
    }
    for remote in repo.remotes()? {
        if let Some(target) = repo.find_remote_branch(&remote.name, name)? {
            return Ok(Some(ResolvedRef {
                remote: Some(remote.name),
                target,
            }));
        }
    }
    Ok(None)
}

/// Decide whether `source` is merged into `target`. Failures are logged and
/// reported as not merged.
pub fn resolve_merge(repo: &dyn GitRepo, source: &str, target: &str) -> MergeResolution {
    match check_merge(repo, source, target) {
        Ok(resolution) => resolution,
        Err(e) => {
            warn!(source, target, error = %e, "merge check failed");
            MergeResolution::not_merged()
        }
    }
}

/// Like [`resolve_merge`] but returns git failures to the caller. Branches
/// that do not resolve are still reported as not merged.
pub fn check_merge(repo: &dyn GitRepo, source: &str, target: &str) -> Result<MergeResolution> {
    let Some(target_ref) = resolve_branch(repo, target)? else {
        debug!(target, "target branch not found");
        return Ok(MergeResolution::not_merged());
    };
    let Some(source_ref) = resolve_branch(repo, source)? else {
        debug!(source, "source branch not found");
        return Ok(MergeResolution::not_merged());
    };

    let source_tip = repo.commit(&source_ref.target)?;
    debug!(source, tip = %source_tip.short_hash, "source tip");

    let base = repo.merge_base(&source_tip.hash, &target_ref.target)?;
    if base.as_deref() != Some(source_tip.hash.as_str()) {
        return Ok(MergeResolution::not_merged());
    }

    if let Some(merge) = find_merge_commit(repo, &source_tip, &target_ref.target, source)? {
        let id = extract_change_request_id(merge.summary());
        return Ok(MergeResolution::via_merge_commit(&merge, id));
    }
    if let Some(direct) = find_direct_commit(repo, &source_tip, &target_ref.target)? {
        return Ok(MergeResolution::via_direct_commit(&direct));
    }
    Ok(MergeResolution::via_ancestry(&source_tip))
}

/// Newest recent merge commit naming `branch` that contains the source tip.
fn find_merge_commit(
    repo: &dyn GitRepo,
    source_tip: &Commit,
    target_tip: &str,
    branch: &str,
) -> Result<Option<Commit>> {
    let candidates = repo.log(target_tip, &LogQuery::merges_mentioning(branch, MERGE_WINDOW))?;
    for candidate in candidates {
        // The grep also matches branches whose names contain this one.
        match repo.is_ancestor(&source_tip.hash, &candidate.hash) {
            Ok(true) => return Ok(Some(candidate)),
            Ok(false) => {}
            Err(e) => debug!(merge = %candidate.short_hash, error = %e, "ancestry check failed"),
        }
    }
    Ok(None)
}

/// The source tip itself, if the target log mentions its short hash.
fn find_direct_commit(
    repo: &dyn GitRepo,
    source_tip: &Commit,
    target_tip: &str,
) -> Result<Option<Commit>> {
    let mentions = repo.log(target_tip, &LogQuery::mentioning(&source_tip.short_hash, DIRECT_WINDOW))?;
    Ok(mentions.into_iter().find(|c| c.hash == source_tip.hash))
}
