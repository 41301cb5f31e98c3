//! Branch listing across local and remote-tracking refs.

use crate::domain::{AuthorInfo, BranchInfo, BranchKind, Commit};
use crate::error::Result;
use crate::merge::resolve_branch;
use crate::ports::GitRepo;
use std::collections::HashSet;
use tracing::debug;

/// Every branch, newest tip first, with a 1-based `index`.
///
/// Each name is listed once: a local branch hides remote-tracking branches
/// of the same name, and among remotes the first in remote order wins, as
/// in [`resolve_branch`]. Entries whose tip commit cannot be read are skipped.
pub fn list_branches(repo: &dyn GitRepo) -> Result<Vec<BranchInfo>> {
    let mut entries: Vec<(Commit, String, BranchKind)> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for branch in repo.local_branches()? {
        seen.insert(branch.name.clone());
        match repo.commit(&branch.target) {
            Ok(commit) => entries.push((commit, branch.name, BranchKind::Local)),
            Err(e) => debug!(branch = %branch.name, error = %e, "skipping unreadable branch"),
        }
    }

    for branch in repo.remote_branches()? {
        if !seen.insert(branch.name.clone()) {
            continue;
        }
        match repo.commit(&branch.target) {
            Ok(commit) => entries.push((commit, branch.name, BranchKind::Remote(branch.remote))),
            Err(e) => debug!(branch = %branch.name, error = %e, "skipping unreadable branch"),
        }
    }

    entries.sort_by(|a, b| b.0.timestamp.cmp(&a.0.timestamp));

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(i, (commit, name, kind))| BranchInfo {
            index: i + 1,
            name,
            kind,
            last_commit: commit.short_hash.clone(),
            last_commit_date: commit.date(),
            commit_message: commit.summary().to_string(),
            author_name: commit.author,
            author_email: commit.email,
        })
        .collect())
}

/// De-duplicated local and remote-tracking branch names, first seen first.
pub fn all_branch_names(repo: &dyn GitRepo) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let local = repo.local_branches()?.into_iter().map(|b| b.name);
    let remote = repo.remote_branches()?.into_iter().map(|b| b.name);
    Ok(local.chain(remote).filter(|name| seen.insert(name.clone())).collect())
}

/// Author of a branch's tip commit, or the "unknown" placeholder.
pub fn branch_author(repo: &dyn GitRepo, branch: &str) -> AuthorInfo {
    let tip = match resolve_branch(repo, branch) {
        Ok(Some(resolved)) => resolved.target,
        Ok(None) => return AuthorInfo::unknown(),
        Err(e) => {
            debug!(branch, error = %e, "author lookup failed");
            return AuthorInfo::unknown();
        }
    };
    match repo.commit(&tip) {
        Ok(commit) => AuthorInfo {
            author_name: commit.author,
            author_email: commit.email,
        },
        Err(e) => {
            debug!(branch, error = %e, "author commit unreadable");
            AuthorInfo::unknown()
        }
    }
}
