//! Repository fixtures for tests. Builds real histories with git2 in a temp dir.

use crate::adapters::Git2Repo;
use crate::domain::{short_hash, Commit};
use crate::error::{Error, Result};
use crate::ports::{GitClient, GitRepo, LocalBranch, LogQuery, Remote, RemoteBranch};
use crate::session::{RepoConnector, RepoSession};
use git2::{Oid, Repository, RepositoryInitOptions, Signature, Time};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;
use tempfile::TempDir;

pub const BASE_TIME: i64 = 1_700_000_000;

pub fn has_git() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// Opens through libgit2 only; never clones.
pub struct LibGit2Client;

impl GitClient for LibGit2Client {
    fn open(&self, path: &Path) -> Result<Box<dyn GitRepo>> {
        Ok(Box::new(Git2Repo::open(path, PathBuf::from("git"))?))
    }

    fn clone_repo(&self, url: &str, _dest: &Path) -> Result<Box<dyn GitRepo>> {
        Err(Error::InvalidInput(format!("clone not available in tests: {}", url)))
    }
}

/// Session over a fixture opened as a local repository.
pub fn local_session(fixture: &TestRepo) -> RepoSession {
    let connector = RepoConnector::new(Arc::new(LibGit2Client), fixture.path().join(".unused"));
    connector.connect(&fixture.path().to_string_lossy()).unwrap()
}

pub struct TestRepo {
    pub dir: TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// A non-bare repository with one commit on `main`.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(dir.path(), &opts).unwrap();
        let fixture = Self { dir, repo };
        fixture.write_commit(Some("refs/heads/main"), &[], "initial", BASE_TIME);
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn head(&self, branch: &str) -> Oid {
        self.repo
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap()
            .target()
            .unwrap()
    }

    pub fn branch(&self, name: &str, at: Oid) {
        self.repo
            .reference(&format!("refs/heads/{}", name), at, true, "test branch")
            .unwrap();
    }

    /// Commit on top of `branch` and advance it.
    pub fn commit(&self, branch: &str, message: &str, time: i64) -> Oid {
        let parent = self.head(branch);
        self.write_commit(Some(&format!("refs/heads/{}", branch)), &[parent], message, time)
    }

    /// Commit with explicit author name.
    pub fn commit_by(&self, branch: &str, author: &str, message: &str, time: i64) -> Oid {
        let parent = self.head(branch);
        self.write(Some(&format!("refs/heads/{}", branch)), &[parent], author, message, time)
    }

    /// Two-parent merge of `from` into `into`, advancing `into`.
    pub fn merge(&self, into: &str, from: &str, message: &str, time: i64) -> Oid {
        let parents = [self.head(into), self.head(from)];
        self.write_commit(Some(&format!("refs/heads/{}", into)), &parents, message, time)
    }

    pub fn add_remote(&self, name: &str, url: &str) {
        self.repo.remote(name, url).unwrap();
    }

    pub fn remote_branch(&self, remote: &str, name: &str, at: Oid) {
        self.repo
            .reference(&format!("refs/remotes/{}/{}", remote, name), at, true, "test remote")
            .unwrap();
    }

    pub fn remote_head(&self, remote: &str, branch: &str) {
        self.repo
            .reference_symbolic(
                &format!("refs/remotes/{}/HEAD", remote),
                &format!("refs/remotes/{}/{}", remote, branch),
                true,
                "test remote head",
            )
            .unwrap();
    }

    fn write_commit(&self, update_ref: Option<&str>, parents: &[Oid], message: &str, time: i64) -> Oid {
        self.write(update_ref, parents, "Test Author", message, time)
    }

    fn write(
        &self,
        update_ref: Option<&str>,
        parents: &[Oid],
        author: &str,
        message: &str,
        time: i64,
    ) -> Oid {
        let blob = self.repo.blob(message.as_bytes()).unwrap();
        let mut builder = self.repo.treebuilder(None).unwrap();
        builder.insert("NOTES", blob, 0o100644).unwrap();
        let tree = self.repo.find_tree(builder.write().unwrap()).unwrap();

        let sig = Signature::new(author, "author@example.com", &Time::new(time, 0)).unwrap();
        let parents: Vec<_> = parents
            .iter()
            .map(|oid| self.repo.find_commit(*oid).unwrap())
            .collect();
        let parent_refs: Vec<_> = parents.iter().collect();
        self.repo
            .commit(update_ref, &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
    }
}

/// Full id for scripted commit `n`; the short hash is `n` in hex.
pub fn fake_hash(n: u32) -> String {
    format!("{:08x}", n).repeat(5)
}

/// In-memory repository with one scripted target history. Ancestry and
/// merge bases are answered from explicit tables, never computed.
pub struct FakeGitRepo {
    workdir: PathBuf,
    branches: HashMap<String, String>,
    commits: HashMap<String, Commit>,
    merges: HashSet<String>,
    /// Log of every walk, newest first, regardless of the tip asked for.
    history: Vec<String>,
    merge_bases: HashMap<(String, String), String>,
    ancestry: HashSet<(String, String)>,
    ancestry_failures: HashSet<String>,
}

impl FakeGitRepo {
    pub fn new() -> Self {
        Self {
            workdir: PathBuf::from("/fake"),
            branches: HashMap::new(),
            commits: HashMap::new(),
            merges: HashSet::new(),
            history: Vec::new(),
            merge_bases: HashMap::new(),
            ancestry: HashSet::new(),
            ancestry_failures: HashSet::new(),
        }
    }

    /// Register commit `n` at `BASE_TIME + n` without placing it in history.
    pub fn add_commit(&mut self, n: u32, message: &str) -> String {
        let hash = fake_hash(n);
        self.commits.insert(
            hash.clone(),
            Commit {
                short_hash: short_hash(&hash),
                hash: hash.clone(),
                message: message.to_string(),
                author: "Fake Author".to_string(),
                email: "fake@example.com".to_string(),
                timestamp: BASE_TIME + i64::from(n),
            },
        );
        hash
    }

    pub fn add_merge(&mut self, n: u32, message: &str) -> String {
        let hash = self.add_commit(n, message);
        self.merges.insert(hash.clone());
        hash
    }

    /// Append to the target history; call newest first.
    pub fn push_history(&mut self, hash: &str) {
        self.history.push(hash.to_string());
    }

    pub fn set_branch(&mut self, name: &str, hash: &str) {
        self.branches.insert(name.to_string(), hash.to_string());
    }

    pub fn merge_base_of(&mut self, a: &str, b: &str, base: &str) {
        self.merge_bases
            .insert((a.to_string(), b.to_string()), base.to_string());
    }

    pub fn contains(&mut self, descendant: &str, ancestor: &str) {
        self.ancestry
            .insert((ancestor.to_string(), descendant.to_string()));
    }

    /// Ancestry checks against `descendant` fail with a command error.
    pub fn fail_ancestry(&mut self, descendant: &str) {
        self.ancestry_failures.insert(descendant.to_string());
    }
}

impl GitRepo for FakeGitRepo {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    fn remotes(&self) -> Result<Vec<Remote>> {
        Ok(Vec::new())
    }

    fn local_branches(&self) -> Result<Vec<LocalBranch>> {
        Ok(self
            .branches
            .iter()
            .map(|(name, target)| LocalBranch {
                name: name.clone(),
                target: target.clone(),
            })
            .collect())
    }

    fn remote_branches(&self) -> Result<Vec<RemoteBranch>> {
        Ok(Vec::new())
    }

    fn find_local_branch(&self, name: &str) -> Result<Option<String>> {
        Ok(self.branches.get(name).cloned())
    }

    fn find_remote_branch(&self, _remote: &str, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn commit(&self, id: &str) -> Result<Commit> {
        self.commits
            .get(id)
            .cloned()
            .ok_or_else(|| Error::InvalidInput(format!("unknown commit {}", id)))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        Ok(self.merge_bases.get(&(a.to_string(), b.to_string())).cloned())
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        if ancestor == descendant {
            return Ok(true);
        }
        if self.ancestry_failures.contains(descendant) {
            return Err(Error::Command {
                command: "merge-base".to_string(),
                message: "scripted failure".to_string(),
            });
        }
        Ok(self
            .ancestry
            .contains(&(ancestor.to_string(), descendant.to_string())))
    }

    fn log(&self, _tip: &str, query: &LogQuery) -> Result<Vec<Commit>> {
        let limit = if query.limit == 0 { usize::MAX } else { query.limit };
        Ok(self
            .history
            .iter()
            .filter_map(|hash| self.commits.get(hash))
            .filter(|c| !query.merges_only || self.merges.contains(&c.hash))
            .filter(|c| query.grep.as_ref().map_or(true, |g| c.message.contains(g.as_str())))
            .take(limit)
            .cloned()
            .collect())
    }

    fn fetch_remote(&self, _remote: &str) -> Result<()> {
        Ok(())
    }

    fn disable_quotepath(&self) -> Result<()> {
        Ok(())
    }
}
