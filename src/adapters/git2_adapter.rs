//! Git2 implementation of the git ports.
//!
//! Object-graph reads go through libgit2. Clone and fetch shell out to the
//! `git` executable so the user's SSH agent and credential helpers apply.

use crate::domain::{short_hash, Commit};
use crate::error::{Error, Result};
use crate::ports::{GitClient, GitRepo, LocalBranch, LogQuery, Remote, RemoteBranch};
use git2::{BranchType, ErrorCode, Oid, Repository, Sort};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Entry point for git access. Build one with [`Git2Client::init`] and share it.
#[derive(Debug, Clone)]
pub struct Git2Client {
    program: PathBuf,
}

impl Git2Client {
    /// Check that the `git` executable is usable.
    pub fn init() -> Result<Self> {
        Self::with_program("git")
    }

    pub fn with_program(program: impl Into<PathBuf>) -> Result<Self> {
        let client = Self {
            program: program.into(),
        };
        let version = run_git(&client.program, None, &["--version"])?;
        debug!(version = %version.trim(), "git available");
        Ok(client)
    }
}

impl GitClient for Git2Client {
    fn open(&self, path: &Path) -> Result<Box<dyn GitRepo>> {
        Ok(Box::new(Git2Repo::open(path, self.program.clone())?))
    }

    fn clone_repo(&self, url: &str, dest: &Path) -> Result<Box<dyn GitRepo>> {
        let dest_str = dest.to_string_lossy();
        run_git(&self.program, None, &["clone", "--quiet", "--", url, &dest_str])?;
        self.open(dest)
    }
}

pub struct Git2Repo {
    repo: Repository,
    path: PathBuf,
    program: PathBuf,
}

impl Git2Repo {
    pub fn open(path: &Path, program: PathBuf) -> Result<Self> {
        let repo = Repository::open(path).map_err(|e| {
            debug!(path = %path.display(), error = %e, "open failed");
            Error::InvalidRepository(path.to_path_buf())
        })?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
            program,
        })
    }

    fn oid(id: &str) -> Result<Oid> {
        Oid::from_str(id).map_err(|_| Error::InvalidInput(format!("not a commit id: {}", id)))
    }

    fn to_commit(commit: &git2::Commit<'_>) -> Commit {
        let hash = commit.id().to_string();
        let author = commit.author();
        Commit {
            short_hash: short_hash(&hash),
            hash,
            message: String::from_utf8_lossy(commit.message_bytes()).into_owned(),
            author: String::from_utf8_lossy(author.name_bytes()).into_owned(),
            email: String::from_utf8_lossy(author.email_bytes()).into_owned(),
            timestamp: commit.time().seconds(),
        }
    }

    fn ref_target(&self, refname: &str) -> Result<Option<String>> {
        let reference = match self.repo.find_reference(refname) {
            Ok(r) => r,
            // Names like `main~1` are not refs at all.
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                debug!(refname, error = %e, "no such ref");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(reference.resolve()?.target().map(|oid| oid.to_string()))
    }
}

impl GitRepo for Git2Repo {
    fn workdir(&self) -> &Path {
        &self.path
    }

    fn remotes(&self) -> Result<Vec<Remote>> {
        let names = self.repo.remotes()?;
        let mut remotes = Vec::new();
        for name in names.iter().flatten() {
            let url = self.repo.find_remote(name)?.url().map(String::from);
            remotes.push(Remote {
                name: name.to_string(),
                url,
            });
        }
        Ok(remotes)
    }

    fn local_branches(&self) -> Result<Vec<LocalBranch>> {
        let mut branches = Vec::new();
        for entry in self.repo.branches(Some(BranchType::Local))? {
            let (branch, _) = entry?;
            let name = match branch.name()? {
                Some(name) => name.to_string(),
                None => continue,
            };
            if let Some(target) = branch.get().resolve()?.target() {
                branches.push(LocalBranch {
                    name,
                    target: target.to_string(),
                });
            }
        }
        Ok(branches)
    }

    fn remote_branches(&self) -> Result<Vec<RemoteBranch>> {
        let mut branches = Vec::new();
        for remote in self.remotes()? {
            let prefix = format!("refs/remotes/{}/", remote.name);
            for reference in self.repo.references_glob(&format!("{}*", prefix))? {
                let reference = reference?;
                let name = match reference.name().and_then(|n| n.strip_prefix(&prefix)) {
                    Some(name) if name != "HEAD" => name.to_string(),
                    _ => continue,
                };
                let target = match reference.resolve().ok().and_then(|r| r.target()) {
                    Some(oid) => oid.to_string(),
                    None => {
                        debug!(remote = %remote.name, branch = %name, "dangling remote ref");
                        continue;
                    }
                };
                branches.push(RemoteBranch {
                    remote: remote.name.clone(),
                    name,
                    target,
                });
            }
        }
        Ok(branches)
    }

    fn find_local_branch(&self, name: &str) -> Result<Option<String>> {
        self.ref_target(&format!("refs/heads/{}", name))
    }

    fn find_remote_branch(&self, remote: &str, name: &str) -> Result<Option<String>> {
        self.ref_target(&format!("refs/remotes/{}/{}", remote, name))
    }

    fn commit(&self, id: &str) -> Result<Commit> {
        let commit = self.repo.find_commit(Self::oid(id)?)?;
        Ok(Self::to_commit(&commit))
    }

    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>> {
        let base = not_found_to_none(self.repo.merge_base(Self::oid(a)?, Self::oid(b)?))?;
        Ok(base.map(|oid| oid.to_string()))
    }

    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool> {
        let ancestor = Self::oid(ancestor)?;
        let descendant = Self::oid(descendant)?;
        if ancestor == descendant {
            return Ok(true);
        }
        Ok(self.repo.graph_descendant_of(descendant, ancestor)?)
    }

    fn log(&self, tip: &str, query: &LogQuery) -> Result<Vec<Commit>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        revwalk.push(Self::oid(tip)?)?;

        let mut commits = Vec::new();
        for oid in revwalk {
            if query.limit > 0 && commits.len() >= query.limit {
                break;
            }
            let commit = self.repo.find_commit(oid?)?;
            if query.merges_only && commit.parent_count() < 2 {
                continue;
            }
            if let Some(needle) = &query.grep {
                if !String::from_utf8_lossy(commit.message_bytes()).contains(needle.as_str()) {
                    continue;
                }
            }
            commits.push(Self::to_commit(&commit));
        }
        Ok(commits)
    }

    fn fetch_remote(&self, remote: &str) -> Result<()> {
        run_git(&self.program, Some(&self.path), &["fetch", "--quiet", remote])?;
        Ok(())
    }

    fn disable_quotepath(&self) -> Result<()> {
        self.repo.config()?.set_bool("core.quotepath", false)?;
        Ok(())
    }
}

fn not_found_to_none<T>(result: std::result::Result<T, git2::Error>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn run_git(program: &Path, cwd: Option<&Path>, args: &[&str]) -> Result<String> {
    let mut command = Command::new(program);
    command
        .args(args)
        .env("LC_ALL", "C.UTF-8")
        .env("GIT_TERMINAL_PROMPT", "0");
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }

    let subcommand = args.first().copied().unwrap_or("git");
    let output = command.output().map_err(|e| Error::Command {
        command: subcommand.to_string(),
        message: format!("failed to execute {}: {}", program.display(), e),
    })?;

    if !output.status.success() {
        return Err(Error::from_command(
            subcommand,
            &String::from_utf8_lossy(&output.stderr),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{has_git, TestRepo};
    use pretty_assertions::assert_eq;

    fn open(fixture: &TestRepo) -> Git2Repo {
        Git2Repo::open(fixture.path(), PathBuf::from("git")).unwrap()
    }

    #[test]
    fn open_rejects_plain_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = Git2Repo::open(dir.path(), PathBuf::from("git")).err().unwrap();
        assert!(matches!(err, Error::InvalidRepository(_)));
    }

    #[test]
    fn lists_local_and_remote_branches() {
        let fixture = TestRepo::new();
        let base = fixture.head("main");
        fixture.branch("feature/a", base);
        fixture.add_remote("origin", "git@example.com:group/app.git");
        fixture.remote_branch("origin", "feature/b", base);
        fixture.remote_branch("origin", "main", base);
        fixture.remote_head("origin", "main");

        let repo = open(&fixture);
        let mut local: Vec<_> = repo.local_branches().unwrap().into_iter().map(|b| b.name).collect();
        local.sort();
        assert_eq!(local, vec!["feature/a", "main"]);

        let remote = repo.remote_branches().unwrap();
        let mut names: Vec<_> = remote.iter().map(|b| (b.remote.as_str(), b.name.as_str())).collect();
        names.sort();
        assert_eq!(names, vec![("origin", "feature/b"), ("origin", "main")]);
    }

    #[test]
    fn finds_branch_tips() {
        let fixture = TestRepo::new();
        let base = fixture.head("main");
        fixture.add_remote("origin", "https://example.com/group/app.git");
        fixture.remote_branch("origin", "release", base);

        let repo = open(&fixture);
        assert_eq!(repo.find_local_branch("main").unwrap(), Some(base.to_string()));
        assert_eq!(repo.find_local_branch("missing").unwrap(), None);
        assert_eq!(
            repo.find_remote_branch("origin", "release").unwrap(),
            Some(base.to_string())
        );
        assert_eq!(repo.find_remote_branch("origin", "main").unwrap(), None);
    }

    #[test]
    fn invalid_ref_names_are_missing() {
        let fixture = TestRepo::new();
        fixture.add_remote("origin", "https://example.com/group/app.git");

        let repo = open(&fixture);
        assert_eq!(repo.find_local_branch("main~1").unwrap(), None);
        assert_eq!(repo.find_local_branch("a..b").unwrap(), None);
        assert_eq!(repo.find_remote_branch("origin", "main^").unwrap(), None);
    }

    #[test]
    fn ancestry_and_merge_base() {
        let fixture = TestRepo::new();
        let base = fixture.head("main");
        fixture.branch("topic", base);
        let topic = fixture.commit("topic", "topic work", 1_700_000_100);
        let main = fixture.commit("main", "main work", 1_700_000_200);

        let repo = open(&fixture);
        let (topic, main, base) = (topic.to_string(), main.to_string(), base.to_string());
        assert_eq!(repo.merge_base(&topic, &main).unwrap(), Some(base.clone()));
        assert!(repo.is_ancestor(&base, &topic).unwrap());
        assert!(!repo.is_ancestor(&topic, &main).unwrap());
        assert!(repo.is_ancestor(&topic, &topic).unwrap());
    }

    #[test]
    fn log_filters_merges_and_grep() {
        let fixture = TestRepo::new();
        let base = fixture.head("main");
        fixture.branch("feature/x", base);
        fixture.commit("feature/x", "x work", 1_700_000_100);
        fixture.commit("main", "mention feature/x in plain commit", 1_700_000_150);
        let merge = fixture.merge("main", "feature/x", "Merge branch 'feature/x'", 1_700_000_200);

        let repo = open(&fixture);
        let tip = merge.to_string();
        let merges = repo.log(&tip, &LogQuery::merges_mentioning("feature/x", 50)).unwrap();
        assert_eq!(merges.len(), 1);
        assert_eq!(merges[0].hash, tip);
        assert_eq!(merges[0].summary(), "Merge branch 'feature/x'");

        let mentions = repo.log(&tip, &LogQuery::mentioning("feature/x", 10)).unwrap();
        assert_eq!(mentions.len(), 2);
        assert_eq!(mentions[0].hash, tip);

        let capped = repo.log(&tip, &LogQuery::mentioning("feature/x", 1)).unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[test]
    fn commit_metadata() {
        let fixture = TestRepo::new();
        let oid = fixture.commit("main", "Add thing\n\nbody", 1_700_000_300);
        let commit = open(&fixture).commit(&oid.to_string()).unwrap();
        assert_eq!(commit.timestamp, 1_700_000_300);
        assert_eq!(commit.author, "Test Author");
        assert_eq!(commit.email, "author@example.com");
        assert_eq!(commit.summary(), "Add thing");
        assert_eq!(commit.short_hash.len(), 8);
    }

    #[test]
    fn quotepath_is_written_to_config() {
        let fixture = TestRepo::new();
        open(&fixture).disable_quotepath().unwrap();
        let config = fixture.repo.config().unwrap();
        assert!(!config.get_bool("core.quotepath").unwrap());
    }

    #[test]
    fn clone_and_fetch_through_cli() {
        if !has_git() {
            return;
        }
        let upstream = TestRepo::new();
        let dest = tempfile::tempdir().unwrap();
        let target = dest.path().join("app");

        let client = Git2Client::init().unwrap();
        let url = upstream.path().to_string_lossy().into_owned();
        let cloned = client.clone_repo(&url, &target).unwrap();
        assert!(cloned.find_remote_branch("origin", "main").unwrap().is_some());

        let newer = upstream.commit("main", "upstream change", 1_700_000_500);
        cloned.fetch_remote("origin").unwrap();
        assert_eq!(
            cloned.find_remote_branch("origin", "main").unwrap(),
            Some(newer.to_string())
        );
    }

    #[test]
    fn clone_of_missing_source_is_command_failure() {
        if !has_git() {
            return;
        }
        let dest = tempfile::tempdir().unwrap();
        let client = Git2Client::init().unwrap();
        let missing = dest.path().join("nope");
        let err = client
            .clone_repo(&missing.to_string_lossy(), &dest.path().join("out"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Command { .. }), "{err:?}");
    }

    #[test]
    fn clone_url_is_never_an_option() {
        if !has_git() {
            return;
        }
        let dest = tempfile::tempdir().unwrap();
        let client = Git2Client::init().unwrap();
        let err = client
            .clone_repo("--upload-pack=false.git", &dest.path().join("out"))
            .err()
            .unwrap();
        match err {
            Error::Command { message, .. } => assert!(message.contains("--upload-pack=false.git"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
