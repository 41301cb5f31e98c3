//! Git access port (traits).
//! Defines the git operations the report needs without coupling to any implementation.

use crate::domain::Commit;
use crate::error::Result;
use std::path::Path;

/// A configured remote of a working copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remote {
    pub name: String,
    pub url: Option<String>,
}

/// A local branch ref and the commit it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalBranch {
    pub name: String,
    pub target: String,
}

/// A remote-tracking ref with the `<remote>/` prefix stripped from `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    pub remote: String,
    pub name: String,
    pub target: String,
}

/// Filters for a log walk. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub merges_only: bool,
    /// Case-sensitive substring the full commit message must contain.
    pub grep: Option<String>,
    /// Maximum number of matches; 0 means no cap.
    pub limit: usize,
}

impl LogQuery {
    pub fn merges_mentioning(text: &str, limit: usize) -> Self {
        Self {
            merges_only: true,
            grep: Some(text.to_string()),
            limit,
        }
    }

    pub fn mentioning(text: &str, limit: usize) -> Self {
        Self {
            merges_only: false,
            grep: Some(text.to_string()),
            limit,
        }
    }
}

/// Port for operations on one opened working copy.
/// Implementations may use git2, shell commands, or test fakes.
pub trait GitRepo: Send {
    /// Filesystem path of the working copy.
    fn workdir(&self) -> &Path;

    /// Configured remotes, in configuration order.
    fn remotes(&self) -> Result<Vec<Remote>>;

    fn local_branches(&self) -> Result<Vec<LocalBranch>>;

    /// Remote-tracking branches of every remote, excluding `<remote>/HEAD`.
    fn remote_branches(&self) -> Result<Vec<RemoteBranch>>;

    /// Tip of a local branch, if it exists.
    fn find_local_branch(&self, name: &str) -> Result<Option<String>>;

    /// Tip of `refs/remotes/<remote>/<name>`, if it exists.
    fn find_remote_branch(&self, remote: &str, name: &str) -> Result<Option<String>>;

    /// Read commit metadata by full id.
    fn commit(&self, id: &str) -> Result<Commit>;

    /// Best common ancestor, or `None` when the histories are unrelated.
    fn merge_base(&self, a: &str, b: &str) -> Result<Option<String>>;

    /// True when `ancestor` is reachable from `descendant` (or equal to it).
    fn is_ancestor(&self, ancestor: &str, descendant: &str) -> Result<bool>;

    /// Walk history from `tip` applying `query`.
    fn log(&self, tip: &str, query: &LogQuery) -> Result<Vec<Commit>>;

    /// Fetch updates from a single remote.
    fn fetch_remote(&self, remote: &str) -> Result<()>;

    /// Stop git from escaping non-ASCII paths and names (`core.quotepath=false`).
    fn disable_quotepath(&self) -> Result<()>;
}

/// Port for obtaining working copies. Created once at startup and shared.
pub trait GitClient: Send + Sync {
    /// Open an existing working copy without searching parent directories.
    fn open(&self, path: &Path) -> Result<Box<dyn GitRepo>>;

    /// Clone `url` into `dest`, which must not exist yet.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<Box<dyn GitRepo>>;
}
