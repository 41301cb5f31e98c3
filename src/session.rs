//! Repository sessions: turn a path or URL into an opened working copy.
//!
//! Remote repositories are cloned once into `<cache root>/<name>` and
//! fetched on later connects. Each cache directory is guarded by an
//! exclusive advisory lock held for the lifetime of the session.

use crate::error::{Error, Result};
use crate::ports::{GitClient, GitRepo};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// True for inputs that name a remote repository rather than a local path.
pub fn is_remote(input: &str) -> bool {
    input.starts_with("git@")
        || input.starts_with("http://")
        || input.starts_with("https://")
        || input.contains(".git")
}

/// Cache directory name for a remote URL: last path segment without `.git`.
pub fn cache_dir_name(url: &str) -> Result<String> {
    let segment = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = segment.strip_suffix(".git").unwrap_or(segment);
    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!(
            "cannot derive a repository name from '{}'",
            url
        )));
    }
    Ok(name.to_string())
}

/// An opened working copy for one request.
pub struct RepoSession {
    pub input: String,
    pub local_path: PathBuf,
    pub is_remote: bool,
    pub message: String,
    pub repo: Box<dyn GitRepo>,
    _lock: Option<CacheLock>,
}

impl RepoSession {
    pub fn repo(&self) -> &dyn GitRepo {
        self.repo.as_ref()
    }
}

/// Opens sessions against local paths or the on-disk clone cache.
#[derive(Clone)]
pub struct RepoConnector {
    client: Arc<dyn GitClient>,
    cache_root: PathBuf,
}

impl RepoConnector {
    pub fn new(client: Arc<dyn GitClient>, cache_root: impl Into<PathBuf>) -> Self {
        Self {
            client,
            cache_root: cache_root.into(),
        }
    }

    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    pub fn connect(&self, input: &str) -> Result<RepoSession> {
        let input = input.trim();
        if input.is_empty() {
            return Err(Error::InvalidInput(
                "a repository path or url is required".to_string(),
            ));
        }
        if is_remote(input) {
            self.connect_remote(input)
        } else {
            self.open_local(input)
        }
    }

    fn open_local(&self, input: &str) -> Result<RepoSession> {
        let path = PathBuf::from(input);
        if !path.exists() {
            return Err(Error::NotFound(path));
        }
        let repo = self.client.open(&path)?;
        info!(path = %path.display(), "opened local repository");
        Ok(RepoSession {
            input: input.to_string(),
            local_path: path,
            is_remote: false,
            message: "local repository opened".to_string(),
            repo,
            _lock: None,
        })
    }

    fn connect_remote(&self, url: &str) -> Result<RepoSession> {
        let name = cache_dir_name(url)?;
        fs::create_dir_all(&self.cache_root)?;
        let lock = CacheLock::acquire(&self.cache_root, &name)?;
        let local_path = self.cache_root.join(&name);

        if local_path.exists() {
            match self.update(&local_path) {
                Ok(repo) => {
                    info!(url, path = %local_path.display(), "updated cached repository");
                    return Ok(RepoSession {
                        input: url.to_string(),
                        message: format!("remote repository updated at {}", local_path.display()),
                        local_path,
                        is_remote: true,
                        repo,
                        _lock: Some(lock),
                    });
                }
                Err(e) if e.is_authentication() => return Err(e),
                Err(e) => {
                    warn!(url, path = %local_path.display(), error = %e, "cached copy unusable, re-cloning");
                    fs::remove_dir_all(&local_path)?;
                }
            }
        }

        let repo = self.client.clone_repo(url, &local_path)?;
        repo.disable_quotepath()?;
        info!(url, path = %local_path.display(), "cloned repository");
        Ok(RepoSession {
            input: url.to_string(),
            message: format!("remote repository cloned to {}", local_path.display()),
            local_path,
            is_remote: true,
            repo,
            _lock: Some(lock),
        })
    }

    /// Open the cached copy and fetch every remote. One remote failing does
    /// not stop the others; an authentication failure is reported after all
    /// remotes were tried.
    fn update(&self, path: &Path) -> Result<Box<dyn GitRepo>> {
        let repo = self.client.open(path)?;
        repo.disable_quotepath()?;

        let mut auth_failure = None;
        for remote in repo.remotes()? {
            match repo.fetch_remote(&remote.name) {
                Ok(()) => debug!(remote = %remote.name, "fetched"),
                Err(e) => {
                    warn!(remote = %remote.name, error = %e, "fetch failed, continuing");
                    if e.is_authentication() && auth_failure.is_none() {
                        auth_failure = Some(e);
                    }
                }
            }
        }

        match auth_failure {
            Some(e) => Err(e),
            None => Ok(repo),
        }
    }
}

/// Exclusive lock on `<cache root>/.<name>.lock`, released on drop.
struct CacheLock {
    file: File,
}

impl CacheLock {
    fn acquire(cache_root: &Path, name: &str) -> Result<Self> {
        let path = cache_root.join(format!(".{}.lock", name));
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
