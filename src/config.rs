//! Built-in defaults and validated mutations of the configuration document.

use crate::domain::{AppConfig, PlatformProfile, RepositoryConfig};
use crate::error::{Error, Result};
use indexmap::IndexMap;

/// Fallback profile when nothing else matches a repository URL.
pub fn default_platform() -> PlatformProfile {
    PlatformProfile {
        name: "Aliyun Code".to_string(),
        base_url: "https://code.aliyun.com".to_string(),
        merge_request_path: "/-/merge_requests/".to_string(),
        commit_path: "/-/commit/".to_string(),
        ssh_prefix: "git@code.aliyun.com:".to_string(),
        https_prefix: "https://code.aliyun.com/".to_string(),
    }
}

/// Configuration written on first run.
pub fn default_config() -> AppConfig {
    let mut platforms = IndexMap::new();
    platforms.insert(
        "gitlab".to_string(),
        PlatformProfile {
            name: "GitLab".to_string(),
            base_url: "https://gitlab.com".to_string(),
            merge_request_path: "/-/merge_requests/".to_string(),
            commit_path: "/-/commit/".to_string(),
            ssh_prefix: "git@gitlab.com:".to_string(),
            https_prefix: "https://gitlab.com/".to_string(),
        },
    );
    platforms.insert(
        "github".to_string(),
        PlatformProfile {
            name: "GitHub".to_string(),
            base_url: "https://github.com".to_string(),
            merge_request_path: "/pull/".to_string(),
            commit_path: "/commit/".to_string(),
            ssh_prefix: "git@github.com:".to_string(),
            https_prefix: "https://github.com/".to_string(),
        },
    );
    platforms.insert("aliyun".to_string(), default_platform());

    AppConfig {
        repositories: Vec::new(),
        platforms,
    }
}

impl AppConfig {
    /// Saved entry whose URL equals `url` exactly.
    pub fn repository_by_url(&self, url: &str) -> Option<&RepositoryConfig> {
        self.repositories.iter().find(|r| r.url == url)
    }

    pub fn add_repository(&mut self, repo: RepositoryConfig) -> Result<&RepositoryConfig> {
        let name = repo.name.trim();
        let url = repo.url.trim();
        if name.is_empty() || url.is_empty() {
            return Err(Error::InvalidInput(
                "repository name and url are required".to_string(),
            ));
        }
        if self.repositories.iter().any(|r| r.name == name) {
            return Err(Error::InvalidInput(format!(
                "a repository named '{}' already exists",
                name
            )));
        }
        if self.repositories.iter().any(|r| r.url == url) {
            return Err(Error::InvalidInput(format!(
                "a repository with url '{}' already exists",
                url
            )));
        }

        self.repositories.push(RepositoryConfig {
            name: name.to_string(),
            url: url.to_string(),
            ..repo
        });
        Ok(&self.repositories[self.repositories.len() - 1])
    }

    pub fn remove_repository(&mut self, index: usize) -> Result<RepositoryConfig> {
        if index >= self.repositories.len() {
            return Err(Error::InvalidInput(format!(
                "repository index {} out of range",
                index
            )));
        }
        Ok(self.repositories.remove(index))
    }

    /// Rebuild a submitted document through the same checks as the single
    /// entry mutations. Fails on the first duplicate or incomplete entry.
    pub fn validated(self) -> Result<AppConfig> {
        let mut checked = AppConfig::default();
        for repo in self.repositories {
            checked.add_repository(repo)?;
        }
        for (key, profile) in self.platforms {
            checked.upsert_platform(&key, profile)?;
        }
        Ok(checked)
    }

    /// Insert or replace a platform profile.
    pub fn upsert_platform(&mut self, key: &str, profile: PlatformProfile) -> Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidInput("platform key is required".to_string()));
        }
        let required = [
            ("name", &profile.name),
            ("base_url", &profile.base_url),
            ("merge_request_path", &profile.merge_request_path),
            ("commit_path", &profile.commit_path),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(Error::InvalidInput(format!("platform field '{}' is required", field)));
        }
        self.platforms.insert(key.to_string(), profile);
        Ok(())
    }
}
