//! Hosting platform detection and link building.

use crate::config::default_platform;
use crate::domain::{change_request_number, AppConfig, PlatformProfile};

/// Pick the profile for a repository URL.
///
/// A saved repository with this exact URL and a known platform key wins.
/// Otherwise profiles are scanned in configuration order, matching on the
/// ssh or https prefix or on the key appearing anywhere in the URL. Falls
/// back to the built-in default.
pub fn resolve_platform(config: &AppConfig, repo_url: &str) -> PlatformProfile {
    if let Some(saved) = config.repository_by_url(repo_url) {
        if let Some(profile) = config.platforms.get(&saved.platform) {
            return profile.clone();
        }
    }

    config
        .platforms
        .iter()
        .find(|(key, p)| {
            (!p.ssh_prefix.is_empty() && repo_url.starts_with(&p.ssh_prefix))
                || (!p.https_prefix.is_empty() && repo_url.starts_with(&p.https_prefix))
                || repo_url.contains(key.as_str())
        })
        .map(|(_, p)| p.clone())
        .unwrap_or_else(default_platform)
}

/// Project path (`/group/project`) of the first remote URL under the
/// profile's ssh or https prefix; empty when none matches.
pub fn project_path<'a>(
    profile: &PlatformProfile,
    remote_urls: impl IntoIterator<Item = &'a str>,
) -> String {
    for url in remote_urls {
        let rest = [&profile.ssh_prefix, &profile.https_prefix]
            .into_iter()
            .filter(|prefix| !prefix.is_empty())
            .find_map(|prefix| url.strip_prefix(prefix.as_str()));
        if let Some(rest) = rest {
            let rest = rest.trim_end_matches('/');
            let rest = rest.strip_suffix(".git").unwrap_or(rest);
            return format!("/{}", rest.trim_start_matches('/'));
        }
    }
    String::new()
}

/// Link targets for one repository on its platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformLinks {
    pub profile: PlatformProfile,
    pub project_path: String,
}

impl PlatformLinks {
    pub fn new(profile: PlatformProfile, project_path: String) -> Self {
        Self {
            profile,
            project_path,
        }
    }

    fn project_url(&self) -> Option<String> {
        if self.project_path.is_empty() {
            return None;
        }
        Some(format!(
            "{}{}",
            self.profile.base_url.trim_end_matches('/'),
            self.project_path
        ))
    }

    /// Link to a change request given an extracted id like `!42`.
    pub fn merge_request_url(&self, id: &str) -> Option<String> {
        let number = change_request_number(id)?;
        Some(format!(
            "{}{}{}",
            self.project_url()?,
            self.profile.merge_request_path,
            number
        ))
    }

    pub fn commit_url(&self, hash: &str) -> Option<String> {
        Some(format!("{}{}{}", self.project_url()?, self.profile.commit_path, hash))
    }
}
