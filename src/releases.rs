//! Release metadata lookup
//!
//! The daemon binary is pinned to whatever GitHub reports as the latest
//! release at install time. The lookup is a trait so the orchestrator can be
//! driven without network access in tests.

use anyhow::{Context, anyhow};
use serde::Deserialize;
use std::time::Duration;

/// Resolves release tags and asset URLs.
pub trait ReleaseSource {
    /// Tag name of the latest release of `repo` (`owner/name`).
    fn latest_tag(&self, repo: &str) -> anyhow::Result<String>;

    /// Download URL of `asset` in release `tag`.
    fn asset_url(&self, repo: &str, tag: &str, asset: &str) -> String {
        format!("https://github.com/{}/releases/download/{}/{}", repo, tag, asset)
    }
}

/// Returns true if `tag` is safe to embed in a download URL and a shell
/// command: non-empty, ASCII alphanumerics plus `.`, `_` and `-` only.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty()
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// GitHub release metadata from API
#[derive(Deserialize, Debug)]
struct GitHubRelease {
    tag_name: String,
}

/// Release source backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    api_base: String,
    timeout: Duration,
}

impl Default for GitHubReleases {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GitHubReleases {
    /// Create a client against the public API
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReleaseSource for GitHubReleases {
    fn latest_tag(&self, repo: &str) -> anyhow::Result<String> {
        let url = format!("{}/repos/{}/releases/latest", self.api_base, repo);

        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("ptero-install/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let response = client
            .get(&url)
            .send()
            .with_context(|| format!("Request to {} failed", url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "GitHub API error for {}: HTTP {}",
                repo,
                response.status()
            ));
        }

        let release: GitHubRelease = response
            .json()
            .with_context(|| format!("Malformed release metadata for {}", repo))?;
        tracing::info!("Latest release of {} is {}", repo, release.tag_name);
        Ok(release.tag_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    impl ReleaseSource for Fixed {
        fn latest_tag(&self, _repo: &str) -> anyhow::Result<String> {
            Ok("v1.11.13".to_string())
        }
    }

    #[test]
    fn test_asset_url() {
        let url = Fixed.asset_url("pterodactyl/wings", "v1.11.13", "wings_linux_amd64");
        assert_eq!(
            url,
            "https://github.com/pterodactyl/wings/releases/download/v1.11.13/wings_linux_amd64"
        );
    }

    #[test]
    fn test_tag_validation() {
        assert!(is_valid_tag("v1.11.13"));
        assert!(is_valid_tag("1.0.0-rc_1"));
        assert!(!is_valid_tag(""));
        assert!(!is_valid_tag("v1;touch${IFS}/tmp/x"));
        assert!(!is_valid_tag("v1|sh"));
        assert!(!is_valid_tag("../v1"));
        assert!(!is_valid_tag("v1 v2"));
    }

    #[test]
    fn test_release_metadata_parses_tag() {
        let body = r#"{"tag_name":"v1.11.13","name":"v1.11.13","assets":[]}"#;
        let release: GitHubRelease = serde_json::from_str(body).expect("parse");
        assert_eq!(release.tag_name, "v1.11.13");
    }
}
