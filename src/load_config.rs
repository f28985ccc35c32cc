//! Repository-list loader: reads the JSON array of fetch URLs that drives a run.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::{error, info};

/// A repository to mirror, identified by its fetch URL.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RepoRef {
    pub url: String,
}

impl RepoRef {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Short name derived from the URL: last path segment, `.git` suffix
    /// stripped. Keys both the working-copy subdirectory and the artifact
    /// filename, so two URLs with the same tail collide on the same artifact.
    pub fn short_name(&self) -> String {
        let tail = self.url.rsplit('/').next().unwrap_or(&self.url);
        tail.strip_suffix(".git").unwrap_or(tail).to_string()
    }
}

/// Fatal: the run aborts before any repository is processed.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "failed to read repository list: {e}"),
            ConfigError::Parse(e) => write!(f, "repository list is not a JSON array of strings: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

/// Loads the ordered repository list. No deduplication and no URL
/// validation: every string in the array becomes one [`RepoRef`].
pub fn load_repo_list<P: AsRef<Path>>(path: P) -> Result<Vec<RepoRef>, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to read repository list");
        ConfigError::Io(e)
    })?;
    let urls: Vec<String> = serde_json::from_str(&content).map_err(|e| {
        error!(error = ?e, path = %path.display(), "Failed to parse repository list");
        ConfigError::Parse(e)
    })?;
    info!(count = urls.len(), path = %path.display(), "Loaded repository list");
    Ok(urls.into_iter().map(RepoRef::new).collect())
}
