//! Working-copy synchroniser: ensures a local checkout exists for each
//! repository, fresh-cloning when absent and force-updating otherwise.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{debug, info};

use crate::load_config::RepoRef;

/// Non-fatal: the pipeline proceeds over whatever tree exists on disk, which
/// may be empty or stale. Callers must not assume the working copy reflects
/// the remote's latest state after a sync failure.
#[derive(Debug)]
pub enum SyncFailure {
    Io(std::io::Error),
    Command {
        action: &'static str,
        status: std::process::ExitStatus,
    },
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncFailure::Io(e) => write!(f, "failed to launch git: {e}"),
            SyncFailure::Command { action, status } => {
                write!(f, "git {action} exited with {status}")
            }
        }
    }
}

impl std::error::Error for SyncFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncFailure::Io(e) => Some(e),
            SyncFailure::Command { .. } => None,
        }
    }
}

impl From<std::io::Error> for SyncFailure {
    fn from(e: std::io::Error) -> Self {
        SyncFailure::Io(e)
    }
}

/// Deterministic working-copy location for a repository, whether or not a
/// sync has ever succeeded for it.
pub fn working_copy_path(repo: &RepoRef, workspace_dir: &Path) -> PathBuf {
    workspace_dir.join(repo.short_name())
}

/// Capability seam for the external fetch/update step, mockable in tests so
/// the pipeline can run without network access.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait WorkspaceSync: Send + Sync {
    /// Returns the local directory containing the repository's current tree.
    async fn sync(&self, repo: &RepoRef, workspace_dir: &Path) -> Result<PathBuf, SyncFailure>;
}

/// Real implementation shelling out to `git`: `clone` on first sight,
/// `pull -f` afterwards (discards local divergence).
pub struct GitWorkspaceSync;

#[async_trait]
impl WorkspaceSync for GitWorkspaceSync {
    async fn sync(&self, repo: &RepoRef, workspace_dir: &Path) -> Result<PathBuf, SyncFailure> {
        let dest = working_copy_path(repo, workspace_dir);

        if dest.exists() {
            debug!(url = %repo.url, path = %dest.display(), "Updating existing working copy");
            let output = Command::new("git")
                .arg("-C")
                .arg(&dest)
                .args(["pull", "-f"])
                .output()?;
            if !output.status.success() {
                return Err(SyncFailure::Command {
                    action: "pull",
                    status: output.status,
                });
            }
            info!(url = %repo.url, path = %dest.display(), "Updated working copy");
        } else {
            fs::create_dir_all(workspace_dir)?;
            debug!(url = %repo.url, path = %dest.display(), "Cloning fresh working copy");
            let output = Command::new("git")
                .arg("clone")
                .arg(&repo.url)
                .arg(&dest)
                .output()?;
            if !output.status.success() {
                return Err(SyncFailure::Command {
                    action: "clone",
                    status: output.status,
                });
            }
            info!(url = %repo.url, path = %dest.display(), "Cloned working copy");
        }

        Ok(dest)
    }
}
