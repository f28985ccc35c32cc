//! Remote publisher: transfers the output directory to a cloud-storage
//! folder by shelling out to `rclone`.

use std::fmt;
use std::path::Path;
use std::process::Command;

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;
use tracing::{error, info};

/// Transfer semantics for the publish step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PublishMode {
    /// Additive: never deletes remote files absent locally.
    Copy,
    /// Mirrored: deletes remote files absent locally.
    Sync,
}

impl PublishMode {
    fn rclone_verb(&self) -> &'static str {
        match self {
            PublishMode::Copy => "copy",
            PublishMode::Sync => "sync",
        }
    }
}

impl fmt::Display for PublishMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rclone_verb())
    }
}

/// Non-fatal from the pipeline's perspective: the run still reports overall
/// success. Never retried.
#[derive(Debug)]
pub enum PublishFailure {
    Io(std::io::Error),
    Command(std::process::ExitStatus),
}

impl fmt::Display for PublishFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishFailure::Io(e) => write!(f, "failed to launch rclone: {e}"),
            PublishFailure::Command(status) => write!(f, "rclone exited with {status}"),
        }
    }
}

impl std::error::Error for PublishFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PublishFailure::Io(e) => Some(e),
            PublishFailure::Command(_) => None,
        }
    }
}

impl From<std::io::Error> for PublishFailure {
    fn from(e: std::io::Error) -> Self {
        PublishFailure::Io(e)
    }
}

/// Capability seam for the external transfer step, mockable in tests so the
/// pipeline can run without a configured remote.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Transfers the artifacts in `output_dir` to the remote destination.
    async fn publish(&self, output_dir: &Path) -> Result<(), PublishFailure>;
}

/// Real implementation shelling out to
/// `rclone <copy|sync> <output_dir> <remote>:<folder>`.
pub struct RclonePublisher {
    remote: String,
    folder: String,
    mode: PublishMode,
}

impl RclonePublisher {
    pub fn new(remote: impl Into<String>, folder: impl Into<String>, mode: PublishMode) -> Self {
        Self {
            remote: remote.into(),
            folder: folder.into(),
            mode,
        }
    }

    fn target(&self) -> String {
        format!("{}:{}", self.remote, self.folder)
    }
}

#[async_trait]
impl Publisher for RclonePublisher {
    async fn publish(&self, output_dir: &Path) -> Result<(), PublishFailure> {
        let target = self.target();
        info!(
            mode = %self.mode,
            target = %target,
            output_dir = %output_dir.display(),
            "Publishing artifacts"
        );
        let output = Command::new("rclone")
            .arg(self.mode.rclone_verb())
            .arg(output_dir)
            .arg(&target)
            .output()?;
        if !output.status.success() {
            error!(
                status = %output.status,
                stderr = %String::from_utf8_lossy(&output.stderr),
                "rclone reported failure"
            );
            return Err(PublishFailure::Command(output.status));
        }
        info!(target = %target, "Published artifacts");
        Ok(())
    }
}
