use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::render::RenderFormat;
use crate::upload::PublishMode;

/// Default comma-separated extension exclusion list: common binary, image
/// and font formats that never belong in a text snapshot.
pub const DEFAULT_EXCLUDED_EXTENSIONS: &str =
    ".svg,.ico,.png,.jpg,.jpeg,.gif,.bmp,.ttf,.woff,.woff2,.eot,.dll,.exe,.bin";

/// Immutable run configuration, constructed once at startup and passed into
/// every component. Nothing in the pipeline reads process-wide state.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root directory holding one working-copy subdirectory per repository.
    pub workspace_dir: PathBuf,
    /// Directory receiving one artifact file per repository.
    pub output_dir: PathBuf,
    /// Name of the rclone remote receiving the artifacts.
    pub remote: String,
    /// Folder on the remote into which artifacts are transferred.
    pub remote_folder: String,
    /// Maximum line count a file may have and still be included.
    pub max_lines: usize,
    /// Lowercased, leading-dot-normalised extensions to exclude.
    pub excluded_extensions: HashSet<String>,
    /// Rendering strategy for the per-repository artifact.
    pub format: RenderFormat,
    /// Additive copy or mirrored sync on publish.
    pub publish_mode: PublishMode,
    /// Skip the publish step entirely.
    pub skip_publish: bool,
}

impl Settings {
    pub fn trace_loaded(&self) {
        info!(
            workspace_dir = %self.workspace_dir.display(),
            output_dir = %self.output_dir.display(),
            max_lines = self.max_lines,
            format = %self.format,
            skip_publish = self.skip_publish,
            "Loaded settings"
        );
        debug!(?self, "Settings loaded (full debug)");
    }

    /// Normalises a comma-separated extension list: entries are trimmed,
    /// lowercased and given a leading dot; empty entries are dropped.
    pub fn parse_extensions(raw: &str) -> HashSet<String> {
        raw.split(',')
            .map(|ext| ext.trim().to_lowercase())
            .filter(|ext| !ext.is_empty())
            .map(|ext| {
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{ext}")
                }
            })
            .collect()
    }
}
