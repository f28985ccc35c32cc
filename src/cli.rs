use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::{Settings, DEFAULT_EXCLUDED_EXTENSIONS};
use crate::download::GitWorkspaceSync;
use crate::load_config::load_repo_list;
use crate::render::RenderFormat;
use crate::synchronise::{synchronise, RunReport};
use crate::upload::{PublishMode, RclonePublisher};

/// CLI for repo-docs: mirror git repositories into flat document snapshots
/// and publish them to cloud storage. One invocation performs the full
/// pipeline; there are no subcommands.
#[derive(Parser)]
#[clap(
    name = "repo-docs",
    version,
    about = "Mirror git repositories into flat document snapshots and publish them to cloud storage"
)]
pub struct Cli {
    /// Path to the JSON file listing repository URLs
    #[clap(long, default_value = "repos.json")]
    pub repo_list: PathBuf,

    /// Maximum number of lines a file may have and still be included
    #[clap(long, default_value_t = 250)]
    pub max_lines: usize,

    /// Comma-separated list of file extensions to exclude
    #[clap(long, default_value = DEFAULT_EXCLUDED_EXTENSIONS)]
    pub exclude: String,

    /// Artifact format
    #[clap(long, value_enum, default_value_t = RenderFormat::Markdown)]
    pub format: RenderFormat,

    /// Directory holding one working-copy subdirectory per repository
    #[clap(long, default_value = "workspace")]
    pub workspace_dir: PathBuf,

    /// Directory receiving one artifact file per repository
    #[clap(long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Name of the rclone remote receiving the artifacts
    #[clap(long, default_value = "gdrive")]
    pub remote: String,

    /// Folder on the remote into which artifacts are transferred
    #[clap(long, default_value = "repo-docs")]
    pub remote_folder: String,

    /// Additive copy or mirrored sync on publish
    #[clap(long, value_enum, default_value_t = PublishMode::Copy)]
    pub publish_mode: PublishMode,

    /// Skip the publish step
    #[clap(long)]
    pub no_publish: bool,

    /// Print per-repository progress to standard output
    #[clap(long)]
    pub debug: bool,
}

impl Cli {
    pub fn settings(&self) -> Settings {
        Settings {
            workspace_dir: self.workspace_dir.clone(),
            output_dir: self.output_dir.clone(),
            remote: self.remote.clone(),
            remote_folder: self.remote_folder.clone(),
            max_lines: self.max_lines,
            excluded_extensions: Settings::parse_extensions(&self.exclude),
            format: self.format,
            publish_mode: self.publish_mode,
            skip_publish: self.no_publish,
        }
    }
}

/// Extracted entrypoint so integration tests and main() share one code path.
/// Only an unloadable repository list errors; everything downstream is
/// best-effort and lands in the report.
pub async fn run(cli: Cli) -> Result<RunReport> {
    let settings = cli.settings();
    settings.trace_loaded();

    let repos = load_repo_list(&cli.repo_list)?;

    let sync = GitWorkspaceSync;
    let publisher = RclonePublisher::new(
        settings.remote.clone(),
        settings.remote_folder.clone(),
        settings.publish_mode,
    );
    let report = synchronise(&settings, &repos, &sync, &publisher).await;

    match serde_json::to_string_pretty(&report) {
        Ok(json) => tracing::debug!(json = %json, "Run report as JSON"),
        Err(e) => tracing::error!(error = %e, "Failed to serialise run report"),
    }

    Ok(report)
}
