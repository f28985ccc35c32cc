//! Pipeline orchestration: working-copy sync, filter, aggregate, publish.
//!
//! Strictly sequential and best-effort: a failed sync degrades to whatever
//! tree is on disk, a failed file is dropped from the artifact, and a failed
//! publish is logged. Only an unloadable repository list aborts a run, and
//! that happens before this module is reached. No step is retried and no
//! repository failure touches its siblings.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::download::{working_copy_path, WorkspaceSync};
use crate::filter::{collect_files, ExcludeReason, ExclusionRules, FileOutcome};
use crate::load_config::RepoRef;
use crate::render;
use crate::upload::Publisher;

/// Per-run summary, printed at the end of a run.
#[derive(Debug, serde::Serialize)]
pub struct RunReport {
    pub repos: Vec<RepoReport>,
    /// True when the publish step ran and succeeded; false when it failed or
    /// was skipped.
    pub published: bool,
}

/// Per-repository summary: every candidate file accounted for.
#[derive(Debug, serde::Serialize)]
pub struct RepoReport {
    pub name: String,
    pub url: String,
    pub sync_ok: bool,
    pub included: Vec<PathBuf>,
    pub excluded: Vec<(PathBuf, ExcludeReason)>,
    pub failed: Vec<(PathBuf, String)>,
    pub artifact: Option<PathBuf>,
}

/// Runs the full pipeline over the repository list, then publishes the
/// output directory once (unless skipped). Always returns a report;
/// per-repository and publish failures are recorded, not raised.
pub async fn synchronise<S, P>(
    settings: &Settings,
    repos: &[RepoRef],
    sync: &S,
    publisher: &P,
) -> RunReport
where
    S: WorkspaceSync,
    P: Publisher,
{
    if let Err(e) = fs::create_dir_all(&settings.workspace_dir) {
        warn!(error = %e, path = %settings.workspace_dir.display(), "Could not create workspace directory");
    }
    if let Err(e) = fs::create_dir_all(&settings.output_dir) {
        warn!(error = %e, path = %settings.output_dir.display(), "Could not create output directory");
    }

    let mut repo_reports = Vec::with_capacity(repos.len());
    for repo in repos {
        repo_reports.push(process_repo(settings, repo, sync).await);
    }

    let published = if settings.skip_publish {
        info!("Publish step skipped");
        false
    } else {
        match publisher.publish(&settings.output_dir).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Publish step failed, run continues as success");
                false
            }
        }
    };

    RunReport {
        repos: repo_reports,
        published,
    }
}

async fn process_repo<S>(settings: &Settings, repo: &RepoRef, sync: &S) -> RepoReport
where
    S: WorkspaceSync,
{
    let name = repo.short_name();
    info!(url = %repo.url, name = %name, "Processing repository");

    let (repo_root, sync_ok) = match sync.sync(repo, &settings.workspace_dir).await {
        Ok(path) => (path, true),
        Err(e) => {
            // Known weak point, preserved deliberately: the sync failure is
            // surfaced as a warning but the pipeline proceeds over whatever
            // tree (possibly empty or stale) exists on disk.
            let fallback = working_copy_path(repo, &settings.workspace_dir);
            warn!(
                url = %repo.url,
                error = %e,
                path = %fallback.display(),
                "Working-copy sync failed, continuing with tree on disk"
            );
            (fallback, false)
        }
    };

    let rules = ExclusionRules::for_repo(&repo_root, settings);
    let mut report = RepoReport {
        name: name.clone(),
        url: repo.url.clone(),
        sync_ok,
        included: Vec::new(),
        excluded: Vec::new(),
        failed: Vec::new(),
        artifact: None,
    };

    for path in collect_files(&repo_root) {
        match rules.classify(&path, &repo_root) {
            FileOutcome::Included { rel_path, lines } => {
                debug!(path = %rel_path.display(), lines, "Included file");
                report.included.push(rel_path);
            }
            FileOutcome::Excluded { rel_path, reason } => {
                debug!(path = %rel_path.display(), reason = %reason, "Excluded file");
                report.excluded.push((rel_path, reason));
            }
            FileOutcome::Failed { rel_path, error } => {
                warn!(path = %rel_path.display(), error = %error, "Dropped unreadable file");
                report.failed.push((rel_path, error));
            }
        }
    }

    match render::render_artifact(
        &name,
        &repo_root,
        &report.included,
        settings.format,
        &settings.output_dir,
    ) {
        Ok(artifact) => {
            info!(
                name = %name,
                included = report.included.len(),
                excluded = report.excluded.len(),
                artifact = %artifact.display(),
                "Repository processed"
            );
            report.artifact = Some(artifact);
        }
        Err(e) => {
            warn!(name = %name, error = %e, "Failed to write artifact, continuing with next repository");
        }
    }

    report
}
