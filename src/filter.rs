//! Exclusion filter: classifies every candidate file under a repository root
//! as included, excluded (with a reason) or failed.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::config::Settings;

/// Version-control metadata directory, never exported.
pub const VCS_DIR: &str = ".git";
/// Per-repository ignore file supplying glob patterns.
pub const IGNORE_FILE: &str = ".gitignore";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ExcludeReason {
    VcsMetadata,
    Extension,
    IgnorePattern,
    TooManyLines,
}

impl fmt::Display for ExcludeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExcludeReason::VcsMetadata => write!(f, "under version-control metadata directory"),
            ExcludeReason::Extension => write!(f, "extension on exclusion list"),
            ExcludeReason::IgnorePattern => write!(f, "matches ignore pattern"),
            ExcludeReason::TooManyLines => write!(f, "line count exceeds maximum"),
        }
    }
}

/// Explicit per-file outcome: nothing is silently swallowed, the pipeline
/// aggregates these into the per-repository report.
#[derive(Debug)]
pub enum FileOutcome {
    Included { rel_path: PathBuf, lines: usize },
    Excluded { rel_path: PathBuf, reason: ExcludeReason },
    Failed { rel_path: PathBuf, error: String },
}

/// Exclusion ruleset for one repository. Rebuilt per repository since the
/// ignore file differs per tree; immutable for the duration of processing.
pub struct ExclusionRules {
    excluded_extensions: HashSet<String>,
    ignore: GlobSet,
    max_lines: usize,
}

impl ExclusionRules {
    /// Reads the repository's ignore file (absence yields an empty pattern
    /// set) and compiles the patterns. Invalid globs are skipped with a
    /// warning rather than failing the repository. The ignore file itself is
    /// always excluded: it configures the export, it is not content.
    pub fn for_repo(repo_root: &Path, settings: &Settings) -> Self {
        let mut builder = GlobSetBuilder::new();
        if let Ok(glob) = Glob::new(IGNORE_FILE) {
            builder.add(glob);
        }
        for pattern in read_ignore_patterns(repo_root) {
            match Glob::new(&pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    warn!(pattern = %pattern, error = %e, "Skipping unparseable ignore pattern");
                }
            }
        }
        let ignore = match builder.build() {
            Ok(set) => set,
            Err(e) => {
                warn!(error = %e, "Failed to build ignore pattern set, ignoring patterns");
                GlobSet::empty()
            }
        };
        Self {
            excluded_extensions: settings.excluded_extensions.clone(),
            ignore,
            max_lines: settings.max_lines,
        }
    }

    /// Applies the rules to one candidate file. The line count is taken from
    /// a lossy text decode, so undecodable bytes never fail a file; only an
    /// unreadable file does, and that is a non-fatal [`FileOutcome::Failed`].
    pub fn classify(&self, path: &Path, repo_root: &Path) -> FileOutcome {
        let rel_path = path
            .strip_prefix(repo_root)
            .unwrap_or(path)
            .to_path_buf();

        if let Some(Component::Normal(first)) = rel_path.components().next() {
            if first == VCS_DIR {
                return FileOutcome::Excluded {
                    rel_path,
                    reason: ExcludeReason::VcsMetadata,
                };
            }
        }

        if let Some(ext) = path.extension() {
            let dotted = format!(".{}", ext.to_string_lossy().to_lowercase());
            if self.excluded_extensions.contains(&dotted) {
                return FileOutcome::Excluded {
                    rel_path,
                    reason: ExcludeReason::Extension,
                };
            }
        }

        let rel_str = rel_path.to_string_lossy().replace('\\', "/");
        let base = rel_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.ignore.is_match(rel_str.as_str()) || self.ignore.is_match(base.as_str()) {
            return FileOutcome::Excluded {
                rel_path,
                reason: ExcludeReason::IgnorePattern,
            };
        }

        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                return FileOutcome::Failed {
                    rel_path,
                    error: e.to_string(),
                }
            }
        };
        let lines = String::from_utf8_lossy(&bytes).lines().count();
        if lines > self.max_lines {
            return FileOutcome::Excluded {
                rel_path,
                reason: ExcludeReason::TooManyLines,
            };
        }

        FileOutcome::Included { rel_path, lines }
    }
}

fn read_ignore_patterns(repo_root: &Path) -> Vec<String> {
    let ignore_path = repo_root.join(IGNORE_FILE);
    let content = match fs::read(&ignore_path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => return Vec::new(),
    };
    let patterns: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_owned)
        .collect();
    debug!(
        count = patterns.len(),
        path = %ignore_path.display(),
        "Read ignore patterns"
    );
    patterns
}

/// Enumerates every regular file under the root in a stable order (sorted
/// per directory, depth-first). A missing root yields the empty set so a
/// failed sync degrades to an empty artifact instead of an abort. The VCS
/// metadata directory is not descended into.
pub fn collect_files(repo_root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    visit_dir(repo_root, &mut files);
    files
}

fn visit_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(path = %dir.display(), error = %e, "Skipping unreadable directory");
            return;
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    paths.sort();
    for path in paths {
        if path.is_dir() {
            if path.file_name().is_some_and(|n| n == VCS_DIR) {
                continue;
            }
            visit_dir(&path, files);
        } else if path.is_file() {
            files.push(path);
        }
    }
}
