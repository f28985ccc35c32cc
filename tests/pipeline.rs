use std::fs::{self, create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::tempdir;

use repo_docs::config::Settings;
use repo_docs::download::{MockWorkspaceSync, SyncFailure};
use repo_docs::load_config::RepoRef;
use repo_docs::render::RenderFormat;
use repo_docs::synchronise::synchronise;
use repo_docs::upload::{MockPublisher, PublishFailure, PublishMode};

fn settings(workspace_dir: &Path, output_dir: &Path, skip_publish: bool) -> Settings {
    Settings {
        workspace_dir: workspace_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        remote: "gdrive".into(),
        remote_folder: "repo-docs".into(),
        max_lines: 250,
        excluded_extensions: Settings::parse_extensions(
            repo_docs::config::DEFAULT_EXCLUDED_EXTENSIONS,
        ),
        format: RenderFormat::Markdown,
        publish_mode: PublishMode::Copy,
        skip_publish,
    }
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).unwrap();
    }
    let mut f = File::create(path).unwrap();
    f.write_all(content.as_bytes()).unwrap();
}

/// A sync stub that never touches the network: it just hands back the
/// deterministic working-copy path, like a successful update would.
fn local_tree_sync() -> MockWorkspaceSync {
    let mut sync = MockWorkspaceSync::new();
    sync.expect_sync()
        .returning(|repo, workspace_dir| Ok(workspace_dir.join(repo.short_name())));
    sync
}

#[tokio::test]
async fn empty_repo_list_processes_nothing_but_still_publishes() {
    let tmp = tempdir().unwrap();
    let settings = settings(&tmp.path().join("ws"), &tmp.path().join("out"), false);

    let sync = MockWorkspaceSync::new();
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| Ok(()));

    let report = synchronise(&settings, &[], &sync, &publisher).await;
    assert!(report.repos.is_empty());
    assert!(report.published);
}

#[tokio::test]
async fn skip_flag_suppresses_the_publish_step() {
    let tmp = tempdir().unwrap();
    let settings = settings(&tmp.path().join("ws"), &tmp.path().join("out"), true);

    let sync = MockWorkspaceSync::new();
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(0);

    let report = synchronise(&settings, &[], &sync, &publisher).await;
    assert!(!report.published);
}

#[tokio::test]
async fn failed_sync_degrades_to_an_empty_artifact_not_an_abort() {
    let tmp = tempdir().unwrap();
    let workspace = tmp.path().join("ws");
    let out = tmp.path().join("out");
    let settings = settings(&workspace, &out, true);

    let mut sync = MockWorkspaceSync::new();
    sync.expect_sync().returning(|_, _| {
        Err(SyncFailure::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "network down",
        )))
    });
    let publisher = MockPublisher::new();

    let repos = vec![RepoRef::new("https://example.com/ghost.git")];
    let report = synchronise(&settings, &repos, &sync, &publisher).await;

    assert_eq!(report.repos.len(), 1);
    let repo = &report.repos[0];
    assert!(!repo.sync_ok);
    assert!(repo.included.is_empty());
    let artifact = repo.artifact.as_ref().expect("artifact still written");
    assert_eq!(artifact, &out.join("ghost.md"));
    assert_eq!(fs::read_to_string(artifact).unwrap(), "");
}

#[tokio::test]
async fn pipeline_filters_and_aggregates_a_prepared_tree() {
    let tmp = tempdir().unwrap();
    let workspace = tmp.path().join("ws");
    let out = tmp.path().join("out");
    let settings = settings(&workspace, &out, false);

    write_file(&workspace.join("widget/README.md"), "hello widget\n");
    write_file(&workspace.join("widget/logo.png"), "binary");
    write_file(&workspace.join("widget/.gitignore"), "*.log\n");
    write_file(&workspace.join("widget/build.log"), "noise\n");

    let sync = local_tree_sync();
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| Ok(()));

    let repos = vec![RepoRef::new("https://github.com/acme/widget.git")];
    let report = synchronise(&settings, &repos, &sync, &publisher).await;

    assert!(report.published);
    let repo = &report.repos[0];
    assert!(repo.sync_ok);
    assert_eq!(repo.included, vec![PathBuf::from("README.md")]);
    assert_eq!(repo.excluded.len(), 3);

    let rendered = fs::read_to_string(out.join("widget.md")).unwrap();
    assert!(rendered.contains("## README.md"));
    assert!(rendered.contains("hello widget"));
}

#[tokio::test]
async fn repos_with_the_same_short_name_overwrite_one_artifact() {
    let tmp = tempdir().unwrap();
    let workspace = tmp.path().join("ws");
    let out = tmp.path().join("out");
    let settings = settings(&workspace, &out, true);

    write_file(&workspace.join("common/tool.rs"), "fn tool() {}\n");

    let sync = local_tree_sync();
    let publisher = MockPublisher::new();

    // Differing URLs, identical derived short name: documented collision.
    let repos = vec![
        RepoRef::new("https://a.example/tools/common.git"),
        RepoRef::new("git@b.example:infra/common.git"),
    ];
    let report = synchronise(&settings, &repos, &sync, &publisher).await;

    assert_eq!(report.repos.len(), 2);
    let expected = out.join("common.md");
    for repo in &report.repos {
        assert_eq!(repo.name, "common");
        assert_eq!(repo.artifact.as_deref(), Some(expected.as_path()));
    }
    let artifacts: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(artifacts.len(), 1);
}

#[tokio::test]
async fn publish_failure_is_recorded_but_the_run_still_completes() {
    let tmp = tempdir().unwrap();
    let settings = settings(&tmp.path().join("ws"), &tmp.path().join("out"), false);

    let sync = MockWorkspaceSync::new();
    let mut publisher = MockPublisher::new();
    publisher.expect_publish().times(1).returning(|_| {
        Err(PublishFailure::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "rclone not installed",
        )))
    });

    let report = synchronise(&settings, &[], &sync, &publisher).await;
    assert!(!report.published);
}
