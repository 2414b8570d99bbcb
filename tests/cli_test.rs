//! End-to-end CLI flows against a data file in a temp project.

mod common;

use std::path::Path;

use clap::Parser;
use tempfile::TempDir;

use treetable::cli::{execute_command, Cli, CliError};
use treetable::domain::{NodeId, NodeKind, TreeError};
use treetable::exitcode;
use treetable::infrastructure::{DataFile, MemorySource};

async fn run(project: &Path, args: &[&str]) -> Result<(), CliError> {
    let dir = project.to_str().unwrap();
    let mut argv = vec!["treetable", "-C", dir];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).expect("valid arguments");
    execute_command(&cli).await
}

fn stored(project: &Path) -> DataFile {
    MemorySource::from_file(&project.join("treetable.json"))
        .unwrap()
        .snapshot()
}

#[tokio::test]
async fn given_empty_project_when_building_tree_then_data_file_reflects_actions() {
    common::init();
    let project = TempDir::new().unwrap();
    let p = project.path();

    run(p, &["create", "last-child", "docs", "--kind", "folder"]).await.unwrap();
    run(p, &["create", "first-child", "readme", "--anchor", "1"]).await.unwrap();
    run(p, &["create", "after", "Notes", "--anchor", "2"]).await.unwrap();
    run(p, &["update", "2", "README"]).await.unwrap();
    run(p, &["move", "3", "#"]).await.unwrap();

    let data = stored(p);
    assert_eq!(data.next_id, 4);
    let notes = data.nodes.iter().find(|n| n.id == NodeId::from("3")).unwrap();
    assert_eq!(notes.parent, None);
    let readme = data.nodes.iter().find(|n| n.id == NodeId::from("2")).unwrap();
    assert_eq!(readme.name, "README");
    assert_eq!(readme.parent, Some(NodeId::from("1")));
    let docs = data.nodes.iter().find(|n| n.id == NodeId::from("1")).unwrap();
    assert_eq!(docs.kind, NodeKind::folder());

    run(p, &["delete", "1", "--yes"]).await.unwrap();

    let data = stored(p);
    assert_eq!(data.nodes.len(), 1);
    assert_eq!(data.nodes[0].name, "Notes");
}

#[tokio::test]
async fn given_move_into_descendant_when_running_then_dataerr_and_file_unchanged() {
    common::init();
    let project = TempDir::new().unwrap();
    let p = project.path();
    run(p, &["create", "last-child", "a", "--kind", "folder"]).await.unwrap();
    run(p, &["create", "last-child", "b", "--anchor", "1"]).await.unwrap();
    let before = stored(p);

    let error = run(p, &["move", "1", "2"]).await.unwrap_err();

    assert!(matches!(
        error,
        CliError::Tree {
            source: TreeError::DescendantViolation { .. },
            ..
        }
    ));
    assert_eq!(error.exit_code(), exitcode::DATAERR);
    assert_eq!(
        error.to_string(),
        "A node cannot be moved into one of its own descendants."
    );
    assert_eq!(stored(p), before);
}

#[tokio::test]
async fn given_unknown_kind_when_creating_then_validation_error() {
    common::init();
    let project = TempDir::new().unwrap();

    let error = run(project.path(), &["create", "last-child", "x", "--kind", "widget"])
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        CliError::Tree {
            source: TreeError::Validation(_),
            ..
        }
    ));
    assert!(!project.path().join("treetable.json").exists());
}

#[tokio::test]
async fn given_remote_flag_without_urls_when_running_then_usage_error() {
    common::init();
    let project = TempDir::new().unwrap();

    let error = run(project.path(), &["--remote", "show"]).await.unwrap_err();

    assert!(matches!(error, CliError::Usage(_)));
    assert_eq!(error.exit_code(), exitcode::USAGE);
}

#[tokio::test]
async fn given_builtin_locales_when_checking_then_all_complete() {
    common::init();
    let project = TempDir::new().unwrap();

    run(project.path(), &["locales", "--check"]).await.unwrap();
    run(project.path(), &["locales", "pt-BR", "--check"]).await.unwrap();
}

#[tokio::test]
async fn given_corrupt_data_file_when_showing_then_dataerr() {
    common::init();
    let project = TempDir::new().unwrap();
    std::fs::write(project.path().join("treetable.json"), "{ not json").unwrap();

    let error = run(project.path(), &["show"]).await.unwrap_err();

    assert_eq!(error.exit_code(), exitcode::DATAERR);
}
