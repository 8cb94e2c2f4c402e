//! Exercises the git fetcher against repositories created on the fly.
//!
//! Skipped (with a note on stderr) when no `git` binary is available.

use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use kegeye::config::Config;
use kegeye::connector_git::GitFetcher;
use kegeye::error::{KegError, ParseError, Result};
use kegeye::github::{RemoteRepo, RepoProvider};
use kegeye::keg::Keg;
use kegeye::locate::default_search_paths;
use kegeye::models::RepoRef;
use kegeye::server::build_router;
use kegeye::snapshot::Snapshot;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args([
            "-c",
            "user.name=kegeye",
            "-c",
            "user.email=kegeye@example.com",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .current_dir(dir)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn init_repo(dir: &Path) {
    git(dir, &["init", "--quiet"]);
    git(dir, &["symbolic-ref", "HEAD", "refs/heads/main"]);
}

fn file_url(dir: &Path) -> String {
    format!("file://{}", dir.display())
}

/// Repository with a keg under `docs/` on `main` and a root keg on `next`.
fn setup_keg_repo() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    init_repo(root);

    fs::create_dir_all(root.join("docs/dex")).unwrap();
    fs::create_dir_all(root.join("docs/1")).unwrap();
    fs::write(
        root.join("docs/keg"),
        "title: Fixture Keg\nupdated: 2023-01-01 00:00:00Z\n",
    )
    .unwrap();
    fs::write(
        root.join("docs/dex/nodes.tsv"),
        "1\t2023-01-01 00:00:00Z\tFirst\n",
    )
    .unwrap();
    fs::write(root.join("docs/1/README.md"), "# First\n").unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "docs keg"]);

    git(root, &["checkout", "--quiet", "-b", "next"]);
    fs::write(
        root.join("keg"),
        "title: Root Keg\nupdated: 2023-02-01 00:00:00Z\n",
    )
    .unwrap();
    git(root, &["add", "."]);
    git(root, &["commit", "--quiet", "-m", "root keg"]);
    git(root, &["checkout", "--quiet", "main"]);

    tmp
}

fn fetcher() -> GitFetcher {
    GitFetcher::new("git", Duration::from_secs(60))
}

#[tokio::test]
async fn test_fetch_default_branch() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = setup_keg_repo();

    let snapshot = fetcher()
        .clone_repo(&file_url(repo.path()), None)
        .await
        .unwrap();
    assert_eq!(snapshot.commit().len(), 40);
    assert!(snapshot.exists("docs/keg").await.unwrap());
    assert!(!snapshot.exists("keg").await.unwrap());
    assert!(!snapshot.exists("docs").await.unwrap());
    assert!(!snapshot.exists("../docs/keg").await.unwrap());
    assert_eq!(
        snapshot.read_file("docs/1/README.md").await.unwrap().as_deref(),
        Some("# First\n")
    );
    assert_eq!(snapshot.read_file("docs/2/README.md").await.unwrap(), None);

    let keg = Keg::open(Box::new(snapshot), &default_search_paths())
        .await
        .unwrap();
    assert_eq!(keg.base(), "docs");
    assert_eq!(keg.descriptor().await.unwrap().title, "Fixture Keg");
    assert_eq!(keg.dex().await.unwrap().len(), 1);
    assert_eq!(keg.indexed_entry(1).await.unwrap(), "# First\n");
}

#[tokio::test]
async fn test_fetch_named_branch() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = setup_keg_repo();

    let snapshot = fetcher()
        .clone_repo(&file_url(repo.path()), Some("next"))
        .await
        .unwrap();
    let keg = Keg::open(Box::new(snapshot), &default_search_paths())
        .await
        .unwrap();
    assert_eq!(keg.base(), "");
    assert_eq!(keg.descriptor().await.unwrap().title, "Root Keg");
}

#[tokio::test]
async fn test_fetch_missing_branch() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = setup_keg_repo();

    let err = fetcher()
        .clone_repo(&file_url(repo.path()), Some("does-not-exist"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, KegError::Fetch(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_fetch_missing_repository() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();

    let err = fetcher()
        .clone_repo(&file_url(&tmp.path().join("nope")), None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, KegError::Fetch(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_fetch_empty_repository() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    init_repo(tmp.path());

    let err = fetcher()
        .clone_repo(&file_url(tmp.path()), None)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, KegError::RepositoryEmpty), "got {:?}", err);
}

#[tokio::test]
async fn test_clone_directory_removed_on_drop() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = setup_keg_repo();

    let snapshot = fetcher()
        .clone_repo(&file_url(repo.path()), None)
        .await
        .unwrap();
    let clone_dir = snapshot.git_dir().to_path_buf();
    assert!(clone_dir.exists());
    assert!(!clone_dir.starts_with(repo.path()));

    drop(snapshot);
    assert!(!clone_dir.exists());
}

#[tokio::test]
async fn test_fetch_empty_repository_named_branch() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    init_repo(tmp.path());

    let err = fetcher()
        .clone_repo(&file_url(tmp.path()), Some("main"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, KegError::RepositoryEmpty), "got {:?}", err);
}

/// Provider that reports every repository as living at one local URL.
struct LocalProvider {
    clone_url: String,
}

#[async_trait]
impl RepoProvider for LocalProvider {
    async fn lookup(&self, _repo: &RepoRef) -> Result<RemoteRepo> {
        Ok(RemoteRepo {
            clone_url: self.clone_url.clone(),
            default_branch: "main".to_string(),
        })
    }
}

#[tokio::test]
async fn test_empty_repository_over_http() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let tmp = TempDir::new().unwrap();
    init_repo(tmp.path());

    let router = build_router(
        Arc::new(Config::default()),
        Some(Arc::new(LocalProvider {
            clone_url: file_url(tmp.path()),
        })),
        Arc::new(fetcher()),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let resp = reqwest::get(format!("http://{}/keg/github/example/empty", addr))
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "fetch_error");
    assert_eq!(body["error"], "repository has no commits");
}

#[tokio::test]
async fn test_non_utf8_entry_is_rejected() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }
    let repo = setup_keg_repo();
    fs::create_dir_all(repo.path().join("docs/2")).unwrap();
    fs::write(repo.path().join("docs/2/README.md"), [b'#', b' ', 0xff, 0xfe, b'\n']).unwrap();
    git(repo.path(), &["add", "."]);
    git(repo.path(), &["commit", "--quiet", "-m", "binary entry"]);

    let snapshot = fetcher()
        .clone_repo(&file_url(repo.path()), None)
        .await
        .unwrap();
    let err = snapshot.read_file("docs/2/README.md").await.unwrap_err();
    assert!(
        matches!(
            &err,
            KegError::Parse(ParseError::NotUtf8 { path }) if path == "docs/2/README.md"
        ),
        "got {:?}",
        err
    );
}
