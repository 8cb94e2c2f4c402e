//! Git source fetcher.
//!
//! Clones a repository into a temporary directory and exposes the tip
//! commit's tree as a [`Snapshot`].
//!
//! Workflow:
//! 1. Create a fresh temporary directory (removed when the snapshot drops).
//! 2. `git clone --bare --depth 1 --no-tags`, restricted to one branch when
//!    a branch is given, under the configured timeout. If a branch clone
//!    fails and the remote has no branches at all, the repository is empty.
//! 3. Resolve `HEAD` to a commit hash; no commit means an empty repository.
//! 4. Serve file reads from `<commit>:<path>` with `git cat-file`.
//!
//! No working tree is ever checked out. The clone process is spawned with
//! `kill_on_drop`, so a timed-out or abandoned request stops it.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::process::Command;

use crate::config::FetchConfig;
use crate::error::{KegError, ParseError, Result};
use crate::snapshot::Snapshot;

/// Produces commit snapshots for a clone URL.
///
/// The server holds one of these; tests substitute fixtures.
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Clones `clone_url` at `branch` (or the remote default branch) and
    /// returns its tip commit.
    async fn fetch(&self, clone_url: &str, branch: Option<&str>) -> Result<Box<dyn Snapshot>>;
}

/// [`SourceFetcher`] backed by the `git` binary.
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: String,
    timeout: Duration,
}

impl GitFetcher {
    pub fn new(git: impl Into<String>, timeout: Duration) -> Self {
        Self {
            git: git.into(),
            timeout,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(
            config.git_binary.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Performs one shallow clone attempt.
    pub async fn clone_repo(&self, clone_url: &str, branch: Option<&str>) -> Result<GitSnapshot> {
        let dir = tempfile::Builder::new().prefix("kegeye-").tempdir()?;
        let started = Instant::now();
        tracing::info!(url = %clone_url, branch = ?branch, "cloning repository");

        let mut cmd = Command::new(&self.git);
        cmd.args(clone_args(clone_url, branch, dir.path()))
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                KegError::Fetch(format!("failed to execute '{} clone': {}", self.git, e))
            })?,
            Err(_) => {
                return Err(KegError::Fetch(format!(
                    "git clone timed out after {}s",
                    self.timeout.as_secs()
                )))
            }
        };

        if !output.status.success() {
            // A branch clone of a repository with no commits fails as
            // "remote branch not found"; tell the two apart.
            if branch.is_some() && !self.remote_has_heads(clone_url).await? {
                return Err(KegError::RepositoryEmpty);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KegError::Fetch(format!(
                "git clone failed: {}",
                stderr.trim()
            )));
        }

        let git_dir = dir.path().to_path_buf();
        let commit = head_commit(&self.git, &git_dir).await?;

        tracing::info!(
            url = %clone_url,
            commit = %commit,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "clone complete"
        );

        Ok(GitSnapshot {
            _dir: dir,
            git_dir,
            git: self.git.clone(),
            commit,
        })
    }

    /// Whether the remote advertises any branch at all.
    async fn remote_has_heads(&self, clone_url: &str) -> Result<bool> {
        let mut cmd = Command::new(&self.git);
        cmd.args(["ls-remote", "--heads", "--", clone_url])
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(result) => result.map_err(|e| {
                KegError::Fetch(format!("failed to execute '{} ls-remote': {}", self.git, e))
            })?,
            Err(_) => return Ok(true),
        };

        // An unreachable remote is reported by the clone error itself.
        Ok(!output.status.success() || !output.stdout.iter().all(u8::is_ascii_whitespace))
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, clone_url: &str, branch: Option<&str>) -> Result<Box<dyn Snapshot>> {
        let snapshot = self.clone_repo(clone_url, branch).await?;
        Ok(Box::new(snapshot))
    }
}

/// Arguments for a bare, shallow, tag-less clone into `dest`.
pub fn clone_args(clone_url: &str, branch: Option<&str>, dest: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["clone", "--bare", "--depth", "1", "--no-tags"]
        .into_iter()
        .map(OsString::from)
        .collect();

    if let Some(branch) = branch {
        args.push("--single-branch".into());
        args.push("--branch".into());
        args.push(branch.into());
    }

    args.push("--".into());
    args.push(clone_url.into());
    args.push(dest.as_os_str().to_owned());
    args
}

async fn run_git(git: &str, git_dir: &Path, args: &[&str]) -> Result<Output> {
    let output = Command::new(git)
        .arg("--git-dir")
        .arg(git_dir)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| KegError::Fetch(format!("failed to execute '{}': {}", git, e)))?;
    Ok(output)
}

async fn head_commit(git: &str, git_dir: &Path) -> Result<String> {
    let output = run_git(
        git,
        git_dir,
        &["rev-parse", "--verify", "--quiet", "HEAD^{commit}"],
    )
    .await?;

    if !output.status.success() {
        return Err(KegError::RepositoryEmpty);
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Commit tree of a transient bare clone.
///
/// The clone directory is deleted when this value is dropped.
pub struct GitSnapshot {
    _dir: TempDir,
    git_dir: PathBuf,
    git: String,
    commit: String,
}

impl GitSnapshot {
    /// Location of the bare clone.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    fn object_spec(&self, path: &str) -> Option<String> {
        // `<rev>:./x` and `<rev>:../x` are resolved against the current
        // directory by git; only plain tree paths are accepted.
        if path.is_empty() || path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return None;
        }
        Some(format!("{}:{}", self.commit, path))
    }

    async fn is_blob(&self, spec: &str) -> Result<bool> {
        let output = run_git(&self.git, &self.git_dir, &["cat-file", "-t", spec]).await?;
        Ok(output.status.success() && String::from_utf8_lossy(&output.stdout).trim() == "blob")
    }
}

#[async_trait]
impl Snapshot for GitSnapshot {
    fn commit(&self) -> &str {
        &self.commit
    }

    async fn read_file(&self, path: &str) -> Result<Option<String>> {
        let Some(spec) = self.object_spec(path) else {
            return Ok(None);
        };
        if !self.is_blob(&spec).await? {
            return Ok(None);
        }

        let output = run_git(
            &self.git,
            &self.git_dir,
            &["cat-file", "blob", spec.as_str()],
        )
        .await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(KegError::Fetch(format!(
                "failed to read {}: {}",
                path,
                stderr.trim()
            )));
        }

        let contents = String::from_utf8(output.stdout).map_err(|_| ParseError::NotUtf8 {
            path: path.to_string(),
        })?;
        Ok(Some(contents))
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        match self.object_spec(path) {
            Some(spec) => self.is_blob(&spec).await,
            None => Ok(false),
        }
    }
}
