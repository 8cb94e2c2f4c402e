//! Keg inspection from the command line.
//!
//! Runs the same pipeline as the server (clone, locate, parse) for one
//! repository and prints the result to stdout. The repository is cloned
//! from `github.clone_base` directly, so no token is needed.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::connector_git::{GitFetcher, SourceFetcher};
use crate::keg::Keg;
use crate::models::{NodeId, RepoRef};

/// Parses `owner/repo` plus an optional branch.
pub fn repo_ref(slug: &str, branch: Option<String>) -> Result<RepoRef> {
    let repo = RepoRef::parse(slug)?;
    match branch {
        Some(branch) => Ok(repo.with_branch(branch)?),
        None => Ok(repo),
    }
}

/// Clones `repo` and opens its keg.
pub async fn open(config: &Config, repo: &RepoRef) -> Result<Keg> {
    let fetcher = GitFetcher::from_config(&config.fetch);
    let url = repo.clone_url(&config.github.clone_base);

    let snapshot = fetcher
        .fetch(&url, repo.branch())
        .await
        .with_context(|| format!("failed to fetch {}", repo))?;

    let keg = Keg::open(snapshot, &config.keg.search_paths)
        .await
        .with_context(|| format!("failed to locate keg in {}", repo))?;
    Ok(keg)
}

/// `kegeye keg`: prints the descriptor as JSON.
pub async fn run_keg(config: &Config, repo: &RepoRef) -> Result<()> {
    let keg = open(config, repo).await?;
    let descriptor = keg.descriptor().await?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

/// `kegeye dex`: prints the dex (commit, format and nodes) as JSON.
pub async fn run_dex(config: &Config, repo: &RepoRef) -> Result<()> {
    let keg = open(config, repo).await?;
    let dex = keg.dex().await?;
    println!("{}", serde_json::to_string_pretty(&dex)?);
    Ok(())
}

/// `kegeye node`: prints an entry's Markdown.
pub async fn run_node(config: &Config, repo: &RepoRef, id: NodeId) -> Result<()> {
    let keg = open(config, repo).await?;
    let markdown = keg.indexed_entry(id).await?;
    print!("{}", markdown);
    if !markdown.ends_with('\n') {
        println!();
    }
    Ok(())
}
