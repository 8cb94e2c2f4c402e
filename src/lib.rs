//! # kegeye
//!
//! Serve knowledge-management kegs from GitHub repositories as JSON.
//!
//! A keg is a repository convention: a `keg` YAML file at its base
//! directory, a `dex` index of entries, and one directory per numbered
//! entry holding a `README.md`. kegeye shallow-clones a repository, finds
//! the keg, parses it, and serves the descriptor, the dex, and individual
//! entries over HTTP.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────┐   ┌─────────────────┐
//! │  HTTP /  │──▶│   GitHub    │──▶│   git    │──▶│ locate → parse  │
//! │   CLI    │   │ exists? br? │   │ clone -1 │   │ keg / dex / md  │
//! └──────────┘   └─────────────┘   └──────────┘   └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! GITHUB_TOKEN=ghp_... kegeye serve
//! curl localhost:8080/keg/github/rwxrob/zet/dex
//! kegeye node rwxrob/zet 42
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overlay |
//! | [`models`] | Repository references, nodes, keg timestamps |
//! | [`snapshot`] | Read-only commit tree abstraction |
//! | [`connector_git`] | Shallow clone source fetcher |
//! | [`locate`] | Keg base directory discovery |
//! | [`descriptor`] | `keg` YAML descriptor |
//! | [`dex`] | Dex index formats |
//! | [`entry`] | Entry Markdown lookup |
//! | [`keg`] | A keg opened from one snapshot |
//! | [`github`] | Repository existence check |
//! | [`server`] | HTTP server |

pub mod config;
pub mod connector_git;
pub mod descriptor;
pub mod dex;
pub mod entry;
pub mod error;
pub mod github;
pub mod inspect;
pub mod keg;
pub mod locate;
pub mod logging;
pub mod models;
pub mod server;
pub mod snapshot;
