use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::locate::default_search_paths;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub keg: KegConfig,
}

/// Selects log format and verbosity.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Some(Environment::Production),
            "development" | "dev" => Some(Environment::Development),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Answer a missing entry with `200` and an error body instead of `404`.
    #[serde(default)]
    pub compat_missing_entry_200: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            compat_missing_entry_200: false,
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_clone_base")]
    pub clone_base: String,
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            clone_base: default_clone_base(),
            token: None,
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}
fn default_clone_base() -> String {
    "https://github.com".to_string()
}

impl GithubConfig {
    /// The provider token, if one is set and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            git_binary: default_git_binary(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_git_binary() -> String {
    "git".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct KegConfig {
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<String>,
}

impl Default for KegConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
        }
    }
}

impl Config {
    /// Overlays `KEGEYE_ENV`, `GITHUB_TOKEN` and `KEGEYE_BIND` from the
    /// process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Like [`Config::apply_env`], reading variables through `lookup`.
    pub fn apply_env_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(name) = lookup("KEGEYE_ENV") {
            self.environment = Environment::from_name(&name).with_context(|| {
                format!(
                    "KEGEYE_ENV must be 'production' or 'development', got '{}'",
                    name
                )
            })?;
        }
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(bind) = lookup("KEGEYE_BIND") {
            self.server.bind = bind;
        }
        validate(&self)?;
        Ok(self)
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    if config.fetch.git_binary.trim().is_empty() {
        anyhow::bail!("fetch.git_binary must not be empty");
    }

    if config.keg.search_paths.is_empty() {
        anyhow::bail!("keg.search_paths must list at least one directory");
    }

    if config.github.api_url.trim().is_empty() || config.github.clone_base.trim().is_empty() {
        anyhow::bail!("github.api_url and github.clone_base must not be empty");
    }

    Ok(())
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.environment, Environment::Development);
        assert_eq!(cfg.server.bind, "0.0.0.0:8080");
        assert!(!cfg.server.compat_missing_entry_200);
        assert_eq!(cfg.github.api_url, "https://api.github.com");
        assert_eq!(cfg.github.token(), None);
        assert_eq!(cfg.fetch.timeout_secs, 60);
        assert_eq!(cfg.keg.search_paths, vec!["".to_string(), "docs".to_string()]);
    }

    #[test]
    fn test_parse_toml() {
        let cfg: Config = toml::from_str(
            r#"
environment = "production"

[server]
bind = "127.0.0.1:9000"
compat_missing_entry_200 = true

[fetch]
timeout_secs = 15

[keg]
search_paths = ["docs", ""]
"#,
        )
        .unwrap();
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.server.bind, "127.0.0.1:9000");
        assert!(cfg.server.compat_missing_entry_200);
        assert_eq!(cfg.fetch.timeout_secs, 15);
        assert_eq!(cfg.fetch.git_binary, "git");
        assert_eq!(cfg.keg.search_paths, vec!["docs".to_string(), "".to_string()]);
        assert_eq!(cfg.github.clone_base, "https://github.com");
    }

    #[test]
    fn test_load_config_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kegeye.toml");
        std::fs::write(&path, "[fetch]\ntimeout_secs = 0\n").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("timeout_secs"));

        std::fs::write(&path, "[keg]\nsearch_paths = []\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/kegeye.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_env_overlay() {
        let cfg = Config::default()
            .apply_env_with(env(&[
                ("KEGEYE_ENV", "production"),
                ("GITHUB_TOKEN", "ghp_example"),
                ("KEGEYE_BIND", "127.0.0.1:1234"),
            ]))
            .unwrap();
        assert_eq!(cfg.environment, Environment::Production);
        assert_eq!(cfg.github.token(), Some("ghp_example"));
        assert_eq!(cfg.server.bind, "127.0.0.1:1234");
    }

    #[test]
    fn test_blank_token_counts_as_absent() {
        let cfg = Config::default()
            .apply_env_with(env(&[("GITHUB_TOKEN", "  ")]))
            .unwrap();
        assert_eq!(cfg.github.token(), None);
    }

    #[test]
    fn test_bad_environment_name() {
        let err = Config::default()
            .apply_env_with(env(&[("KEGEYE_ENV", "staging")]))
            .unwrap_err();
        assert!(err.to_string().contains("KEGEYE_ENV"));
    }
}
