//! Log subscriber setup.
//!
//! Production writes JSON lines at `info`; development writes readable
//! text at `debug`. `RUST_LOG`, when set, replaces the default filter.
//! Everything goes to stderr so CLI output on stdout stays parseable.

use tracing_subscriber::EnvFilter;

use crate::config::Environment;

fn default_filter(environment: Environment) -> &'static str {
    match environment {
        Environment::Production => "kegeye=info,tower_http=info",
        Environment::Development => "kegeye=debug,tower_http=debug",
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(environment: Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(environment)));

    let result = match environment {
        Environment::Production => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .try_init(),
        Environment::Development => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(?environment, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filters_parse() {
        for env in [Environment::Production, Environment::Development] {
            assert!(EnvFilter::try_new(default_filter(env)).is_ok());
        }
    }
}
