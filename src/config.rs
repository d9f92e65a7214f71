//! Configuration for the resolver, the GitHub client and the sync engine.
//!
//! Loaded from a YAML file and passed explicitly to every constructor; nothing
//! here reads the process environment.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::remote::NewRepository;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// GitHub access settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// API token; requests go unauthenticated without one
    pub token: Option<String>,
    /// username recorded as author when the roster lists none
    pub default_user: Option<String>,
    /// REST API base URL
    pub api_url: String,
    /// web base URL, for repository links and git transport
    pub web_url: String,
    /// per-request transport timeout
    pub timeout_secs: u64,
    /// settings for repositories created by `ensure`
    pub new_repository: NewRepository,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            default_user: None,
            api_url: "https://api.github.com".to_string(),
            web_url: "https://github.com".to_string(),
            timeout_secs: 30,
            new_repository: NewRepository::default(),
        }
    }
}

/// Students whose repositories get a reviewer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reviewees {
    pub individual: BTreeSet<String>,
    pub group: BTreeSet<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the roster (tab-separated).
    pub roster: PathBuf,
    pub github: GithubConfig,
    /// File names never copied into student repositories.
    pub exclude: Vec<String>,
    /// Entregas that use the group repository column.
    pub group_entregas: BTreeSet<String>,
    /// Repository new student repositories are seeded from.
    pub skeleton_repo: Option<String>,
    pub reviewees: Reviewees,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roster: PathBuf::from("repos.tsv"),
            github: GithubConfig::default(),
            exclude: vec!["README.md".to_string()],
            group_entregas: ["abb", "hash", "heap", "tp2", "tp3"]
                .into_iter()
                .map(String::from)
                .collect(),
            skeleton_repo: None,
            reviewees: Reviewees::default(),
        }
    }
}

impl Config {
    /// Load a configuration file.
    ///
    /// A relative `roster` path is resolved against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        if config.roster.is_relative() {
            if let Some(dir) = path.parent() {
                config.roster = dir.join(&config.roster);
            }
        }
        Ok(config)
    }

    /// Set the roster path.
    pub fn roster(mut self, path: impl Into<PathBuf>) -> Self {
        self.roster = path.into();
        self
    }

    /// Set the API token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.github.token = Some(token.into());
        self
    }

    /// Set the fallback author.
    pub fn default_user(mut self, user: impl Into<String>) -> Self {
        self.github.default_user = Some(user.into());
        self
    }

    /// Replace the exclusion list.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude = names.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.exclude, vec!["README.md"]);
        assert!(config.group_entregas.contains("tp2"));
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.github.new_repository.private);
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("entregas.yml");
        std::fs::write(
            &path,
            "roster: repos.tsv\n\
             github:\n  token: t0k3n\n  default_user: docente\n\
             exclude: [README.md, .gitignore]\n\
             reviewees:\n  individual: ['54321']\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.roster, dir.path().join("repos.tsv"));
        assert_eq!(config.github.token.as_deref(), Some("t0k3n"));
        assert_eq!(config.github.default_user.as_deref(), Some("docente"));
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.exclude, vec!["README.md", ".gitignore"]);
        assert!(config.reviewees.individual.contains("54321"));
        assert!(config.reviewees.group.is_empty());
    }

    #[test]
    fn test_load_errors_carry_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope.yml");
        assert!(matches!(Config::load(&missing), Err(ConfigError::Io { .. })));

        let broken = dir.path().join("broken.yml");
        std::fs::write(&broken, "exclude: [unterminated\n").unwrap();
        let err = Config::load(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.yml"));
    }

    #[test]
    fn test_builder() {
        let config = Config::default()
            .roster("/srv/repos.tsv")
            .token("abc")
            .default_user("docente")
            .exclude(["README.md", "NOTAS.md"]);
        assert_eq!(config.roster, PathBuf::from("/srv/repos.tsv"));
        assert_eq!(config.github.token.as_deref(), Some("abc"));
        assert_eq!(config.exclude.len(), 2);
    }
}
