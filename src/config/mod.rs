//! Configuration management.
//!
//! Every setting resolves through the same priority chain:
//!
//! 1. Explicit CLI flag
//! 2. Environment variable
//! 3. Config file (`$ARENA_CONFIG`, else `~/.arena/config.json`)
//! 4. Built-in default (where one exists)
//!
//! Settings without a default (token, username, model pool) are a
//! configuration error when absent.

mod store;

pub use store::{DEFAULT_PATH_PREFIX, StoreBackend, StoreConfig, parse_store_config};

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default output directory for ledgers.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// A bearer credential.
///
/// `Debug` never prints the secret, so credentials can sit in structs that
/// get logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// The raw secret, for building an `Authorization` header.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Contents of the optional config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub llm_models: Option<String>,
    pub output_dir: Option<PathBuf>,
    /// Remote store configuration, same shape as `--remote-store`.
    pub remote_store: Option<serde_json::Value>,
    pub agent_command: Option<String>,
    pub agent_class: Option<String>,
    pub max_iterations: Option<u32>,
}

/// Get the config file path.
fn config_path() -> Option<PathBuf> {
    if let Some(path) = env_var("ARENA_CONFIG") {
        return Some(PathBuf::from(path));
    }
    directories::BaseDirs::new().map(|b| b.home_dir().join(".arena").join("config.json"))
}

/// Load the config file, or defaults if there is none.
///
/// # Errors
///
/// Returns a configuration error if the file exists but cannot be read or
/// parsed.
pub fn load_config() -> Result<ArenaConfig> {
    match config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(ArenaConfig::default()),
    }
}

/// Load a config file from an explicit path.
///
/// # Errors
///
/// Returns a configuration error if the file exists but cannot be read or
/// parsed.
pub fn load_config_from(path: &Path) -> Result<ArenaConfig> {
    if !path.exists() {
        return Ok(ArenaConfig::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Configuration(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Configuration(format!("Failed to parse config file {}: {e}", path.display())))
}

/// Read an environment variable, treating empty as unset.
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// First non-blank value in priority order.
fn first_set<I>(candidates: I) -> Option<String>
where
    I: IntoIterator<Item = Option<String>>,
{
    candidates
        .into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

/// Resolve the GitHub token: `--token` > `GITHUB_TOKEN`.
///
/// # Errors
///
/// Returns a configuration error if neither is set.
pub fn resolve_github_token(flag: Option<&str>) -> Result<Credential> {
    first_set([flag.map(String::from), env_var("GITHUB_TOKEN")])
        .map(Credential::new)
        .ok_or_else(|| {
            Error::Configuration(
                "GitHub token is not set, set via --token or GITHUB_TOKEN environment variable"
                    .to_string(),
            )
        })
}

/// Resolve the GitHub username: `--username` > `GITHUB_USERNAME`.
///
/// # Errors
///
/// Returns a configuration error if neither is set.
pub fn resolve_username(flag: Option<&str>) -> Result<String> {
    first_set([flag.map(String::from), env_var("GITHUB_USERNAME")]).ok_or_else(|| {
        Error::Configuration(
            "GitHub username is not set, set via --username or GITHUB_USERNAME".to_string(),
        )
    })
}

/// Resolve the raw model pool: `--llm-models` > `LLM_MODELS` > config file.
///
/// # Errors
///
/// Returns a configuration error if no source provides a model list.
pub fn resolve_model_pool(flag: Option<&str>, config: &ArenaConfig) -> Result<String> {
    first_set([
        flag.map(String::from),
        env_var("LLM_MODELS"),
        config.llm_models.clone(),
    ])
    .ok_or_else(|| {
        Error::Configuration(
            "No LLM models provided in either the arguments or environment variables".to_string(),
        )
    })
}

/// Resolve the ledger directory: `--output-dir` > config file > `output`.
#[must_use]
pub fn resolve_output_dir(flag: Option<&Path>, config: &ArenaConfig) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.output_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
}

/// Resolve the agent command: `--agent-command` > `ARENA_AGENT_COMMAND` > config file.
///
/// # Errors
///
/// Returns a configuration error if no agent command is configured.
pub fn resolve_agent_command(flag: Option<&str>, config: &ArenaConfig) -> Result<String> {
    first_set([
        flag.map(String::from),
        env_var("ARENA_AGENT_COMMAND"),
        config.agent_command.clone(),
    ])
    .ok_or_else(|| {
        Error::Configuration(
            "No agent command configured, set via --agent-command or ARENA_AGENT_COMMAND".to_string(),
        )
    })
}

/// Resolve the remote store configuration:
/// `--remote-store` > `REMOTE_STORE_CONFIG` > `FIREBASE_CONFIG` > config file.
///
/// # Errors
///
/// Returns a configuration error if nothing is configured or the JSON is
/// malformed.
pub fn resolve_remote_store(flag: Option<&str>, config: &ArenaConfig) -> Result<StoreConfig> {
    find_remote_store(flag, config)?.ok_or_else(|| {
        Error::Configuration(
            "No remote store configured, set via --remote-store or REMOTE_STORE_CONFIG".to_string(),
        )
    })
}

/// Like [`resolve_remote_store`], but `None` when nothing is configured.
///
/// # Errors
///
/// Returns a configuration error if a configured value is malformed.
pub fn find_remote_store(flag: Option<&str>, config: &ArenaConfig) -> Result<Option<StoreConfig>> {
    first_set([
        flag.map(String::from),
        env_var("REMOTE_STORE_CONFIG"),
        env_var("FIREBASE_CONFIG"),
        config.remote_store.as_ref().map(serde_json::Value::to_string),
    ])
    .map(|raw| parse_store_config(&raw))
    .transpose()
}

/// Resolve the remote store bearer token: config `access_token` > `REMOTE_STORE_TOKEN`.
#[must_use]
pub fn resolve_store_credential(store: &StoreConfig) -> Option<Credential> {
    first_set([store.access_token().map(String::from), env_var("REMOTE_STORE_TOKEN")])
        .map(Credential::new)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_credential_debug_is_redacted() {
        let cred = Credential::new("ghp_secret");
        assert_eq!(format!("{cred:?}"), "Credential(***)");
        assert_eq!(cred.expose(), "ghp_secret");
    }

    #[test]
    fn test_first_set_skips_blank() {
        assert_eq!(
            first_set([None, Some("  ".into()), Some(" b ".into()), Some("c".into())]),
            Some("b".to_string())
        );
        assert_eq!(first_set([None, None]), None);
    }

    #[test]
    fn test_flag_wins_over_everything() {
        let config = ArenaConfig {
            llm_models: Some("from-file".into()),
            agent_command: Some("file-agent".into()),
            ..ArenaConfig::default()
        };

        assert_eq!(resolve_model_pool(Some("a,b"), &config).unwrap(), "a,b");
        assert_eq!(resolve_agent_command(Some("flag-agent"), &config).unwrap(), "flag-agent");
        assert_eq!(resolve_github_token(Some("tok")).unwrap().expose(), "tok");
        assert_eq!(resolve_username(Some("octocat")).unwrap(), "octocat");
    }

    #[test]
    fn test_output_dir_default() {
        let config = ArenaConfig::default();
        assert_eq!(resolve_output_dir(None, &config), PathBuf::from("output"));

        let config = ArenaConfig {
            output_dir: Some(PathBuf::from("/tmp/ledgers")),
            ..ArenaConfig::default()
        };
        assert_eq!(resolve_output_dir(None, &config), PathBuf::from("/tmp/ledgers"));
        assert_eq!(
            resolve_output_dir(Some(Path::new("mine")), &config),
            PathBuf::from("mine")
        );
    }

    #[test]
    fn test_remote_store_from_flag() {
        let store = resolve_remote_store(
            Some(r#"{"mode":"keyed_overwrite","database_url":"https://db.example"}"#),
            &ArenaConfig::default(),
        )
        .unwrap();
        assert!(matches!(store, StoreConfig::KeyedOverwrite { .. }));
    }

    #[test]
    fn test_find_remote_store_rejects_malformed_flag() {
        let err = find_remote_store(Some("{not json"), &ArenaConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_load_config_missing_file_is_default() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config_from(&temp_dir.path().join("nope.json")).unwrap();
        assert!(config.llm_models.is_none());
    }

    #[test]
    fn test_load_config_parses_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"llm_models":"a,b,c","max_iterations":30,"remote_store":{"mode":"keyed_overwrite","database_url":"https://db"}}"#,
        )
        .unwrap();

        let config = load_config_from(&path).unwrap();

        assert_eq!(config.llm_models.as_deref(), Some("a,b,c"));
        assert_eq!(config.max_iterations, Some(30));
        assert!(config.remote_store.is_some());
    }

    #[test]
    fn test_load_config_malformed_is_configuration_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let err = load_config_from(&path).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
}
