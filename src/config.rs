//! Configuration loading.
//!
//! Values come from an optional TOML file, then `RUYI_BACKEND_*` environment
//! variables, with `__` separating nesting levels
//! (e.g. `RUYI_BACKEND_CLI__RELEASE_WORKER__RSYNC_REMOTE_URL`).

use crate::error::{Result, SyncError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "RUYI_BACKEND_";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug: bool,
    pub github: GitHubConfig,
    pub cli: CliConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_token: Option<String>,
    pub base_url: String,
    pub user_agent: String,
    /// Repository whose releases are mirrored, as `owner/name`
    pub ruyi_pm_repo: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            base_url: "https://api.github.com".to_string(),
            user_agent: format!("ruyi-backend/{}", env!("CARGO_PKG_VERSION")),
            ruyi_pm_repo: "ruyisdk/ruyi".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub release_worker: ReleaseWorkerConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReleaseWorkerConfig {
    pub rsync_staging_dir: String,
    pub rsync_remote_url: String,
    pub rsync_remote_pass: Option<String>,
}

impl ReleaseWorkerConfig {
    /// Check that the worker has everything it needs before touching any release.
    pub fn validate(&self) -> Result<()> {
        if self.rsync_staging_dir.is_empty() {
            return Err(SyncError::Config(
                "rsync staging directory is not configured".to_string(),
            ));
        }
        if self.rsync_remote_url.is_empty() {
            return Err(SyncError::Config(
                "rsync remote URL is not configured".to_string(),
            ));
        }
        Ok(())
    }

    /// The remote password, treating an empty value as unset
    pub fn remote_password(&self) -> Option<&str> {
        self.rsync_remote_pass.as_deref().filter(|p| !p.is_empty())
    }
}

impl Config {
    /// Load from an optional TOML file, then apply overrides from the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.apply_env(std::env::vars())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
        Self::from_toml(&text)
            .map_err(|e| SyncError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Apply `RUYI_BACKEND_*` overrides from the given variables.
    ///
    /// Keys are matched case-insensitively; unknown keys are ignored.
    pub fn apply_env<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (key, value) in vars {
            let key = key.as_ref().to_ascii_uppercase();
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value: String = value.into();

            match name {
                "DEBUG" => self.debug = parse_bool(&key, &value)?,
                "GITHUB__API_TOKEN" => self.github.api_token = Some(value),
                "GITHUB__BASE_URL" => self.github.base_url = value,
                "GITHUB__USER_AGENT" => self.github.user_agent = value,
                "GITHUB__RUYI_PM_REPO" => self.github.ruyi_pm_repo = value,
                "CLI__RELEASE_WORKER__RSYNC_STAGING_DIR" => {
                    self.cli.release_worker.rsync_staging_dir = value
                }
                "CLI__RELEASE_WORKER__RSYNC_REMOTE_URL" => {
                    self.cli.release_worker.rsync_remote_url = value
                }
                "CLI__RELEASE_WORKER__RSYNC_REMOTE_PASS" => {
                    self.cli.release_worker.rsync_remote_pass = Some(value)
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/ruyi-backend/config.toml`, or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("ruyi-backend").join("config.toml"))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(SyncError::Config(format!(
            "{}: expected a boolean, got {:?}",
            key, other
        ))),
    }
}
