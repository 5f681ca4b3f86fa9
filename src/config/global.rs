//! Global configuration management for updraft.
//!
//! The global configuration file holds the update settings of the host
//! application and the commands used to save state and restart it.
//!
//! # Configuration File Location
//!
//! - **Unix/macOS**: `~/.updraft/config.toml`
//! - **Windows**: `%LOCALAPPDATA%\updraft\config.toml`
//!
//! The location can be overridden with the `UPDRAFT_CONFIG_PATH` environment
//! variable or the `--config` flag.
//!
//! # File Format
//!
//! ```toml
//! [update]
//! update_site = "https://downloads.example.com/updates/"
//! check_on_startup = true
//! runtime_version = "17.0.2"
//!
//! [host]
//! save_command = "myapp --save-all"
//! restart_command = "myapp --relaunch"
//! ```
//!
//! A missing file is equivalent to an empty one.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use url::Url;

use crate::core::UpdateError;
use crate::upgrade::config::UpdateConfig;
use crate::upgrade::resolver::parse_repository_uri;

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "UPDRAFT_CONFIG_PATH";

/// Keys accepted by [`GlobalConfig::set`] and [`GlobalConfig::get`].
pub const CONFIG_KEYS: &[&str] = &[
    "update.update_site",
    "update.check_on_startup",
    "update.runtime_version",
    "update.installed_version",
    "update.staging_dir",
    "host.save_command",
    "host.restart_command",
];

/// Commands the host application exposes for its process lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Shell command that saves all unsaved state. Exit status 0 means saved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_command: Option<String>,

    /// Shell command that relaunches the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_command: Option<String>,
}

/// User-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Update settings.
    #[serde(default)]
    pub update: UpdateConfig,

    /// Process lifecycle hooks.
    #[serde(default, skip_serializing_if = "is_default_host_config")]
    pub host: HostConfig,
}

fn is_default_host_config(config: &HostConfig) -> bool {
    config.save_command.is_none() && config.restart_command.is_none()
}

impl GlobalConfig {
    /// Load from the default location, or return defaults if there is no file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load() -> Result<Self> {
        Self::load_with_optional(None).await
    }

    /// Load from `path` if given, otherwise from [`Self::resolve_path`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load_with_optional(path: Option<PathBuf>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        if path.exists() {
            Self::load_from(&path).await
        } else {
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or contains invalid TOML.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read global config from {}", path.display()))?;

        toml::from_str(&content)
            .map_err(UpdateError::from)
            .with_context(|| format!("Failed to parse global config from {}", path.display()))
    }

    /// Render the configuration as pretty-printed TOML.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::TomlSerError`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String, UpdateError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to a specific file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = self.to_toml_string().context("Failed to serialize global config")?;

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write global config to {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut perms = fs::metadata(path)
                .await
                .with_context(|| format!("Failed to read permissions for {}", path.display()))?
                .permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms).await.with_context(|| {
                format!("Failed to set permissions on {}", path.display())
            })?;
        }

        Ok(())
    }

    /// Platform default location of the configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the home (or local data) directory is unknown.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = if cfg!(target_os = "windows") {
            dirs::data_local_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine local data directory"))?
                .join("updraft")
        } else {
            dirs::home_dir()
                .ok_or_else(|| anyhow::anyhow!("Unable to determine home directory"))?
                .join(".updraft")
        };

        Ok(config_dir.join("config.toml"))
    }

    /// The file to use: `explicit`, then `UPDRAFT_CONFIG_PATH`, then the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the default path is needed but cannot be determined.
    pub fn resolve_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path);
        }
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
            _ => Self::default_path(),
        }
    }

    /// The validated update site.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::InvalidRepositoryUri`] if the site is empty or malformed.
    pub fn repository_uri(&self) -> Result<Url, UpdateError> {
        parse_repository_uri(&self.update.update_site)
    }

    /// Read a setting by its dotted key. Unset optional values yield `None`.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] for an unknown key.
    pub fn get(&self, key: &str) -> Result<Option<String>, UpdateError> {
        let value = match key {
            "update.update_site" => Some(self.update.update_site.clone()),
            "update.check_on_startup" => Some(self.update.check_on_startup.to_string()),
            "update.runtime_version" => self.update.runtime_version.clone(),
            "update.installed_version" => self.update.installed_version.clone(),
            "update.staging_dir" => {
                self.update.staging_dir.as_ref().map(|p| p.display().to_string())
            }
            "host.save_command" => self.host.save_command.clone(),
            "host.restart_command" => self.host.restart_command.clone(),
            _ => return Err(unknown_key(key)),
        };
        Ok(value)
    }

    /// Change a setting by its dotted key. An empty value clears optional settings.
    ///
    /// # Errors
    ///
    /// Returns [`UpdateError::Configuration`] for an unknown key or a value of the
    /// wrong type. The update site is validated before it is stored.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), UpdateError> {
        let optional = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        match key {
            "update.update_site" => {
                let trimmed = value.trim();
                if !trimmed.is_empty() {
                    parse_repository_uri(trimmed)?;
                }
                self.update.update_site = trimmed.to_string();
            }
            "update.check_on_startup" => {
                self.update.check_on_startup =
                    value.trim().parse().map_err(|_| UpdateError::Configuration {
                        message: format!("'{value}' is not a boolean (expected true or false)"),
                    })?;
            }
            "update.runtime_version" => self.update.runtime_version = optional(value),
            "update.installed_version" => self.update.installed_version = optional(value),
            "update.staging_dir" => self.update.staging_dir = optional(value).map(PathBuf::from),
            "host.save_command" => self.host.save_command = optional(value),
            "host.restart_command" => self.host.restart_command = optional(value),
            _ => return Err(unknown_key(key)),
        }
        Ok(())
    }
}

fn unknown_key(key: &str) -> UpdateError {
    UpdateError::Configuration {
        message: format!("Unknown configuration key '{key}' (valid keys: {})", CONFIG_KEYS.join(", ")),
    }
}

/// Caches a loaded [`GlobalConfig`] together with its file location.
///
/// Used where a setting must be changed and written back, such as the
/// check-on-startup toggle of the update prompt.
#[derive(Debug)]
pub struct GlobalConfigManager {
    config: Option<GlobalConfig>,
    path: PathBuf,
}

impl GlobalConfigManager {
    /// Manager for a specific file.
    pub const fn with_path(path: PathBuf) -> Self {
        Self {
            config: None,
            path,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The configuration, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub async fn get(&mut self) -> Result<&GlobalConfig> {
        self.get_mut().await.map(|config| &*config)
    }

    /// Mutable access to the configuration, loading it on first access.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be loaded.
    pub async fn get_mut(&mut self) -> Result<&mut GlobalConfig> {
        let config = match self.config.take() {
            Some(config) => config,
            None if self.path.exists() => GlobalConfig::load_from(&self.path).await?,
            None => GlobalConfig::default(),
        };
        Ok(self.config.insert(config))
    }

    /// Write the cached configuration back to its file. Does nothing if it was
    /// never loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self) -> Result<()> {
        if let Some(config) = &self.config {
            config.save_to(&self.path).await?;
        }
        Ok(())
    }
}
