use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Update settings stored under `[update]` in the global configuration.
///
/// # Default Behavior
///
/// - No update site: runs fail fast with a configuration error until one is set
/// - No check on startup: `updraft startup` does nothing until enabled
/// - Runtime and installed versions come from the build
/// - Updates are staged in the platform cache directory
///
/// ## TOML Example
/// ```toml
/// [update]
/// update_site = "https://downloads.example.com/updates/"
/// check_on_startup = true
/// runtime_version = "17.0.2"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// URI of the update repository (`file://`, `http://` or `https://`).
    ///
    /// An empty value is treated as "not configured".
    #[serde(default)]
    pub update_site: String,

    /// Whether the host should run a silent check when it starts.
    ///
    /// # Default: `false`
    ///
    /// Also toggled from the update confirmation prompt.
    #[serde(default = "default_check_on_startup")]
    pub check_on_startup: bool,

    /// Runtime version the application currently runs on.
    ///
    /// Compared against an update's minimum runtime requirement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_version: Option<String>,

    /// Version of the installed application. Only newer candidates are offered.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,

    /// Directory where downloaded updates are staged.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            update_site: String::new(),
            check_on_startup: default_check_on_startup(),
            runtime_version: None,
            installed_version: None,
            staging_dir: None,
        }
    }
}

const fn default_check_on_startup() -> bool {
    false
}

impl UpdateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configured runtime version, falling back to the toolchain the binary was
    /// built for.
    #[must_use]
    pub fn effective_runtime_version(&self) -> String {
        self.runtime_version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_RUST_VERSION").to_string())
    }

    /// Configured installed version, falling back to this build's version.
    #[must_use]
    pub fn effective_installed_version(&self) -> String {
        self.installed_version
            .clone()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }

    /// Configured staging directory, or `<cache>/updraft/staging`.
    #[must_use]
    pub fn effective_staging_dir(&self) -> PathBuf {
        self.staging_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("updraft")
                .join("staging")
        })
    }

    /// Whether an update site has been configured.
    #[must_use]
    pub fn has_update_site(&self) -> bool {
        !self.update_site.trim().is_empty()
    }
}
