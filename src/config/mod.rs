//! Configuration management for updraft.
//!
//! All settings live in a single user-wide TOML file, see [`GlobalConfig`].

mod global;

pub use global::{CONFIG_KEYS, CONFIG_PATH_ENV, GlobalConfig, GlobalConfigManager, HostConfig};
