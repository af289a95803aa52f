//! Configuration loading
//!
//! This module loads the application configuration from `actionarc.toml` /
//! `actionarc.json` and `ACTIONARC_*` environment overrides.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};
