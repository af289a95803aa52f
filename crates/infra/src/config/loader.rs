//! Configuration loader
//!
//! Loads application configuration from a file and environment variables.
//!
//! ## Loading Strategy
//! 1. `ACTIONARC_CONFIG` names the file explicitly
//! 2. Otherwise the standard locations are probed (see
//!    [`probe_config_paths`])
//! 3. With no file at all, built-in defaults are used
//! 4. `ACTIONARC_*` environment variables override whatever was loaded
//!
//! ## Environment Variables
//! - `ACTIONARC_CONFIG`: Path to a `.toml` or `.json` config file
//! - `ACTIONARC_DATA_DIR`: Directory for token caches and `userdata.json`
//! - `ACTIONARC_CALENDAR_PROVIDER` / `ACTIONARC_EMAIL_PROVIDER`: `microsoft`
//!   or `google`
//! - `ACTIONARC_CALENDAR_ENABLED` / `ACTIONARC_EMAIL_ENABLED`
//! - `ACTIONARC_SYNC_INTERVAL_MINUTES`: Calendar sync period
//! - `ACTIONARC_USE_EMBEDDINGS`: Embedding-ranked calendar search
//! - `ACTIONARC_MS_CLIENT_ID`, `ACTIONARC_MS_TENANT`
//! - `ACTIONARC_GOOGLE_CLIENT_ID`, `ACTIONARC_GOOGLE_CLIENT_SECRET`
//! - `ACTIONARC_SPOTIFY_CLIENT_ID`, `ACTIONARC_SPOTIFY_CLIENT_SECRET`,
//!   `ACTIONARC_SPOTIFY_ENABLED`
//! - `ACTIONARC_OPENAI_API_KEY` (or `OPENAI_API_KEY`)
//! - `ACTIONARC_MONTAGE_COMMAND`: Enables the montage agent
//! - `ACTIONARC_RECIPES_DIR`: TaskFlow recipe directory
//!
//! Boolean variables accept `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off`.

use std::path::{Path, PathBuf};

use actionarc_domain::{ActionArcError, Config, ProviderKind, Result};

use crate::errors::InfraError;

const CONFIG_ENV: &str = "ACTIONARC_CONFIG";
const FILE_NAMES: [&str; 2] = ["actionarc.toml", "actionarc.json"];

/// Load configuration with the file-then-environment strategy
///
/// # Errors
/// Returns `ActionArcError::Config` if:
/// - `ACTIONARC_CONFIG` names a missing file
/// - The file format is invalid
/// - An environment override has an unparseable value
pub fn load() -> Result<Config> {
    let mut config = match std::env::var_os(CONFIG_ENV) {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::info!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and TOML
/// (detected by file extension).
///
/// # Errors
/// Returns `ActionArcError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) if p.exists() => p,
        Some(p) => {
            return Err(ActionArcError::Config(format!("Config file not found: {}", p.display())))
        }
        None => probe_config_paths().ok_or_else(|| {
            ActionArcError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| ActionArcError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents).map_err(|e| InfraError::from(e).into()),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ActionArcError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(ActionArcError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// Probe the standard locations for a config file
///
/// In order: the current directory and up to two parents, then the
/// executable's directory. Within a directory `actionarc.toml` wins over
/// `actionarc.json`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs: Vec<PathBuf> = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Some(exe_dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

/// Apply `ACTIONARC_*` overrides from the process environment.
///
/// # Errors
/// Returns `ActionArcError::Config` for unparseable values.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    apply_overrides(config, |key| std::env::var(key).ok().filter(|v| !v.is_empty()))
}

fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<()> {
    let flag = |key: &str| var(key).map(|v| parse_bool(&v));

    if let Some(dir) = var("ACTIONARC_DATA_DIR") {
        config.storage.data_dir = PathBuf::from(dir);
    }

    if let Some(provider) = var("ACTIONARC_CALENDAR_PROVIDER") {
        config.calendar.provider = parse_provider(&provider)?;
    }
    if let Some(enabled) = flag("ACTIONARC_CALENDAR_ENABLED") {
        config.calendar.enabled = enabled;
    }
    if let Some(minutes) = var("ACTIONARC_SYNC_INTERVAL_MINUTES") {
        config.calendar.sync_interval_minutes = minutes
            .parse()
            .map_err(|e| ActionArcError::Config(format!("Invalid sync interval: {e}")))?;
    }
    if let Some(enabled) = flag("ACTIONARC_USE_EMBEDDINGS") {
        config.calendar.use_embeddings = enabled;
    }

    if let Some(provider) = var("ACTIONARC_EMAIL_PROVIDER") {
        config.email.provider = parse_provider(&provider)?;
    }
    if let Some(enabled) = flag("ACTIONARC_EMAIL_ENABLED") {
        config.email.enabled = enabled;
    }

    if let Some(id) = var("ACTIONARC_MS_CLIENT_ID") {
        config.microsoft.client_id = id;
    }
    if let Some(tenant) = var("ACTIONARC_MS_TENANT") {
        config.microsoft.tenant = tenant;
    }

    if let Some(id) = var("ACTIONARC_GOOGLE_CLIENT_ID") {
        config.google.client_id = id;
    }
    if let Some(secret) = var("ACTIONARC_GOOGLE_CLIENT_SECRET") {
        config.google.client_secret = Some(secret);
    }

    if let Some(id) = var("ACTIONARC_SPOTIFY_CLIENT_ID") {
        config.spotify.client_id = id;
    }
    if let Some(secret) = var("ACTIONARC_SPOTIFY_CLIENT_SECRET") {
        config.spotify.client_secret = Some(secret);
    }
    if let Some(enabled) = flag("ACTIONARC_SPOTIFY_ENABLED") {
        config.spotify.enabled = enabled;
    }

    if let Some(key) = var("ACTIONARC_OPENAI_API_KEY").or_else(|| var("OPENAI_API_KEY")) {
        config.embeddings.api_key = Some(key);
    }

    if let Some(command) = var("ACTIONARC_MONTAGE_COMMAND") {
        config.montage.command = command;
        config.montage.enabled = true;
    }

    if let Some(dir) = var("ACTIONARC_RECIPES_DIR") {
        config.taskflow.recipes_dir = PathBuf::from(dir);
    }

    Ok(())
}

fn parse_provider(value: &str) -> Result<ProviderKind> {
    value
        .parse::<ProviderKind>()
        .map_err(|_| ActionArcError::Config(format!("Unknown provider: {value}")))
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
