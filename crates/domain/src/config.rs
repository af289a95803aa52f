//! Configuration structures
//!
//! Every section has defaults so a partial `actionarc.toml` is valid. The
//! infra loader fills these from a file and environment overrides.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_LOOKAHEAD_DAYS, DEFAULT_LOOKBACK_DAYS, DEFAULT_MONTAGE_STARTUP_TIMEOUT_SECS,
    DEFAULT_REDIRECT_TIMEOUT_SECS, DEFAULT_REFRESH_THRESHOLD_SECS, DEFAULT_SYNC_INTERVAL_MINUTES,
};
use crate::impl_domain_status_conversions;

/// Which cloud account backs the calendar or mail agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Microsoft,
    Google,
}

impl_domain_status_conversions!(ProviderKind {
    Microsoft => "microsoft",
    Google => "google",
});

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub calendar: CalendarConfig,
    pub email: EmailConfig,
    pub microsoft: MicrosoftConfig,
    pub google: GoogleConfig,
    pub spotify: SpotifyConfig,
    pub embeddings: EmbeddingsConfig,
    pub montage: MontageConfig,
    pub taskflow: TaskFlowConfig,
    pub oauth: OAuthTimingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding token caches and `userdata.json`.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from(".actionarc") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    pub enabled: bool,
    pub provider: ProviderKind,
    pub sync_interval_minutes: u64,
    pub lookback_days: i64,
    pub lookahead_days: i64,
    /// Rank subject searches with the embedding index instead of token overlap.
    pub use_embeddings: bool,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderKind::Microsoft,
            sync_interval_minutes: DEFAULT_SYNC_INTERVAL_MINUTES,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
            use_embeddings: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    pub provider: ProviderKind,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self { enabled: true, provider: ProviderKind::Microsoft }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MicrosoftConfig {
    pub client_id: String,
    pub tenant: String,
    /// Use the device-code flow instead of a browser redirect.
    pub use_device_code: bool,
}

impl Default for MicrosoftConfig {
    fn default() -> Self {
        Self { client_id: String::new(), tenant: "common".to_string(), use_device_code: false }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpotifyConfig {
    pub enabled: bool,
    pub client_id: String,
    pub client_secret: Option<String>,
    /// Fixed loopback port registered with the Spotify app; 0 picks one.
    pub redirect_port: u16,
    pub default_device: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MontageConfig {
    pub enabled: bool,
    pub command: String,
    pub args: Vec<String>,
    pub startup_timeout_secs: u64,
}

impl Default for MontageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: String::new(),
            args: Vec::new(),
            startup_timeout_secs: DEFAULT_MONTAGE_STARTUP_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskFlowConfig {
    pub enabled: bool,
    pub recipes_dir: PathBuf,
}

impl Default for TaskFlowConfig {
    fn default() -> Self {
        Self { enabled: true, recipes_dir: PathBuf::from("recipes") }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthTimingConfig {
    pub redirect_timeout_secs: u64,
    pub refresh_threshold_seconds: i64,
}

impl Default for OAuthTimingConfig {
    fn default() -> Self {
        Self {
            redirect_timeout_secs: DEFAULT_REDIRECT_TIMEOUT_SECS,
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
[calendar]
provider = "google"

[spotify]
enabled = true
client_id = "abc"
"#,
        )
        .unwrap();

        assert_eq!(config.calendar.provider, ProviderKind::Google);
        assert_eq!(config.calendar.sync_interval_minutes, 30);
        assert_eq!(config.calendar.lookback_days, 15);
        assert_eq!(config.calendar.lookahead_days, 30);
        assert!(config.spotify.enabled);
        assert_eq!(config.microsoft.tenant, "common");
        assert_eq!(config.oauth.refresh_threshold_seconds, 300);
    }

    #[test]
    fn provider_kind_parses_case_insensitively() {
        assert_eq!("Google".parse::<ProviderKind>().unwrap(), ProviderKind::Google);
        assert_eq!(ProviderKind::Microsoft.to_string(), "microsoft");
        assert!("yahoo".parse::<ProviderKind>().is_err());
    }
}
