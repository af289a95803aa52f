//! Provider registrations for the OAuth flows

use actionarc_common::auth::OAuthConfig;
use actionarc_domain::constants::DEFAULT_REFRESH_THRESHOLD_SECS;

const GRAPH_SCOPES: &[&str] = &[
    "offline_access",
    "openid",
    "profile",
    "email",
    "User.Read",
    "Calendars.ReadWrite",
    "Mail.ReadWrite",
    "Mail.Send",
];

const GOOGLE_SCOPES: &[&str] = &[
    "openid",
    "email",
    "https://www.googleapis.com/auth/calendar",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.send",
];

const SPOTIFY_SCOPES: &[&str] = &[
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "user-read-recently-played",
    "user-top-read",
    "user-library-read",
    "playlist-read-private",
];

/// Configuration for one OAuth provider.
///
/// `provider` doubles as the token cache key, so it must stay stable across
/// releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthSettings {
    pub provider: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub device_authorization_endpoint: Option<String>,
    pub scopes: Vec<String>,
    pub extra_authorize_params: Vec<(String, String)>,
    /// Loopback port for the redirect listener; 0 picks a free one.
    pub redirect_port: u16,
    pub refresh_threshold_seconds: i64,
}

impl OAuthSettings {
    /// Bare registration; the presets below fill in the real endpoints.
    pub fn new(
        provider: impl Into<String>,
        client_id: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        scopes: &[&str],
    ) -> Self {
        Self {
            provider: provider.into(),
            client_id: client_id.into(),
            client_secret: None,
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            device_authorization_endpoint: None,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            extra_authorize_params: Vec::new(),
            redirect_port: 0,
            refresh_threshold_seconds: DEFAULT_REFRESH_THRESHOLD_SECS,
        }
    }

    /// Microsoft identity platform (Graph calendar + mail).
    pub fn microsoft(tenant: &str, client_id: impl Into<String>) -> Self {
        let tenant = if tenant.trim().is_empty() { "common" } else { tenant.trim() };
        let base = format!("https://login.microsoftonline.com/{tenant}/oauth2/v2.0");
        let mut settings = Self::new(
            "microsoft",
            client_id,
            format!("{base}/authorize"),
            format!("{base}/token"),
            GRAPH_SCOPES,
        );
        settings.device_authorization_endpoint = Some(format!("{base}/devicecode"));
        settings
    }

    /// Google installed-app registration (Calendar + Gmail).
    pub fn google(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        let mut settings = Self::new(
            "google",
            client_id,
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
            GOOGLE_SCOPES,
        );
        settings.client_secret = client_secret;
        settings.device_authorization_endpoint =
            Some("https://oauth2.googleapis.com/device/code".to_string());
        // Without these Google only issues a refresh token on the first consent.
        settings.extra_authorize_params = vec![
            ("access_type".to_string(), "offline".to_string()),
            ("prompt".to_string(), "consent".to_string()),
        ];
        settings
    }

    /// Spotify accounts service. No device-code grant is offered.
    pub fn spotify(client_id: impl Into<String>, client_secret: Option<String>) -> Self {
        let mut settings = Self::new(
            "spotify",
            client_id,
            "https://accounts.spotify.com/authorize",
            "https://accounts.spotify.com/api/token",
            SPOTIFY_SCOPES,
        );
        settings.client_secret = client_secret;
        settings
    }

    pub fn with_redirect_port(mut self, port: u16) -> Self {
        self.redirect_port = port;
        self
    }

    pub fn with_refresh_threshold(mut self, seconds: i64) -> Self {
        self.refresh_threshold_seconds = seconds;
        self
    }

    pub fn supports_device_code(&self) -> bool {
        self.device_authorization_endpoint.is_some()
    }

    /// Token endpoint configuration for the shared OAuth client.
    pub fn oauth_config(&self, redirect_uri: &str) -> OAuthConfig {
        let mut config = OAuthConfig::new(
            self.client_id.clone(),
            self.authorization_endpoint.clone(),
            self.token_endpoint.clone(),
            self.scopes.clone(),
        )
        .with_client_secret(self.client_secret.clone())
        .with_redirect_uri(redirect_uri);

        if let Some(endpoint) = &self.device_authorization_endpoint {
            config = config.with_device_authorization_endpoint(endpoint.clone());
        }
        for (key, value) in &self.extra_authorize_params {
            config = config.with_authorize_param(key, value);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microsoft_preset_uses_tenant_and_device_code() {
        let settings = OAuthSettings::microsoft("contoso.onmicrosoft.com", "client");
        assert_eq!(
            settings.token_endpoint,
            "https://login.microsoftonline.com/contoso.onmicrosoft.com/oauth2/v2.0/token"
        );
        assert!(settings.supports_device_code());
        assert!(settings.scopes.iter().any(|s| s == "offline_access"));

        let default_tenant = OAuthSettings::microsoft("", "client");
        assert!(default_tenant.authorization_endpoint.contains("/common/"));
    }

    #[test]
    fn google_preset_requests_offline_access() {
        let settings = OAuthSettings::google("id", Some("secret".into()));
        let config = settings.oauth_config("http://127.0.0.1:1234/callback");
        assert_eq!(config.client_secret.as_deref(), Some("secret"));
        assert!(config
            .extra_authorize_params
            .contains(&("access_type".to_string(), "offline".to_string())));
        assert_eq!(config.redirect_uri, "http://127.0.0.1:1234/callback");
    }

    #[test]
    fn spotify_preset_has_no_device_flow() {
        let settings = OAuthSettings::spotify("id", None).with_redirect_port(8888);
        assert!(!settings.supports_device_code());
        assert_eq!(settings.redirect_port, 8888);
        assert!(settings.scopes.iter().any(|s| s == "user-modify-playback-state"));
    }
}
