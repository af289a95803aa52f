//! OAuth 2.0 types and structures
//!
//! Token sets as persisted in the on-disk cache, the provider endpoint
//! configuration, and the wire shapes of token and device-code responses.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Access and refresh tokens with an absolute expiry
///
/// This is the exact shape written to the token cache. `expires_at` is
/// computed once when the token is issued so a reloaded cache keeps the
/// original deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,

    /// Some providers only issue this on the first grant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// OpenID Connect ID token (JWT)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    #[serde(default = "default_token_type")]
    pub token_type: String,

    /// Lifetime in seconds as reported by the provider
    pub expires_in: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Granted scopes (space-separated)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenSet {
    /// Build a token set whose `expires_at` is `now + expires_in`.
    #[must_use]
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        id_token: Option<String>,
        expires_in: i64,
        scope: Option<String>,
    ) -> Self {
        let expires_at = (expires_in > 0).then(|| Utc::now() + Duration::seconds(expires_in));

        Self {
            access_token,
            refresh_token,
            id_token,
            token_type: default_token_type(),
            expires_in,
            expires_at,
            scope,
        }
    }

    /// True when the token is expired or expires within `threshold_seconds`.
    ///
    /// Tokens without an expiry never count as expired.
    #[must_use]
    pub fn is_expired(&self, threshold_seconds: i64) -> bool {
        self.expires_at
            .map(|expires_at| Utc::now() + Duration::seconds(threshold_seconds) >= expires_at)
            .unwrap_or(false)
    }

    #[must_use]
    pub fn seconds_until_expiry(&self) -> Option<i64> {
        self.expires_at.map(|expires_at| (expires_at - Utc::now()).num_seconds())
    }

    /// Decoded claims of the ID token payload. The signature is not verified.
    #[must_use]
    pub fn id_token_claims(&self) -> Option<Value> {
        let payload = self.id_token.as_deref()?.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Account address from the ID token (`email`, then `preferred_username`).
    #[must_use]
    pub fn account_email(&self) -> Option<String> {
        let claims = self.id_token_claims()?;
        ["email", "preferred_username", "upn"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(Value::as_str))
            .map(str::to_string)
    }
}

/// Token endpoint success response (RFC 6749 section 5.1)
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    pub scope: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

impl From<TokenResponse> for TokenSet {
    fn from(response: TokenResponse) -> Self {
        let mut tokens = Self::new(
            response.access_token,
            response.refresh_token,
            response.id_token,
            response.expires_in,
            response.scope,
        );
        tokens.token_type = response.token_type;
        tokens
    }
}

/// Device authorization response (RFC 8628 section 3.2)
///
/// Google names the URL field `verification_url`; both spellings are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeviceAuthorization {
    pub device_code: String,
    pub user_code: String,
    #[serde(alias = "verification_url")]
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
    /// Human-readable instructions (Microsoft only)
    #[serde(default)]
    pub message: Option<String>,
}

fn default_poll_interval() -> u64 {
    5
}

impl DeviceAuthorization {
    /// Instructions to show the user.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!("Open {} and enter the code {}", self.verification_uri, self.user_code)
        })
    }
}

/// Endpoints and client registration for one OAuth provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthConfig {
    pub client_id: String,

    /// Only confidential or "installed app" registrations (Google) need this.
    pub client_secret: Option<String>,

    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub device_authorization_endpoint: Option<String>,

    /// Loopback redirect; filled in once the callback listener has a port.
    pub redirect_uri: String,

    pub scopes: Vec<String>,

    /// Provider-specific authorize parameters (e.g. `access_type=offline`).
    pub extra_authorize_params: Vec<(String, String)>,

    /// Provider-specific token request parameters.
    pub extra_token_params: Vec<(String, String)>,
}

impl OAuthConfig {
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        authorization_endpoint: impl Into<String>,
        token_endpoint: impl Into<String>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            authorization_endpoint: authorization_endpoint.into(),
            token_endpoint: token_endpoint.into(),
            device_authorization_endpoint: None,
            redirect_uri: String::new(),
            scopes,
            extra_authorize_params: Vec::new(),
            extra_token_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_client_secret(mut self, secret: Option<String>) -> Self {
        self.client_secret = secret.filter(|s| !s.is_empty());
        self
    }

    #[must_use]
    pub fn with_device_authorization_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.device_authorization_endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = redirect_uri.into();
        self
    }

    #[must_use]
    pub fn with_authorize_param(mut self, key: &str, value: &str) -> Self {
        self.extra_authorize_params.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_token_param(mut self, key: &str, value: &str) -> Self {
        self.extra_token_params.push((key.to_string(), value.to_string()));
        self
    }

    #[must_use]
    pub fn scope_string(&self) -> String {
        self.scopes.join(" ")
    }
}

/// Token endpoint error response (RFC 6749 section 5.2)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    pub error: String,
    pub error_description: Option<String>,
}

impl OAuthError {
    /// Device-code polling: user has not finished yet.
    #[must_use]
    pub fn is_authorization_pending(&self) -> bool {
        self.error == "authorization_pending"
    }

    #[must_use]
    pub fn is_slow_down(&self) -> bool {
        self.error == "slow_down"
    }

    /// The grant itself is dead; retrying the same request cannot succeed.
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        self.error == "invalid_grant"
    }
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}
