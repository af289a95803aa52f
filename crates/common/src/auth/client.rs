//! OAuth 2.0 token endpoint client
//!
//! Covers the three grants the agents rely on:
//! - authorization code with PKCE (browser + loopback redirect)
//! - refresh token
//! - device authorization (RFC 8628) for headless logins

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::pkce::PkceChallenge;
use super::traits::OAuthClientTrait;
use super::types::{DeviceAuthorization, OAuthConfig, OAuthError, TokenResponse, TokenSet};

const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";
const SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum OAuthClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("OAuth error: {0}")]
    OAuth(OAuthError),

    /// Callback `state` did not match the pending request.
    #[error("State mismatch (CSRF): expected {expected}, received {received}")]
    StateMismatch { expected: String, received: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No refresh token available")]
    NoRefreshToken,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Device code expired before the user completed sign-in")]
    DeviceCodeExpired,
}

impl OAuthClientError {
    /// False when repeating the same request cannot succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) => true,
            Self::OAuth(err) => !err.is_invalid_grant(),
            _ => false,
        }
    }
}

/// OAuth 2.0 client for a single provider registration
#[derive(Debug, Clone)]
pub struct OAuthClient {
    config: OAuthConfig,
    http: Client,
    pending: Arc<Mutex<Option<PkceChallenge>>>,
}

impl OAuthClient {
    #[must_use]
    pub fn new(config: OAuthConfig) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        let builder = if std::env::var_os("ACTIONARC_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let http = builder.build().unwrap_or_else(|_| Client::new());

        Self { config, http, pending: Arc::new(Mutex::new(None)) }
    }

    #[must_use]
    pub fn config(&self) -> &OAuthConfig {
        &self.config
    }

    #[must_use]
    pub fn redirect_uri(&self) -> &str {
        &self.config.redirect_uri
    }

    /// Builds the browser authorization URL and remembers the PKCE pair.
    ///
    /// Returns `(url, state)`; the state must come back on the redirect.
    pub async fn authorization_url(&self) -> Result<(String, String), OAuthClientError> {
        if self.config.redirect_uri.is_empty() {
            return Err(OAuthClientError::Config("redirect_uri is not set".to_string()));
        }

        let challenge = PkceChallenge::generate();
        let state = challenge.state.clone();

        let mut params = vec![
            ("response_type".to_string(), "code".to_string()),
            ("client_id".to_string(), self.config.client_id.clone()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
            ("scope".to_string(), self.config.scope_string()),
            ("state".to_string(), state.clone()),
            ("code_challenge".to_string(), challenge.code_challenge.clone()),
            ("code_challenge_method".to_string(), challenge.challenge_method().to_string()),
        ];
        params.extend(self.config.extra_authorize_params.iter().cloned());

        *self.pending.lock().await = Some(challenge);

        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        Ok((format!("{}?{}", self.config.authorization_endpoint, query), state))
    }

    /// Exchanges the redirect's `code` after validating `state`.
    pub async fn exchange_code(&self, code: &str, state: &str) -> Result<TokenSet, OAuthClientError> {
        let challenge = self
            .pending
            .lock()
            .await
            .take()
            .ok_or_else(|| OAuthClientError::Config("No PKCE challenge pending".to_string()))?;

        if challenge.state != state {
            return Err(OAuthClientError::StateMismatch {
                expected: challenge.state,
                received: state.to_string(),
            });
        }

        let mut form = vec![
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("code".to_string(), code.to_string()),
            ("redirect_uri".to_string(), self.config.redirect_uri.clone()),
            ("code_verifier".to_string(), challenge.code_verifier),
        ];
        self.push_client_params(&mut form);

        let tokens = self.token_request(&form).await?;
        info!(endpoint = %self.config.token_endpoint, "authorization code exchanged");
        Ok(tokens)
    }

    /// Refreshes an access token.
    ///
    /// Providers that do not rotate refresh tokens omit one from the
    /// response; the caller's token is carried over in that case.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, OAuthClientError> {
        if refresh_token.is_empty() {
            return Err(OAuthClientError::NoRefreshToken);
        }

        let mut form = vec![
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("refresh_token".to_string(), refresh_token.to_string()),
        ];
        if !self.config.scopes.is_empty() {
            form.push(("scope".to_string(), self.config.scope_string()));
        }
        self.push_client_params(&mut form);

        let mut tokens = self.token_request(&form).await?;
        if tokens.refresh_token.is_none() {
            tokens.refresh_token = Some(refresh_token.to_string());
        }
        debug!(expires_in = tokens.expires_in, "access token refreshed");
        Ok(tokens)
    }

    /// Starts a device-code login.
    pub async fn start_device_authorization(
        &self,
    ) -> Result<DeviceAuthorization, OAuthClientError> {
        let endpoint = self.config.device_authorization_endpoint.as_ref().ok_or_else(|| {
            OAuthClientError::Config("provider has no device authorization endpoint".to_string())
        })?;

        let mut form = vec![("scope".to_string(), self.config.scope_string())];
        self.push_client_params(&mut form);

        let response = self.http.post(endpoint).form(&form).send().await?;
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        response.json().await.map_err(|e| OAuthClientError::Parse(e.to_string()))
    }

    /// Polls the token endpoint until the user approves the device code.
    ///
    /// `authorization_pending` keeps polling, `slow_down` widens the interval
    /// by five seconds, anything else ends the login.
    pub async fn poll_device_token(
        &self,
        device_code: &str,
        interval: Duration,
        expires_in: Duration,
    ) -> Result<TokenSet, OAuthClientError> {
        let deadline = tokio::time::Instant::now() + expires_in;
        let mut interval = interval;

        let mut form = vec![
            ("grant_type".to_string(), DEVICE_CODE_GRANT.to_string()),
            ("device_code".to_string(), device_code.to_string()),
        ];
        self.push_client_params(&mut form);

        loop {
            if tokio::time::Instant::now() + interval > deadline {
                return Err(OAuthClientError::DeviceCodeExpired);
            }
            tokio::time::sleep(interval).await;

            match self.token_request(&form).await {
                Ok(tokens) => {
                    info!("device code approved");
                    return Ok(tokens);
                }
                Err(OAuthClientError::OAuth(err)) if err.is_authorization_pending() => {
                    debug!("device code still pending");
                }
                Err(OAuthClientError::OAuth(err)) if err.is_slow_down() => {
                    interval += SLOW_DOWN_INCREMENT;
                    warn!(interval_secs = interval.as_secs(), "device code polling slowed down");
                }
                Err(OAuthClientError::OAuth(err)) if err.error == "expired_token" => {
                    return Err(OAuthClientError::DeviceCodeExpired);
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn push_client_params(&self, form: &mut Vec<(String, String)>) {
        form.push(("client_id".to_string(), self.config.client_id.clone()));
        if let Some(secret) = &self.config.client_secret {
            form.push(("client_secret".to_string(), secret.clone()));
        }
        form.extend(self.config.extra_token_params.iter().cloned());
    }

    async fn token_request(&self, form: &[(String, String)]) -> Result<TokenSet, OAuthClientError> {
        let response = self.http.post(&self.config.token_endpoint).form(form).send().await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let token_response: TokenResponse =
            response.json().await.map_err(|e| OAuthClientError::Parse(e.to_string()))?;
        Ok(token_response.into())
    }

    async fn error_from_response(response: reqwest::Response) -> OAuthClientError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<OAuthError>(&body) {
            Ok(err) => OAuthClientError::OAuth(err),
            Err(_) => OAuthClientError::Parse(format!("token endpoint returned {status}: {body}")),
        }
    }
}

#[async_trait]
impl OAuthClientTrait for OAuthClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, OAuthClientError> {
        OAuthClient::refresh(self, refresh_token).await
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for auth::client.
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn config_for(server: &MockServer) -> OAuthConfig {
        OAuthConfig::new(
            "test_client_id",
            format!("{}/authorize", server.uri()),
            format!("{}/token", server.uri()),
            vec!["openid".to_string(), "offline_access".to_string()],
        )
        .with_device_authorization_endpoint(format!("{}/devicecode", server.uri()))
        .with_redirect_uri("http://127.0.0.1:8765/callback")
    }

    /// Validates the authorization URL carries PKCE and state.
    ///
    /// Assertions:
    /// - URL starts at the configured authorize endpoint.
    /// - `code_challenge_method=S256` and the returned state are present.
    /// - Scopes are URL-encoded.
    #[tokio::test]
    async fn test_authorization_url() {
        let server = MockServer::start().await;
        let client = OAuthClient::new(config_for(&server));

        let (url, state) = client.authorization_url().await.unwrap();

        assert!(url.starts_with(&format!("{}/authorize?", server.uri())));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains(&format!("state={state}")));
        assert!(url.contains("scope=openid%20offline_access"));
    }

    /// Validates that a mismatched state is rejected before any network call.
    ///
    /// Assertions:
    /// - Returns `StateMismatch`.
    /// - The token endpoint receives no request.
    #[tokio::test]
    async fn test_state_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let client = OAuthClient::new(config_for(&server));

        client.authorization_url().await.unwrap();
        let result = client.exchange_code("code", "forged").await;

        assert!(matches!(result, Err(OAuthClientError::StateMismatch { .. })));
    }

    /// Validates the code exchange posts the verifier.
    ///
    /// Assertions:
    /// - Request body carries `grant_type=authorization_code` and a verifier.
    /// - Response tokens are returned.
    #[tokio::test]
    async fn test_exchange_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code_verifier="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at",
                "refresh_token": "rt",
                "token_type": "Bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        let client = OAuthClient::new(config_for(&server));

        let (_, state) = client.authorization_url().await.unwrap();
        let tokens = client.exchange_code("the-code", &state).await.unwrap();

        assert_eq!(tokens.access_token, "at");
        assert_eq!(tokens.refresh_token.as_deref(), Some("rt"));
    }

    /// Validates refresh keeps a non-rotated refresh token.
    ///
    /// Assertions:
    /// - The new access token is returned.
    /// - The original refresh token is carried over.
    #[tokio::test]
    async fn test_refresh_keeps_refresh_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "fresh",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        let client = OAuthClient::new(config_for(&server));

        let tokens = client.refresh("old-refresh").await.unwrap();

        assert_eq!(tokens.access_token, "fresh");
        assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
    }

    /// Validates OAuth error bodies surface as `OAuthClientError::OAuth`.
    ///
    /// Assertions:
    /// - `invalid_grant` is reported and marked non-retryable.
    /// - An empty refresh token fails fast.
    #[tokio::test]
    async fn test_refresh_invalid_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "revoked"
            })))
            .mount(&server)
            .await;
        let client = OAuthClient::new(config_for(&server));

        let err = client.refresh("dead").await.unwrap_err();
        assert!(matches!(&err, OAuthClientError::OAuth(e) if e.is_invalid_grant()));
        assert!(!err.is_retryable());

        assert!(matches!(client.refresh("").await, Err(OAuthClientError::NoRefreshToken)));
    }

    /// Validates the device flow keeps polling through `authorization_pending`.
    ///
    /// Assertions:
    /// - The device authorization response is parsed.
    /// - Polling returns tokens once the endpoint stops answering pending.
    #[tokio::test]
    async fn test_device_code_flow() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devicecode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "device_code": "dev-123",
                "user_code": "WXYZ-1234",
                "verification_uri": "https://microsoft.com/devicelogin",
                "expires_in": 900,
                "interval": 1,
                "message": "Go sign in"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=dev-123"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "authorization_pending"
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "device-at",
                "refresh_token": "device-rt",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;
        let client = OAuthClient::new(config_for(&server));

        let device = client.start_device_authorization().await.unwrap();
        assert_eq!(device.user_code, "WXYZ-1234");
        assert_eq!(device.instructions(), "Go sign in");

        let tokens = client
            .poll_device_token(
                &device.device_code,
                Duration::from_millis(10),
                Duration::from_secs(5),
            )
            .await
            .unwrap();
        assert_eq!(tokens.access_token, "device-at");
    }

    /// Validates the device flow gives up at the deadline.
    ///
    /// Assertions:
    /// - Returns `DeviceCodeExpired` when the window is shorter than one
    ///   interval.
    #[tokio::test]
    async fn test_device_code_expiry() {
        let server = MockServer::start().await;
        let client = OAuthClient::new(config_for(&server));

        let result = client
            .poll_device_token("dev", Duration::from_millis(50), Duration::from_millis(10))
            .await;
        assert!(matches!(result, Err(OAuthClientError::DeviceCodeExpired)));
    }
}
