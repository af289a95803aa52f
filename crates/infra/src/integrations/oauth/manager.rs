//! Per-provider sign-in and token access
//!
//! Wraps the shared OAuth core with the two interactive flows the CLI
//! offers and exposes the result as an [`AccessTokenSource`] for the REST
//! clients.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use actionarc_common::auth::{DeviceAuthorization, FileTokenStore, OAuthClient, TokenManager, TokenSet};
use actionarc_core::AccessTokenSource;
use actionarc_domain::constants::{DEFAULT_REDIRECT_TIMEOUT_SECS, TOKEN_CACHE_DIR};
use actionarc_domain::{ActionArcError, Result};
use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{info, instrument};

use super::callback::OAuthCallbackServer;
use super::settings::OAuthSettings;
use crate::errors::InfraError;

/// Sign-in state for one provider account
///
/// Tokens live in `<data_dir>/tokens/<provider>.json` and are loaded
/// lazily on first use.
pub struct OAuthManager {
    settings: OAuthSettings,
    tokens: TokenManager<OAuthClient, FileTokenStore>,
    loaded: OnceCell<()>,
    redirect_timeout: Duration,
}

impl OAuthManager {
    pub fn new(settings: OAuthSettings, data_dir: &Path) -> Self {
        let store = FileTokenStore::new(data_dir.join(TOKEN_CACHE_DIR));
        Self::with_store(settings, store)
    }

    pub fn with_store(settings: OAuthSettings, store: FileTokenStore) -> Self {
        let client = OAuthClient::new(settings.oauth_config(""));
        let tokens = TokenManager::new(
            Arc::new(client),
            Arc::new(store),
            settings.provider.clone(),
            settings.refresh_threshold_seconds,
        );

        Self {
            settings,
            tokens,
            loaded: OnceCell::new(),
            redirect_timeout: Duration::from_secs(DEFAULT_REDIRECT_TIMEOUT_SECS),
        }
    }

    /// How long the loopback listener waits for the browser redirect.
    pub fn with_redirect_timeout(mut self, timeout: Duration) -> Self {
        self.redirect_timeout = timeout;
        self
    }

    pub fn provider(&self) -> &str {
        &self.settings.provider
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    async fn ensure_loaded(&self) -> Result<()> {
        self.loaded
            .get_or_try_init(|| async {
                self.tokens.initialize().await.map(|_| ()).map_err(|e| ActionArcError::from(InfraError::from(e)))
            })
            .await
            .map(|_| ())
    }

    /// Authorization code + PKCE through a loopback redirect.
    ///
    /// `open_url` receives the authorization URL; it is expected to open a
    /// browser or print the link. Returns the signed-in account address when
    /// the provider issued an ID token.
    #[instrument(skip(self, open_url), fields(provider = %self.settings.provider))]
    pub async fn login_interactive<F>(&self, open_url: F) -> Result<Option<String>>
    where
        F: FnOnce(&str),
    {
        let server = OAuthCallbackServer::start(self.settings.redirect_port).await?;
        let client = OAuthClient::new(self.settings.oauth_config(&server.redirect_uri()));

        let (url, state) = client.authorization_url().await.map_err(InfraError::from)?;
        server.set_expected_state(state);
        open_url(&url);

        let waited = server.wait_for_code(self.redirect_timeout).await;
        server.shutdown().await?;
        let (code, state) = waited?;

        let tokens = client.exchange_code(&code, &state).await.map_err(InfraError::from)?;
        self.finish_login(tokens).await
    }

    /// Device authorization grant for machines without a browser.
    ///
    /// `notify` gets the verification URL and user code to display.
    #[instrument(skip(self, notify), fields(provider = %self.settings.provider))]
    pub async fn login_device_code<F>(&self, notify: F) -> Result<Option<String>>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        if !self.settings.supports_device_code() {
            return Err(ActionArcError::Config(format!(
                "{} does not support device-code sign-in",
                self.settings.provider
            )));
        }

        let client = OAuthClient::new(self.settings.oauth_config(""));
        let authorization = client.start_device_authorization().await.map_err(InfraError::from)?;
        notify(&authorization);

        let tokens = client
            .poll_device_token(
                &authorization.device_code,
                Duration::from_secs(authorization.interval),
                Duration::from_secs(authorization.expires_in),
            )
            .await
            .map_err(InfraError::from)?;
        self.finish_login(tokens).await
    }

    async fn finish_login(&self, tokens: TokenSet) -> Result<Option<String>> {
        let account = tokens.account_email();
        self.tokens.store_tokens(tokens).await.map_err(InfraError::from)?;
        // A fresh login supersedes whatever the cache held.
        let _ = self.loaded.set(());
        info!(provider = %self.settings.provider, account = account.as_deref().unwrap_or("-"), "signed in");
        Ok(account)
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        self.ensure_loaded().await?;
        Ok(self.tokens.is_authenticated().await)
    }

    /// Removes the cached tokens.
    pub async fn logout(&self) -> Result<()> {
        self.tokens.clear_tokens().await.map_err(InfraError::from)?;
        let _ = self.loaded.set(());
        Ok(())
    }

    /// Account address from the ID token, if any.
    pub async fn account_email(&self) -> Result<Option<String>> {
        self.ensure_loaded().await?;
        Ok(self.tokens.get_tokens().await.and_then(|t| t.account_email()))
    }

    pub async fn seconds_until_expiry(&self) -> Result<Option<i64>> {
        self.ensure_loaded().await?;
        Ok(self.tokens.seconds_until_expiry().await)
    }
}

#[async_trait]
impl AccessTokenSource for OAuthManager {
    async fn access_token(&self) -> Result<String> {
        self.ensure_loaded().await?;
        self.tokens.get_access_token().await.map_err(|e| InfraError::from(e).into())
    }
}
