//! Token manager with refresh-before-expiry
//!
//! Manages one account's token lifecycle:
//! - load from the token cache on startup
//! - hand out access tokens, refreshing within the threshold
//! - retry failed refreshes a bounded number of times
//! - persist refreshed tokens and clear them on logout

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::client::OAuthClientError;
use super::token_store::TokenStoreError;
use super::traits::{OAuthClientTrait, TokenStore};
use super::types::TokenSet;

pub const DEFAULT_REFRESH_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum TokenManagerError {
    #[error("Token store error: {0}")]
    Store(#[from] TokenStoreError),

    #[error("OAuth error: {0}")]
    OAuth(#[from] OAuthClientError),

    #[error("Not authenticated (no tokens)")]
    NotAuthenticated,

    #[error("Token refresh failed after {attempts} attempts: {last}")]
    RefreshFailed { attempts: u32, last: OAuthClientError },

    #[error("No refresh token available")]
    NoRefreshToken,
}

pub struct TokenManager<C: OAuthClientTrait + 'static, S: TokenStore + 'static> {
    oauth_client: Arc<C>,
    store: Arc<S>,
    account_name: String,
    current_tokens: RwLock<Option<TokenSet>>,
    refresh_lock: Mutex<()>,
    refresh_threshold_seconds: i64,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<C: OAuthClientTrait + 'static, S: TokenStore + 'static> TokenManager<C, S> {
    /// # Arguments
    /// * `account_name` - token cache key (e.g. `"microsoft"`)
    /// * `refresh_threshold_seconds` - refresh this long before expiry
    #[must_use]
    pub fn new(
        oauth_client: Arc<C>,
        store: Arc<S>,
        account_name: impl Into<String>,
        refresh_threshold_seconds: i64,
    ) -> Self {
        Self {
            oauth_client,
            store,
            account_name: account_name.into(),
            current_tokens: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            refresh_threshold_seconds,
            max_attempts: DEFAULT_REFRESH_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    /// Overrides the refresh retry policy. Delay doubles after each attempt.
    #[must_use]
    pub fn with_retry_policy(mut self, max_attempts: u32, initial_delay: Duration) -> Self {
        self.max_attempts = max_attempts.max(1);
        self.retry_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Loads cached tokens. Returns whether any were found.
    pub async fn initialize(&self) -> Result<bool, TokenManagerError> {
        let cached = self.store.load(&self.account_name).await?;
        let found = cached.is_some();
        *self.current_tokens.write().await = cached;
        debug!(account = %self.account_name, found, "token manager initialized");
        Ok(found)
    }

    /// Persists tokens from a completed login or refresh.
    pub async fn store_tokens(&self, tokens: TokenSet) -> Result<(), TokenManagerError> {
        self.store.save(&self.account_name, &tokens).await?;
        *self.current_tokens.write().await = Some(tokens);
        Ok(())
    }

    /// Returns a valid access token, refreshing first when it is within the
    /// threshold of expiry.
    pub async fn get_access_token(&self) -> Result<String, TokenManagerError> {
        if self.should_refresh().await {
            let _guard = self.refresh_lock.lock().await;
            // Another caller may have refreshed while we waited.
            if self.should_refresh().await {
                self.refresh_tokens().await?;
            }
        }

        self.current_tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
            .ok_or(TokenManagerError::NotAuthenticated)
    }

    pub async fn get_tokens(&self) -> Option<TokenSet> {
        self.current_tokens.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current_tokens.read().await.is_some()
    }

    async fn should_refresh(&self) -> bool {
        self.current_tokens
            .read()
            .await
            .as_ref()
            .is_some_and(|t| t.is_expired(self.refresh_threshold_seconds))
    }

    /// Refreshes now, retrying transient failures with exponential backoff.
    pub async fn refresh_tokens(&self) -> Result<(), TokenManagerError> {
        let refresh_token = {
            let tokens = self.current_tokens.read().await;
            match tokens.as_ref() {
                Some(t) => t.refresh_token.clone().ok_or(TokenManagerError::NoRefreshToken)?,
                None => return Err(TokenManagerError::NotAuthenticated),
            }
        };

        let mut delay = self.retry_delay;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.oauth_client.refresh(&refresh_token).await {
                Ok(new_tokens) => {
                    self.store_tokens(new_tokens).await?;
                    info!(account = %self.account_name, attempt, "access token refreshed");
                    return Ok(());
                }
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        account = %self.account_name,
                        attempt,
                        error = %err,
                        "token refresh failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => {
                    return Err(TokenManagerError::RefreshFailed { attempts: attempt, last: err });
                }
            }
        }
    }

    /// Logout: removes the cache entry and the in-memory copy.
    pub async fn clear_tokens(&self) -> Result<(), TokenManagerError> {
        self.store.delete(&self.account_name).await?;
        *self.current_tokens.write().await = None;
        info!(account = %self.account_name, "tokens cleared");
        Ok(())
    }

    pub async fn seconds_until_expiry(&self) -> Option<i64> {
        self.current_tokens.read().await.as_ref().and_then(TokenSet::seconds_until_expiry)
    }

    #[must_use]
    pub fn refresh_threshold(&self) -> i64 {
        self.refresh_threshold_seconds
    }
}
