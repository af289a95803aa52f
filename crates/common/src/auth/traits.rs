//! Seams for the token manager
//!
//! The manager only needs two things from the outside world: a way to
//! refresh a token and a place to keep it. Both are traits so tests can
//! swap in the in-memory versions from `testing`.

use async_trait::async_trait;

use super::client::OAuthClientError;
use super::token_store::TokenStoreError;
use super::types::TokenSet;

#[async_trait]
pub trait OAuthClientTrait: Send + Sync {
    /// Exchange a refresh token for a new token set.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenSet, OAuthClientError>;
}

/// Persistent token cache keyed by account name
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// `Ok(None)` when nothing is cached for the account.
    async fn load(&self, account: &str) -> Result<Option<TokenSet>, TokenStoreError>;

    async fn save(&self, account: &str, tokens: &TokenSet) -> Result<(), TokenStoreError>;

    /// Deleting a missing entry is not an error.
    async fn delete(&self, account: &str) -> Result<(), TokenStoreError>;
}
