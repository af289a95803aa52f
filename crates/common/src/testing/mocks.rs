//! In-memory doubles for the OAuth seams

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::auth::{OAuthClientError, OAuthClientTrait, OAuthError, TokenSet, TokenStore, TokenStoreError};

/// Token store backed by a map; shares state across clones.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTokenStore {
    entries: Arc<Mutex<HashMap<String, TokenSet>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached accounts.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn load(&self, account: &str) -> Result<Option<TokenSet>, TokenStoreError> {
        Ok(self.entries.lock().ok().and_then(|e| e.get(account).cloned()))
    }

    async fn save(&self, account: &str, tokens: &TokenSet) -> Result<(), TokenStoreError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(account.to_string(), tokens.clone());
        }
        Ok(())
    }

    async fn delete(&self, account: &str) -> Result<(), TokenStoreError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(account);
        }
        Ok(())
    }
}

/// OAuth client whose refresh outcome is scripted by the test.
#[derive(Debug, Clone, Default)]
pub struct MockOAuthClient {
    refresh_calls: Arc<AtomicU32>,
    failures_remaining: Arc<AtomicU32>,
    refresh_response: Arc<Mutex<Option<TokenSet>>>,
}

impl MockOAuthClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token set returned by successful refreshes.
    pub fn set_refresh_response(&self, tokens: TokenSet) {
        if let Ok(mut slot) = self.refresh_response.lock() {
            *slot = Some(tokens);
        }
    }

    /// Makes the next `n` refreshes fail with a retryable error.
    pub fn fail_next(&self, n: u32) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthClientTrait for MockOAuthClient {
    async fn refresh(&self, _refresh_token: &str) -> Result<TokenSet, OAuthClientError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(OAuthClientError::OAuth(OAuthError {
                error: "temporarily_unavailable".to_string(),
                error_description: None,
            }));
        }

        let scripted = self.refresh_response.lock().ok().and_then(|slot| slot.clone());
        Ok(scripted.unwrap_or_else(|| {
            TokenSet::new(
                "refreshed_access_token".to_string(),
                Some("refreshed_refresh_token".to_string()),
                None,
                3600,
                None,
            )
        }))
    }
}
