//! Bearer token source for REST clients

use actionarc_domain::Result;
use async_trait::async_trait;

/// Supplies a currently valid access token, refreshing as needed.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}
