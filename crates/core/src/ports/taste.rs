//! Persistence port for listening statistics

use actionarc_domain::Result;
use async_trait::async_trait;

use crate::taste::UserTaste;

#[async_trait]
pub trait TasteStore: Send + Sync {
    /// Empty statistics when nothing has been saved yet.
    async fn load(&self) -> Result<UserTaste>;

    async fn save(&self, taste: &UserTaste) -> Result<()>;
}
