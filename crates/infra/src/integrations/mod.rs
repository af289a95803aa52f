//! External service integrations

pub mod calendar;
pub mod email;
pub mod montage;
pub mod oauth;
pub mod openai;
pub mod rest;
pub mod spotify;
pub mod taskflow;

pub use calendar::{CalendarSyncWorker, GoogleCalendarProvider, GraphCalendarProvider, SyncHandle, SyncOutcome};
pub use email::{GmailProvider, GraphEmailProvider};
pub use montage::ProcessMontageHost;
pub use oauth::{OAuthCallbackServer, OAuthManager, OAuthSettings};
pub use openai::EmbeddingClient;
pub use rest::ApiClient;
pub use spotify::{FileTasteStore, SpotifyClient};
pub use taskflow::RecipeLoader;
