//! Port interfaces implemented by the infra crate
//!
//! Agents only ever see these traits; the concrete Graph, Google, Spotify,
//! OpenAI and child-process adapters are wired in by the application.

pub mod auth;
pub mod calendar;
pub mod email;
pub mod embedding;
pub mod montage;
pub mod music;
pub mod taste;

pub use auth::AccessTokenSource;
pub use calendar::CalendarProvider;
pub use email::EmailProvider;
pub use embedding::Embedder;
pub use montage::MontageHost;
pub use music::{MusicService, PlayRequest};
pub use taste::TasteStore;
