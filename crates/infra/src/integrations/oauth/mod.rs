//! OAuth sign-in for Microsoft, Google and Spotify accounts
//!
//! ```text
//! login_interactive ──► OAuthCallbackServer (127.0.0.1:<port>/callback)
//!        │                        │ code + state
//!        ▼                        ▼
//!   OAuthClient ──exchange──► TokenManager ──► <data_dir>/tokens/<provider>.json
//! ```

pub mod callback;
pub mod manager;
pub mod settings;

pub use callback::OAuthCallbackServer;
pub use manager::OAuthManager;
pub use settings::OAuthSettings;
