//! OAuth 2.0 + PKCE core
//!
//! ```text
//! ┌────────────────┐   refresh    ┌──────────────┐
//! │  TokenManager  │─────────────►│  OAuthClient │  token endpoint grants
//! └───────┬────────┘              └──────────────┘
//!         │ load/save/delete
//!         ▼
//! ┌────────────────┐
//! │ FileTokenStore │  <data_dir>/tokens/<account>.json
//! └────────────────┘
//! ```
//!
//! Interactive login (loopback redirect or device code) lives in the infra
//! crate; it drives [`OAuthClient`] and hands the result to
//! [`TokenManager::store_tokens`].

pub mod client;
pub mod pkce;
pub mod token_manager;
pub mod token_store;
pub mod traits;
pub mod types;

pub use client::{OAuthClient, OAuthClientError};
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, PkceChallenge};
pub use token_manager::{TokenManager, TokenManagerError};
pub use token_store::{FileTokenStore, TokenStoreError};
pub use traits::{OAuthClientTrait, TokenStore};
pub use types::{DeviceAuthorization, OAuthConfig, OAuthError, TokenResponse, TokenSet};
