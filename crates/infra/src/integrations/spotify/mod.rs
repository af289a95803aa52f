//! Spotify Web API adapter and local taste persistence

pub mod client;
pub mod taste_store;
mod types;

pub use client::SpotifyClient;
pub use taste_store::FileTasteStore;
