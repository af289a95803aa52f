//! Music streaming port (Spotify Web API shaped)

use actionarc_domain::{
    Album, Artist, Device, PlayHistoryItem, PlaybackState, Playlist, Result, Track,
};
use async_trait::async_trait;

/// What to start playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRequest {
    /// Explicit track list, played in order.
    Uris(Vec<String>),
    /// Album or playlist context, optionally starting at a zero-based offset.
    Context { uri: String, offset: Option<usize> },
}

/// Catalogue search, playback control and library reads.
///
/// `device_id: None` targets the account's currently active device.
#[async_trait]
pub trait MusicService: Send + Sync {
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>>;
    async fn search_albums(&self, query: &str, limit: usize) -> Result<Vec<Album>>;
    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<Artist>>;
    async fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>>;

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;
    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>>;

    async fn play(&self, request: &PlayRequest, device_id: Option<&str>) -> Result<()>;
    async fn pause(&self, device_id: Option<&str>) -> Result<()>;
    async fn resume(&self, device_id: Option<&str>) -> Result<()>;
    async fn next(&self, device_id: Option<&str>) -> Result<()>;
    async fn previous(&self, device_id: Option<&str>) -> Result<()>;
    async fn set_shuffle(&self, on: bool, device_id: Option<&str>) -> Result<()>;
    async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<()>;
    async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<()>;

    async fn devices(&self) -> Result<Vec<Device>>;
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()>;
    /// `Ok(None)` when nothing is playing on any device.
    async fn playback_state(&self) -> Result<Option<PlaybackState>>;
    async fn queue(&self) -> Result<Vec<Track>>;

    async fn user_playlists(&self, max: usize) -> Result<Vec<Playlist>>;
    async fn playlist_tracks(&self, playlist_id: &str, max: usize) -> Result<Vec<Track>>;
    async fn saved_tracks(&self, max: usize) -> Result<Vec<Track>>;
    async fn top_tracks(&self, max: usize) -> Result<Vec<Track>>;
    async fn recently_played(&self, max: usize) -> Result<Vec<PlayHistoryItem>>;
}
