//! Spotify Web API response shapes

use actionarc_domain::{Album, Artist, Device, PlayHistoryItem, PlaybackState, Playlist, Track};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Paging<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: Option<Paging<Option<SpotifyTrack>>>,
    pub albums: Option<Paging<Option<SpotifyAlbum>>>,
    pub artists: Option<Paging<Option<SpotifyArtist>>>,
    pub playlists: Option<Paging<Option<SpotifyPlaylist>>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedRef {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyTrack {
    /// `None` for local files, which cannot be played remotely.
    pub id: Option<String>,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<NamedRef>,
    pub album: Option<NamedRef>,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub popularity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyAlbum {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub artists: Vec<NamedRef>,
    pub release_date: Option<String>,
    #[serde(default)]
    pub popularity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyArtist {
    pub id: String,
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyPlaylist {
    pub id: String,
    pub name: String,
    pub uri: String,
    pub owner: Option<SpotifyOwner>,
    pub tracks: Option<TrackTotal>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyOwner {
    pub display_name: Option<String>,
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TrackTotal {
    #[serde(default)]
    pub total: u32,
}

/// Library and playlist entries wrap the track.
#[derive(Debug, Deserialize)]
pub(crate) struct TrackItem {
    pub track: Option<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PlayHistory {
    pub track: SpotifyTrack,
    pub played_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TopTracksResponse {
    #[serde(default)]
    pub tracks: Vec<SpotifyTrack>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<SpotifyDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyDevice {
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyPlaybackState {
    #[serde(default)]
    pub is_playing: bool,
    pub item: Option<SpotifyTrack>,
    pub device: Option<SpotifyDevice>,
    #[serde(default)]
    pub shuffle_state: bool,
    pub progress_ms: Option<u64>,
    pub context: Option<SpotifyContext>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotifyContext {
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QueueResponse {
    #[serde(default)]
    pub queue: Vec<SpotifyTrack>,
}

fn names(refs: Vec<NamedRef>) -> Vec<String> {
    refs.into_iter().map(|r| r.name).collect()
}

impl SpotifyTrack {
    pub fn into_track(self) -> Option<Track> {
        Some(Track {
            id: self.id?,
            name: self.name,
            uri: self.uri,
            artists: names(self.artists),
            album: self.album.map(|a| a.name),
            duration_ms: self.duration_ms,
            popularity: self.popularity.unwrap_or_default(),
        })
    }
}

impl From<SpotifyAlbum> for Album {
    fn from(album: SpotifyAlbum) -> Self {
        Album {
            id: album.id,
            name: album.name,
            uri: album.uri,
            artists: names(album.artists),
            release_date: album.release_date,
            popularity: album.popularity.unwrap_or_default(),
        }
    }
}

impl From<SpotifyArtist> for Artist {
    fn from(artist: SpotifyArtist) -> Self {
        Artist {
            id: artist.id,
            name: artist.name,
            uri: artist.uri,
            popularity: artist.popularity.unwrap_or_default(),
            genres: artist.genres,
        }
    }
}

impl From<SpotifyPlaylist> for Playlist {
    fn from(playlist: SpotifyPlaylist) -> Self {
        Playlist {
            id: playlist.id,
            name: playlist.name,
            uri: playlist.uri,
            owner: playlist.owner.and_then(|o| o.display_name.or(o.id)),
            track_count: playlist.tracks.map(|t| t.total).unwrap_or_default(),
        }
    }
}

impl SpotifyDevice {
    /// Restricted devices have no id and cannot be targeted.
    pub fn into_device(self) -> Option<Device> {
        Some(Device {
            id: self.id?,
            name: self.name,
            device_type: self.device_type,
            is_active: self.is_active,
            volume_percent: self.volume_percent,
        })
    }
}

impl From<SpotifyPlaybackState> for PlaybackState {
    fn from(state: SpotifyPlaybackState) -> Self {
        PlaybackState {
            is_playing: state.is_playing,
            track: state.item.and_then(SpotifyTrack::into_track),
            device: state.device.and_then(SpotifyDevice::into_device),
            shuffle: state.shuffle_state,
            progress_ms: state.progress_ms.unwrap_or_default(),
            context_uri: state.context.map(|c| c.uri),
        }
    }
}

impl PlayHistory {
    pub fn into_item(self) -> Option<PlayHistoryItem> {
        Some(PlayHistoryItem { track: self.track.into_track()?, played_at: self.played_at })
    }
}
