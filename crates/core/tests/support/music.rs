use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actionarc_core::{MusicService, PlayRequest, TasteStore, UserTaste};
use actionarc_domain::{
    ActionArcError, Album, Artist, Device, PlayHistoryItem, PlaybackState, Playlist, Result, Track,
};
use async_trait::async_trait;
use chrono::Utc;

pub fn track(name: &str, artist: &str, popularity: u32) -> Track {
    let id = format!("{}-{}", name, artist).to_lowercase().replace(' ', "-");
    Track {
        uri: format!("spotify:track:{id}"),
        id,
        name: name.into(),
        artists: vec![artist.into()],
        album: None,
        duration_ms: 200_000,
        popularity,
    }
}

pub fn device(id: &str, name: &str, active: bool) -> Device {
    Device {
        id: id.into(),
        name: name.into(),
        device_type: "Computer".into(),
        is_active: active,
        volume_percent: Some(40),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Play(PlayRequest, Option<String>),
    Pause(Option<String>),
    Resume(Option<String>),
    Next(Option<String>),
    Previous(Option<String>),
    Shuffle(bool, Option<String>),
    Volume(u8, Option<String>),
    Queue(String, Option<String>),
    Transfer(String),
}

#[derive(Default)]
pub struct Catalogue {
    pub tracks: Vec<Track>,
    pub albums: Vec<(Album, Vec<Track>)>,
    pub artists: Vec<(Artist, Vec<Track>)>,
    pub user_playlists: Vec<Playlist>,
    pub public_playlists: Vec<Playlist>,
    pub playlist_tracks: HashMap<String, Vec<Track>>,
    pub devices: Vec<Device>,
    pub recently_played: Vec<Track>,
    pub top_tracks: Vec<Track>,
    pub saved_tracks: Vec<Track>,
    pub queue: Vec<Track>,
    pub playback: Option<PlaybackState>,
}

/// Catalogue-backed music service.
///
/// Playback commands without a device id fail with 404 until a device has
/// been activated, like the real API does when nothing is playing.
#[derive(Clone, Default)]
pub struct MockMusicService {
    catalogue: Arc<Mutex<Catalogue>>,
    active: Arc<Mutex<Option<String>>>,
    pub calls: Arc<Mutex<Vec<PlayerCall>>>,
    pub search_limits: Arc<Mutex<Vec<usize>>>,
}

impl MockMusicService {
    pub fn new(catalogue: Catalogue) -> Self {
        let active = catalogue.devices.iter().find(|d| d.is_active).map(|d| d.id.clone());
        Self {
            catalogue: Arc::new(Mutex::new(catalogue)),
            active: Arc::new(Mutex::new(active)),
            calls: Arc::new(Mutex::new(Vec::new())),
            search_limits: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn command(&self, call: PlayerCall, device: Option<&str>) -> Result<()> {
        if device.is_none() && self.active.lock().unwrap().is_none() {
            return Err(ActionArcError::Api {
                status: 404,
                message: "Player command failed: No active device found".into(),
            });
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

fn matches(name: &str, query: &str) -> bool {
    let query = query.to_lowercase();
    let name = name.to_lowercase();
    query.split_whitespace().any(|w| name.contains(w.trim_start_matches("track:").trim_start_matches("album:")))
}

#[async_trait]
impl MusicService for MockMusicService {
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        self.search_limits.lock().unwrap().push(limit);
        let c = self.catalogue.lock().unwrap();
        Ok(c.tracks.iter().filter(|t| matches(&t.name, query)).take(limit).cloned().collect())
    }

    async fn search_albums(&self, query: &str, limit: usize) -> Result<Vec<Album>> {
        let c = self.catalogue.lock().unwrap();
        Ok(c.albums.iter().map(|(a, _)| a).filter(|a| matches(&a.name, query)).take(limit).cloned().collect())
    }

    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<Artist>> {
        let c = self.catalogue.lock().unwrap();
        Ok(c.artists.iter().map(|(a, _)| a).filter(|a| matches(&a.name, query)).take(limit).cloned().collect())
    }

    async fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>> {
        let c = self.catalogue.lock().unwrap();
        Ok(c.public_playlists.iter().filter(|p| matches(&p.name, query)).take(limit).cloned().collect())
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        let c = self.catalogue.lock().unwrap();
        c.albums
            .iter()
            .find(|(a, _)| a.id == album_id)
            .map(|(_, t)| t.clone())
            .ok_or_else(|| ActionArcError::Api { status: 404, message: "album".into() })
    }

    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>> {
        let c = self.catalogue.lock().unwrap();
        Ok(c.artists.iter().find(|(a, _)| a.id == artist_id).map(|(_, t)| t.clone()).unwrap_or_default())
    }

    async fn play(&self, request: &PlayRequest, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Play(request.clone(), device_id.map(String::from)), device_id)
    }

    async fn pause(&self, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Pause(device_id.map(String::from)), device_id)
    }

    async fn resume(&self, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Resume(device_id.map(String::from)), device_id)
    }

    async fn next(&self, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Next(device_id.map(String::from)), device_id)
    }

    async fn previous(&self, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Previous(device_id.map(String::from)), device_id)
    }

    async fn set_shuffle(&self, on: bool, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Shuffle(on, device_id.map(String::from)), device_id)
    }

    async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Volume(percent, device_id.map(String::from)), device_id)
    }

    async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<()> {
        self.command(PlayerCall::Queue(uri.to_string(), device_id.map(String::from)), device_id)
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        Ok(self.catalogue.lock().unwrap().devices.clone())
    }

    async fn transfer_playback(&self, device_id: &str, _play: bool) -> Result<()> {
        *self.active.lock().unwrap() = Some(device_id.to_string());
        self.calls.lock().unwrap().push(PlayerCall::Transfer(device_id.to_string()));
        Ok(())
    }

    async fn playback_state(&self) -> Result<Option<PlaybackState>> {
        Ok(self.catalogue.lock().unwrap().playback.clone())
    }

    async fn queue(&self) -> Result<Vec<Track>> {
        Ok(self.catalogue.lock().unwrap().queue.clone())
    }

    async fn user_playlists(&self, max: usize) -> Result<Vec<Playlist>> {
        Ok(self.catalogue.lock().unwrap().user_playlists.iter().take(max).cloned().collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str, max: usize) -> Result<Vec<Track>> {
        let c = self.catalogue.lock().unwrap();
        Ok(c.playlist_tracks.get(playlist_id).map(|t| t.iter().take(max).cloned().collect()).unwrap_or_default())
    }

    async fn saved_tracks(&self, max: usize) -> Result<Vec<Track>> {
        Ok(self.catalogue.lock().unwrap().saved_tracks.iter().take(max).cloned().collect())
    }

    async fn top_tracks(&self, max: usize) -> Result<Vec<Track>> {
        Ok(self.catalogue.lock().unwrap().top_tracks.iter().take(max).cloned().collect())
    }

    async fn recently_played(&self, max: usize) -> Result<Vec<PlayHistoryItem>> {
        Ok(self
            .catalogue
            .lock()
            .unwrap()
            .recently_played
            .iter()
            .take(max)
            .map(|t| PlayHistoryItem { track: t.clone(), played_at: Utc::now() })
            .collect())
    }
}

#[derive(Default, Clone)]
pub struct InMemoryTasteStore {
    pub taste: Arc<Mutex<UserTaste>>,
    pub saves: Arc<Mutex<usize>>,
}

impl InMemoryTasteStore {
    pub fn with(taste: UserTaste) -> Self {
        Self { taste: Arc::new(Mutex::new(taste)), ..Default::default() }
    }

    pub fn snapshot(&self) -> UserTaste {
        self.taste.lock().unwrap().clone()
    }
}

#[async_trait]
impl TasteStore for InMemoryTasteStore {
    async fn load(&self) -> Result<UserTaste> {
        Ok(self.taste.lock().unwrap().clone())
    }

    async fn save(&self, taste: &UserTaste) -> Result<()> {
        *self.taste.lock().unwrap() = taste.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
