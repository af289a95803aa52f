//! Music player agent
//!
//! Resolves spoken-style requests ("play Creep by Radiohead") against the
//! catalogue, keeps the last listed [`TrackCollection`] so follow-ups like
//! "play number 3" work, and feeds played tracks into the local taste
//! statistics that bias later searches.
//!
//! Playback commands target the selected device, the configured default
//! device, or whatever device is active. When the service answers 404 (no
//! active device) the first available device is activated and the command is
//! retried once.

use std::future::Future;
use std::sync::Arc;

use actionarc_domain::constants::{DEFAULT_SEARCH_LIMIT, MAX_FAVORITE_TRACKS, MAX_SEARCH_RESULTS};
use actionarc_domain::{
    parse_action, ActionArcError, ActionResult, Device, PlayerAction, Playlist, Result, Track,
    TrackCollection,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::Agent;
use crate::matching::{overlap_score, same_name, select_best_album, select_best_artist, select_best_track};
use crate::ports::{MusicService, PlayRequest, TasteStore};
use crate::taste::UserTaste;

const ACTIONS: &[&str] = &[
    "playTrack",
    "playAlbum",
    "playArtist",
    "playPlaylist",
    "playFromCurrentTrackList",
    "pause",
    "resume",
    "next",
    "previous",
    "shuffle",
    "setVolume",
    "changeVolume",
    "listDevices",
    "selectDevice",
    "searchTracks",
    "getFavorites",
    "getQueue",
    "status",
    "listPlaylists",
];

const PLAYLIST_TRACK_LIMIT: usize = 100;
const DEFAULT_FAVORITES: usize = 10;
const FALLBACK_VOLUME: u8 = 50;

#[derive(Default)]
struct PlayerState {
    current: Option<TrackCollection>,
    device_id: Option<String>,
    taste: Option<UserTaste>,
}

pub struct PlayerAgent {
    music: Arc<dyn MusicService>,
    taste_store: Arc<dyn TasteStore>,
    default_device: Option<String>,
    state: Mutex<PlayerState>,
}

impl PlayerAgent {
    pub fn new(music: Arc<dyn MusicService>, taste_store: Arc<dyn TasteStore>) -> Self {
        Self { music, taste_store, default_device: None, state: Mutex::new(PlayerState::default()) }
    }

    /// Device name to target when none has been selected.
    pub fn with_default_device(mut self, name: Option<String>) -> Self {
        self.default_device = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn current_collection(&self) -> Option<TrackCollection> {
        self.state.lock().current.clone()
    }

    pub fn selected_device(&self) -> Option<String> {
        self.state.lock().device_id.clone()
    }

    /// Taste statistics, loaded once. An empty store is seeded from the
    /// account's recently played tracks.
    async fn taste(&self) -> UserTaste {
        let cached = self.state.lock().taste.clone();
        if let Some(taste) = cached {
            return taste;
        }

        let mut taste = match self.taste_store.load().await {
            Ok(taste) => taste,
            Err(e) => {
                warn!(error = %e, "failed to load taste statistics");
                UserTaste::default()
            }
        };

        if taste.is_empty() {
            match self.music.recently_played(MAX_FAVORITE_TRACKS).await {
                Ok(history) if !history.is_empty() => {
                    let tracks: Vec<Track> = history.into_iter().map(|h| h.track).collect();
                    taste.record_tracks(&tracks);
                    debug!(tracks = tracks.len(), "seeded taste from recently played");
                    if let Err(e) = self.taste_store.save(&taste).await {
                        warn!(error = %e, "failed to save taste statistics");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to read recently played tracks"),
            }
        }

        self.state.lock().taste = Some(taste.clone());
        taste
    }

    async fn record_played(&self, tracks: &[Track]) {
        if tracks.is_empty() {
            return;
        }
        let mut taste = self.taste().await;
        taste.record_tracks(tracks);
        self.state.lock().taste = Some(taste.clone());
        if let Err(e) = self.taste_store.save(&taste).await {
            warn!(error = %e, "failed to save taste statistics");
        }
    }

    /// Selected device, else the configured default resolved by name.
    async fn target_device(&self) -> Result<Option<String>> {
        if let Some(id) = self.selected_device() {
            return Ok(Some(id));
        }
        let Some(name) = &self.default_device else {
            return Ok(None);
        };

        let devices = self.music.devices().await?;
        match find_device(&devices, name) {
            Some(device) => {
                self.state.lock().device_id = Some(device.id.clone());
                Ok(Some(device.id.clone()))
            }
            None => {
                warn!(device = %name, "default device not available");
                Ok(None)
            }
        }
    }

    /// Runs a playback command, activating the first device on a 404.
    async fn on_device<F, Fut>(&self, command: F) -> Result<()>
    where
        F: Fn(Option<String>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let device = self.target_device().await?;
        match command(device).await {
            Err(e) if e.is_status(404) => {
                let devices = self.music.devices().await?;
                let first = devices
                    .first()
                    .ok_or_else(|| ActionArcError::NotFound("no playback devices available".into()))?;
                info!(device = %first.name, "no active device, transferring playback");
                self.music.transfer_playback(&first.id, false).await?;
                self.state.lock().device_id = Some(first.id.clone());
                command(Some(first.id.clone())).await
            }
            other => other,
        }
    }

    async fn play(&self, request: PlayRequest) -> Result<()> {
        self.on_device(|device| {
            let request = request.clone();
            async move { self.music.play(&request, device.as_deref()).await }
        })
        .await
    }

    fn set_current(&self, collection: TrackCollection) {
        self.state.lock().current = Some(collection);
    }

    async fn play_track(&self, name: &str, artist: Option<&str>) -> Result<ActionResult> {
        let query = match artist {
            Some(artist) => format!("track:{name} artist:{artist}"),
            None => name.to_string(),
        };
        let candidates = self.music.search_tracks(&query, DEFAULT_SEARCH_LIMIT).await?;
        let known = self.taste().await.known_artists();
        let track = select_best_track(&candidates, name, &known)
            .cloned()
            .ok_or_else(|| ActionArcError::NotFound(format!("no track found for '{name}'")))?;

        self.play(PlayRequest::Uris(vec![track.uri.clone()])).await?;
        info!(track = %track.uri, "playing track");
        let text = format!("Now playing {}", track.describe());
        self.set_current(TrackCollection::new(track.describe(), vec![track.clone()], None));
        self.record_played(std::slice::from_ref(&track)).await;
        Ok(ActionResult::with_data(text, json!({ "track": track })))
    }

    async fn play_album(&self, name: &str, artist: Option<&str>) -> Result<ActionResult> {
        let query = match artist {
            Some(artist) => format!("album:{name} artist:{artist}"),
            None => name.to_string(),
        };
        let candidates = self.music.search_albums(&query, DEFAULT_SEARCH_LIMIT).await?;
        let known = self.taste().await.known_artists();
        let album = select_best_album(&candidates, name, &known)
            .cloned()
            .ok_or_else(|| ActionArcError::NotFound(format!("no album found for '{name}'")))?;

        let tracks = self.music.album_tracks(&album.id).await?;
        self.play(PlayRequest::Context { uri: album.uri.clone(), offset: None }).await?;
        info!(album = %album.uri, tracks = tracks.len(), "playing album");

        let collection = TrackCollection::new(album.name.clone(), tracks, Some(album.uri.clone()));
        let text = format!("Playing album {} by {}\n{}", album.name, album.artists.join(", "), collection.listing());
        self.record_played(&collection.tracks).await;
        self.set_current(collection);
        Ok(ActionResult::with_data(text, json!({ "album": album })))
    }

    async fn play_artist(&self, name: &str) -> Result<ActionResult> {
        let candidates = self.music.search_artists(name, DEFAULT_SEARCH_LIMIT).await?;
        let known = self.taste().await.known_artists();
        let artist = select_best_artist(&candidates, name, &known)
            .cloned()
            .ok_or_else(|| ActionArcError::NotFound(format!("no artist found for '{name}'")))?;

        let tracks = self.music.artist_top_tracks(&artist.id).await?;
        if tracks.is_empty() {
            return Err(ActionArcError::NotFound(format!("{} has no playable tracks", artist.name)));
        }
        let collection = TrackCollection::new(format!("Top tracks: {}", artist.name), tracks, None);
        self.play(PlayRequest::Uris(collection.uris())).await?;
        info!(artist = %artist.uri, "playing artist top tracks");

        let text = format!("Playing top tracks by {}\n{}", artist.name, collection.listing());
        self.record_played(&collection.tracks).await;
        self.set_current(collection);
        Ok(ActionResult::with_data(text, json!({ "artist": artist })))
    }

    /// The user's own playlists are preferred over catalogue results.
    async fn find_playlist(&self, name: &str) -> Result<Playlist> {
        let own = self.music.user_playlists(MAX_FAVORITE_TRACKS).await?;
        if let Some(found) = best_playlist(own, name) {
            return Ok(found);
        }
        let hits = self.music.search_playlists(name, DEFAULT_SEARCH_LIMIT).await?;
        best_playlist(hits, name).ok_or_else(|| ActionArcError::NotFound(format!("no playlist found for '{name}'")))
    }

    async fn play_playlist(&self, name: &str) -> Result<ActionResult> {
        let playlist = self.find_playlist(name).await?;
        let tracks = self.music.playlist_tracks(&playlist.id, PLAYLIST_TRACK_LIMIT).await?;
        self.play(PlayRequest::Context { uri: playlist.uri.clone(), offset: None }).await?;
        info!(playlist = %playlist.uri, "playing playlist");

        let collection = TrackCollection::new(playlist.name.clone(), tracks, Some(playlist.uri.clone()));
        let text = format!("Playing playlist {}\n{}", playlist.name, collection.listing());
        self.record_played(&collection.tracks).await;
        self.set_current(collection);
        Ok(ActionResult::with_data(text, json!({ "playlist": playlist })))
    }

    /// `number` is 1-based, matching the numbered listings.
    async fn play_from_current(&self, number: usize) -> Result<ActionResult> {
        let collection = self
            .current_collection()
            .ok_or_else(|| ActionArcError::InvalidInput("there is no current track list".into()))?;
        if number == 0 || number > collection.tracks.len() {
            return Err(ActionArcError::InvalidInput(format!(
                "track number must be between 1 and {}",
                collection.tracks.len()
            )));
        }

        let index = number - 1;
        let request = match &collection.context_uri {
            Some(uri) => PlayRequest::Context { uri: uri.clone(), offset: Some(index) },
            None => PlayRequest::Uris(collection.uris()[index..].to_vec()),
        };
        self.play(request).await?;

        let track = collection.tracks[index].clone();
        self.record_played(std::slice::from_ref(&track)).await;
        Ok(ActionResult::with_data(format!("Now playing {}", track.describe()), json!({ "track": track })))
    }

    async fn change_volume(&self, delta: i32) -> Result<ActionResult> {
        let current = self
            .music
            .playback_state()
            .await?
            .and_then(|s| s.device)
            .and_then(|d| d.volume_percent)
            .unwrap_or(FALLBACK_VOLUME);
        let target = i32::from(current).saturating_add(delta).clamp(0, 100) as u8;
        self.on_device(|device| async move { self.music.set_volume(target, device.as_deref()).await }).await?;
        Ok(ActionResult::text(format!("Volume set to {target}%")))
    }

    async fn select_device(&self, name: &str) -> Result<ActionResult> {
        if name.trim().is_empty() {
            return Err(ActionArcError::InvalidInput("deviceName must not be empty".into()));
        }
        let devices = self.music.devices().await?;
        let device = find_device(&devices, name)
            .ok_or_else(|| ActionArcError::NotFound(format!("no device named '{name}'")))?;
        self.music.transfer_playback(&device.id, false).await?;
        self.state.lock().device_id = Some(device.id.clone());
        info!(device = %device.name, "selected playback device");
        Ok(ActionResult::text(format!("Playback moved to {}", device.name)))
    }

    fn list_collection(&self, collection: TrackCollection, empty: &str) -> ActionResult {
        if collection.is_empty() {
            return ActionResult::with_data(empty, json!({ "tracks": [] }));
        }
        let text = format!("{}\n{}", collection.title, collection.listing());
        let data = json!({ "tracks": collection.tracks });
        self.set_current(collection);
        ActionResult::with_data(text, data)
    }

    async fn status(&self) -> Result<ActionResult> {
        let Some(state) = self.music.playback_state().await? else {
            return Ok(ActionResult::text("Nothing is playing."));
        };
        let what = state.track.as_ref().map(Track::describe).unwrap_or_else(|| "(unknown track)".into());
        let mut text = format!("{} {what}", if state.is_playing { "Playing" } else { "Paused:" });
        if let Some(device) = &state.device {
            text.push_str(&format!(" on {}", device.name));
        }
        if state.shuffle {
            text.push_str(" (shuffle on)");
        }
        Ok(ActionResult::with_data(text, json!({ "state": state })))
    }
}

/// Exact case-insensitive name first, then the most shared words.
fn best_playlist(playlists: Vec<Playlist>, name: &str) -> Option<Playlist> {
    if let Some(exact) = playlists.iter().find(|p| same_name(&p.name, name)) {
        return Some(exact.clone());
    }
    playlists
        .into_iter()
        .map(|p| (overlap_score(&p.name, name), p))
        .filter(|(score, _)| *score > 0)
        .rev()
        .max_by_key(|(score, _)| *score)
        .map(|(_, p)| p)
}

/// Exact case-insensitive name first, then a substring match.
fn find_device<'a>(devices: &'a [Device], name: &str) -> Option<&'a Device> {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    devices
        .iter()
        .find(|d| d.name.to_lowercase() == wanted)
        .or_else(|| devices.iter().find(|d| d.name.to_lowercase().contains(&wanted)))
}

#[async_trait]
impl Agent for PlayerAgent {
    fn name(&self) -> &'static str {
        "player"
    }

    fn action_names(&self) -> &'static [&'static str] {
        ACTIONS
    }

    async fn execute(&self, action: Value) -> Result<ActionResult> {
        match parse_action::<PlayerAction>(action)? {
            PlayerAction::PlayTrack { track_name, artist } => {
                self.play_track(&track_name, artist.as_deref()).await
            }
            PlayerAction::PlayAlbum { album_name, artist } => {
                self.play_album(&album_name, artist.as_deref()).await
            }
            PlayerAction::PlayArtist { artist_name } => self.play_artist(&artist_name).await,
            PlayerAction::PlayPlaylist { playlist_name } => self.play_playlist(&playlist_name).await,
            PlayerAction::PlayFromCurrentTrackList { track_number } => {
                self.play_from_current(track_number).await
            }
            PlayerAction::Pause {} => {
                self.on_device(|d| async move { self.music.pause(d.as_deref()).await }).await?;
                Ok(ActionResult::text("Paused."))
            }
            PlayerAction::Resume {} => {
                self.on_device(|d| async move { self.music.resume(d.as_deref()).await }).await?;
                Ok(ActionResult::text("Resumed."))
            }
            PlayerAction::Next {} => {
                self.on_device(|d| async move { self.music.next(d.as_deref()).await }).await?;
                Ok(ActionResult::text("Skipped to the next track."))
            }
            PlayerAction::Previous {} => {
                self.on_device(|d| async move { self.music.previous(d.as_deref()).await }).await?;
                Ok(ActionResult::text("Back to the previous track."))
            }
            PlayerAction::Shuffle { on } => {
                self.on_device(|d| async move { self.music.set_shuffle(on, d.as_deref()).await }).await?;
                Ok(ActionResult::text(if on { "Shuffle on." } else { "Shuffle off." }))
            }
            PlayerAction::SetVolume { percent } => {
                let percent = percent.min(100);
                self.on_device(|d| async move { self.music.set_volume(percent, d.as_deref()).await })
                    .await?;
                Ok(ActionResult::text(format!("Volume set to {percent}%")))
            }
            PlayerAction::ChangeVolume { delta } => self.change_volume(delta).await,
            PlayerAction::ListDevices {} => {
                let devices = self.music.devices().await?;
                if devices.is_empty() {
                    return Ok(ActionResult::with_data("No devices available.", json!({ "devices": [] })));
                }
                let text = devices
                    .iter()
                    .map(|d| {
                        let active = if d.is_active { " (active)" } else { "" };
                        format!("- {} [{}]{active}", d.name, d.device_type)
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ActionResult::with_data(text, json!({ "devices": devices })))
            }
            PlayerAction::SelectDevice { device_name } => self.select_device(&device_name).await,
            PlayerAction::SearchTracks { query, limit } => {
                let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_RESULTS);
                let tracks = self.music.search_tracks(&query, limit).await?;
                let collection = TrackCollection::new(format!("Results for '{query}'"), tracks, None);
                Ok(self.list_collection(collection, "No tracks found."))
            }
            PlayerAction::GetFavorites { count } => {
                let count = count.unwrap_or(DEFAULT_FAVORITES).min(MAX_FAVORITE_TRACKS);
                let mut tracks = self.music.top_tracks(count).await?;
                if tracks.is_empty() {
                    tracks = self.music.saved_tracks(count).await?;
                }
                let collection = TrackCollection::new("Your favorites", tracks, None);
                Ok(self.list_collection(collection, "No favorite tracks yet."))
            }
            PlayerAction::GetQueue {} => {
                let tracks = self.music.queue().await?;
                let collection = TrackCollection::new("Up next", tracks, None);
                Ok(self.list_collection(collection, "The queue is empty."))
            }
            PlayerAction::Status {} => self.status().await,
            PlayerAction::ListPlaylists {} => {
                let playlists = self.music.user_playlists(MAX_FAVORITE_TRACKS).await?;
                if playlists.is_empty() {
                    return Ok(ActionResult::with_data("No playlists.", json!({ "playlists": [] })));
                }
                let text = playlists
                    .iter()
                    .map(|p| format!("- {} ({} tracks)", p.name, p.track_count))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(ActionResult::with_data(text, json!({ "playlists": playlists })))
            }
        }
    }
}
