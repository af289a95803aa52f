//! Spotify Web API client
//!
//! Player commands answer 204 with no body; offset-paged endpoints go
//! through [`get_k`] and cursor-paged ones through [`get_k_cursor`].

use std::sync::Arc;

use actionarc_core::{get_k, get_k_cursor, AccessTokenSource, MusicService, Page, PlayRequest};
use actionarc_domain::{
    Album, Artist, Device, PlayHistoryItem, PlaybackState, Playlist, Result, Track,
};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use super::types::{
    DevicesResponse, Paging, PlayHistory, QueueResponse, SearchResponse, SpotifyPlaybackState,
    SpotifyPlaylist, SpotifyTrack, TopTracksResponse, TrackItem,
};
use crate::http::{read_json, HttpClient};
use crate::integrations::rest::{ApiClient, SPOTIFY_BASE_URL};

const PAGE_LIMIT: usize = 50;
const MAX_ALBUM_TRACKS: usize = 200;

pub struct SpotifyClient {
    api: ApiClient,
}

fn device_query(device_id: Option<&str>) -> Vec<(&'static str, String)> {
    device_id.map(|id| vec![("device_id", id.to_string())]).unwrap_or_default()
}

fn tracks<I: IntoIterator<Item = SpotifyTrack>>(items: I) -> Vec<Track> {
    items.into_iter().filter_map(SpotifyTrack::into_track).collect()
}

impl SpotifyClient {
    pub fn new(http: HttpClient, tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_api(ApiClient::new("spotify", SPOTIFY_BASE_URL, http, tokens))
    }

    pub fn with_api(api: ApiClient) -> Self {
        Self { api }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.api.get_json(path, query).await
    }

    async fn search_page(&self, query: &str, kind: &str, offset: usize, limit: usize) -> Result<SearchResponse> {
        self.get(
            "search",
            &[
                ("q", query.to_string()),
                ("type", kind.to_string()),
                ("offset", offset.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    /// Offset-paged list endpoint.
    async fn offset_page<T: DeserializeOwned>(&self, path: &str, offset: usize, limit: usize) -> Result<Vec<T>> {
        let page: Paging<T> =
            self.get(path, &[("offset", offset.to_string()), ("limit", limit.to_string())]).await?;
        Ok(page.items)
    }

    /// Cursor endpoints hand back the full URL of the next page.
    async fn cursor_page<T: DeserializeOwned>(
        &self,
        first: &str,
        query: &[(&str, String)],
        next: Option<String>,
    ) -> Result<Page<T>> {
        let page: Paging<T> = match next {
            Some(url) => self.get(&url, &[]).await?,
            None => self.get(first, query).await?,
        };
        Ok(Page::new(page.items, page.next))
    }

    async fn player_command(
        &self,
        method: Method,
        endpoint: &str,
        query: Vec<(&'static str, String)>,
        body: Option<Value>,
    ) -> Result<()> {
        debug!(%method, endpoint, "player command");
        let builder = self.api.request(method, endpoint).await?.query(&query);
        let builder = match body {
            Some(body) => builder.json(&body),
            None => builder.body(""),
        };
        self.api.execute(builder).await.map(|_| ())
    }
}

#[async_trait]
impl MusicService for SpotifyClient {
    #[instrument(skip(self))]
    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>> {
        get_k(limit, PAGE_LIMIT, move |offset, n| async move {
            let response = self.search_page(query, "track", offset, n).await?;
            Ok(tracks(response.tracks.map(|p| p.items).unwrap_or_default().into_iter().flatten()))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn search_albums(&self, query: &str, limit: usize) -> Result<Vec<Album>> {
        get_k(limit, PAGE_LIMIT, move |offset, n| async move {
            let response = self.search_page(query, "album", offset, n).await?;
            let items = response.albums.map(|p| p.items).unwrap_or_default();
            Ok(items.into_iter().flatten().map(Album::from).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<Artist>> {
        get_k(limit, PAGE_LIMIT, move |offset, n| async move {
            let response = self.search_page(query, "artist", offset, n).await?;
            let items = response.artists.map(|p| p.items).unwrap_or_default();
            Ok(items.into_iter().flatten().map(Artist::from).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn search_playlists(&self, query: &str, limit: usize) -> Result<Vec<Playlist>> {
        // Spotify returns null entries for playlists it has since removed.
        get_k(limit, PAGE_LIMIT, move |offset, n| async move {
            let response = self.search_page(query, "playlist", offset, n).await?;
            let items = response.playlists.map(|p| p.items).unwrap_or_default();
            Ok(items.into_iter().flatten().map(Playlist::from).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        let path = format!("albums/{}/tracks", urlencoding::encode(album_id));
        let query = [("limit", PAGE_LIMIT.to_string())];
        let (path, query) = (&path, &query);
        let items: Vec<SpotifyTrack> =
            get_k_cursor(MAX_ALBUM_TRACKS, move |next| self.cursor_page(path, query, next)).await?;
        Ok(tracks(items))
    }

    #[instrument(skip(self))]
    async fn artist_top_tracks(&self, artist_id: &str) -> Result<Vec<Track>> {
        let path = format!("artists/{}/top-tracks", urlencoding::encode(artist_id));
        let response: TopTracksResponse = self.get(&path, &[("market", "from_token".to_string())]).await?;
        Ok(tracks(response.tracks))
    }

    #[instrument(skip(self))]
    async fn play(&self, request: &PlayRequest, device_id: Option<&str>) -> Result<()> {
        let body = match request {
            PlayRequest::Uris(uris) => json!({ "uris": uris }),
            PlayRequest::Context { uri, offset: Some(position) } => {
                json!({ "context_uri": uri, "offset": { "position": position } })
            }
            PlayRequest::Context { uri, offset: None } => json!({ "context_uri": uri }),
        };
        self.player_command(Method::PUT, "me/player/play", device_query(device_id), Some(body)).await
    }

    async fn pause(&self, device_id: Option<&str>) -> Result<()> {
        self.player_command(Method::PUT, "me/player/pause", device_query(device_id), None).await
    }

    async fn resume(&self, device_id: Option<&str>) -> Result<()> {
        self.player_command(Method::PUT, "me/player/play", device_query(device_id), None).await
    }

    async fn next(&self, device_id: Option<&str>) -> Result<()> {
        self.player_command(Method::POST, "me/player/next", device_query(device_id), None).await
    }

    async fn previous(&self, device_id: Option<&str>) -> Result<()> {
        self.player_command(Method::POST, "me/player/previous", device_query(device_id), None).await
    }

    async fn set_shuffle(&self, on: bool, device_id: Option<&str>) -> Result<()> {
        let mut query = device_query(device_id);
        query.push(("state", on.to_string()));
        self.player_command(Method::PUT, "me/player/shuffle", query, None).await
    }

    async fn set_volume(&self, percent: u8, device_id: Option<&str>) -> Result<()> {
        let mut query = device_query(device_id);
        query.push(("volume_percent", percent.min(100).to_string()));
        self.player_command(Method::PUT, "me/player/volume", query, None).await
    }

    async fn add_to_queue(&self, uri: &str, device_id: Option<&str>) -> Result<()> {
        let mut query = device_query(device_id);
        query.push(("uri", uri.to_string()));
        self.player_command(Method::POST, "me/player/queue", query, None).await
    }

    async fn devices(&self) -> Result<Vec<Device>> {
        let response: DevicesResponse = self.get("me/player/devices", &[]).await?;
        Ok(response.devices.into_iter().filter_map(|d| d.into_device()).collect())
    }

    #[instrument(skip(self))]
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<()> {
        let body = json!({ "device_ids": [device_id], "play": play });
        self.player_command(Method::PUT, "me/player", Vec::new(), Some(body)).await
    }

    async fn playback_state(&self) -> Result<Option<PlaybackState>> {
        let builder = self.api.request(Method::GET, "me/player").await?;
        let response = self.api.execute(builder).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let state: SpotifyPlaybackState = read_json(response, self.api.provider()).await?;
        Ok(Some(state.into()))
    }

    async fn queue(&self) -> Result<Vec<Track>> {
        let response: QueueResponse = self.get("me/player/queue", &[]).await?;
        Ok(tracks(response.queue))
    }

    #[instrument(skip(self))]
    async fn user_playlists(&self, max: usize) -> Result<Vec<Playlist>> {
        get_k(max, PAGE_LIMIT, move |offset, n| async move {
            let page: Vec<Option<SpotifyPlaylist>> = self.offset_page("me/playlists", offset, n).await?;
            Ok(page.into_iter().flatten().map(Playlist::from).collect())
        })
        .await
    }

    #[instrument(skip(self))]
    async fn playlist_tracks(&self, playlist_id: &str, max: usize) -> Result<Vec<Track>> {
        let path = format!("playlists/{}/tracks", urlencoding::encode(playlist_id));
        let path = &path;
        get_k(max, PAGE_LIMIT, move |offset, n| async move {
            let page: Vec<TrackItem> = self.offset_page(path, offset, n).await?;
            Ok(tracks(page.into_iter().filter_map(|item| item.track)))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn saved_tracks(&self, max: usize) -> Result<Vec<Track>> {
        get_k(max, PAGE_LIMIT, move |offset, n| async move {
            let page: Vec<TrackItem> = self.offset_page("me/tracks", offset, n).await?;
            Ok(tracks(page.into_iter().filter_map(|item| item.track)))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn top_tracks(&self, max: usize) -> Result<Vec<Track>> {
        get_k(max, PAGE_LIMIT, move |offset, n| async move {
            let page: Vec<SpotifyTrack> = self.offset_page("me/top/tracks", offset, n).await?;
            Ok(tracks(page))
        })
        .await
    }

    #[instrument(skip(self))]
    async fn recently_played(&self, max: usize) -> Result<Vec<PlayHistoryItem>> {
        let query = [("limit", max.clamp(1, PAGE_LIMIT).to_string())];
        let query = &query;
        let items: Vec<PlayHistory> =
            get_k_cursor(max, move |next| self.cursor_page("me/player/recently-played", query, next)).await?;
        Ok(items.into_iter().filter_map(PlayHistory::into_item).collect())
    }
}
