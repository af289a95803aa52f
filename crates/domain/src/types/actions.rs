//! Agent action schemas
//!
//! Every action arrives as `{ "actionName": "...", "parameters": { ... } }`.
//! Parameter names are camelCase on the wire.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ActionArcError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "actionName",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum CalendarAction {
    AddEvent {
        subject: String,
        start: DateTime<Utc>,
        #[serde(default)]
        end: Option<DateTime<Utc>>,
        #[serde(default)]
        duration_minutes: Option<i64>,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        body: Option<String>,
        #[serde(default)]
        attendees: Vec<String>,
        #[serde(default)]
        is_all_day: bool,
    },
    FindEvents {
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        participants: Vec<String>,
        #[serde(default)]
        start: Option<DateTime<Utc>>,
        #[serde(default)]
        end: Option<DateTime<Utc>>,
    },
    DeleteEvent {
        #[serde(default)]
        event_id: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        #[serde(default)]
        participants: Vec<String>,
    },
    FindTodaysEvents {},
    FindThisWeeksEvents {},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "actionName",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum EmailAction {
    SendEmail {
        to: Vec<String>,
        #[serde(default)]
        cc: Vec<String>,
        #[serde(default)]
        bcc: Vec<String>,
        subject: String,
        body: String,
        #[serde(default)]
        is_html: bool,
    },
    ReplyEmail {
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        body: String,
        #[serde(default)]
        reply_all: bool,
    },
    ForwardEmail {
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        subject: Option<String>,
        to: Vec<String>,
        #[serde(default)]
        comment: Option<String>,
    },
    FindEmail {
        query: String,
        #[serde(default)]
        max_results: Option<usize>,
    },
    ListInbox {
        #[serde(default)]
        max_results: Option<usize>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "actionName",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum PlayerAction {
    PlayTrack {
        track_name: String,
        #[serde(default)]
        artist: Option<String>,
    },
    PlayAlbum {
        album_name: String,
        #[serde(default)]
        artist: Option<String>,
    },
    PlayArtist {
        artist_name: String,
    },
    PlayPlaylist {
        playlist_name: String,
    },
    PlayFromCurrentTrackList {
        track_number: usize,
    },
    Pause {},
    Resume {},
    Next {},
    Previous {},
    Shuffle {
        on: bool,
    },
    SetVolume {
        percent: u8,
    },
    ChangeVolume {
        delta: i32,
    },
    ListDevices {},
    SelectDevice {
        device_name: String,
    },
    SearchTracks {
        query: String,
        #[serde(default)]
        limit: Option<usize>,
    },
    GetFavorites {
        #[serde(default)]
        count: Option<usize>,
    },
    GetQueue {},
    Status {},
    ListPlaylists {},
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "actionName",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum MontageAction {
    CreateMontage {
        title: String,
        #[serde(default)]
        search_query: Option<String>,
        #[serde(default)]
        files: Vec<String>,
    },
    AddPhotos {
        title: String,
        #[serde(default)]
        search_query: Option<String>,
        #[serde(default)]
        files: Vec<String>,
    },
    RemovePhotos {
        title: String,
        files: Vec<String>,
    },
    ShowMontage {
        title: String,
    },
    DeleteMontage {
        title: String,
    },
    ListMontages {},
}

impl MontageAction {
    /// Rejects actions the montage process cannot act on.
    pub fn validate(&self) -> Result<()> {
        let title = match self {
            Self::CreateMontage { title, .. }
            | Self::AddPhotos { title, .. }
            | Self::RemovePhotos { title, .. }
            | Self::ShowMontage { title }
            | Self::DeleteMontage { title } => title,
            Self::ListMontages {} => return Ok(()),
        };
        if title.trim().is_empty() {
            return Err(ActionArcError::InvalidInput("montage title is required".into()));
        }
        match self {
            Self::AddPhotos { search_query: None, files, .. } if files.is_empty() => Err(
                ActionArcError::InvalidInput("addPhotos needs files or a search query".into()),
            ),
            Self::RemovePhotos { files, .. } if files.is_empty() => {
                Err(ActionArcError::InvalidInput("removePhotos needs at least one file".into()))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    tag = "actionName",
    content = "parameters",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum TaskFlowAction {
    RunRecipe {
        name: String,
        #[serde(default)]
        arguments: Map<String, Value>,
    },
    ListRecipes {},
}

/// Action addressed to a named agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub agent: String,
    pub action: Value,
}

impl ActionRequest {
    /// Builds a request from `"agent.actionName"` and its parameters.
    pub fn from_qualified(name: &str, parameters: Value) -> Result<Self> {
        let (agent, action_name) = name
            .split_once('.')
            .filter(|(a, n)| !a.is_empty() && !n.is_empty())
            .ok_or_else(|| {
                ActionArcError::InvalidInput(format!(
                    "expected <agent>.<actionName>, got '{name}'"
                ))
            })?;
        Ok(Self {
            agent: agent.to_string(),
            action: serde_json::json!({ "actionName": action_name, "parameters": parameters }),
        })
    }

    pub fn action_name(&self) -> Option<&str> {
        self.action.get("actionName").and_then(Value::as_str)
    }
}

/// Outcome of an agent action: text for display plus optional structured data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ActionResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), data: None }
    }

    pub fn with_data(text: impl Into<String>, data: Value) -> Self {
        Self { text: text.into(), data: Some(data) }
    }
}

/// Decodes a typed action, treating missing or null `parameters` as `{}`.
pub fn parse_action<T: DeserializeOwned>(mut action: Value) -> Result<T> {
    if let Some(obj) = action.as_object_mut() {
        let missing = obj.get("parameters").map_or(true, Value::is_null);
        if missing {
            obj.insert("parameters".into(), Value::Object(Map::new()));
        }
    }
    serde_json::from_value(action)
        .map_err(|e| ActionArcError::InvalidInput(format!("malformed action: {e}")))
}
