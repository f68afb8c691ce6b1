//! Core type definitions mirrored from the jukebox server

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A track as the server describes it
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Full playable URL, when the server provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
}

impl Song {
    pub fn display_name(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.id)
    }
}

/// Play mode as reported by the server.
///
/// The set of modes belongs to the server; values this client does not know
/// are kept verbatim in `Other` and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PlayMode {
    #[default]
    RepeatAll,
    RepeatOne,
    Shuffle,
    Other(String),
}

impl PlayMode {
    pub fn as_str(&self) -> &str {
        match self {
            PlayMode::RepeatAll => "REPEAT_ALL",
            PlayMode::RepeatOne => "REPEAT_ONE",
            PlayMode::Shuffle => "SHUFFLE",
            PlayMode::Other(raw) => raw,
        }
    }
}

impl From<String> for PlayMode {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "REPEAT_ALL" => PlayMode::RepeatAll,
            "REPEAT_ONE" => PlayMode::RepeatOne,
            "SHUFFLE" => PlayMode::Shuffle,
            _ => PlayMode::Other(raw),
        }
    }
}

impl From<PlayMode> for String {
    fn from(mode: PlayMode) -> Self {
        match mode {
            PlayMode::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authoritative player state pushed by the server.
///
/// Every snapshot carries all fields and replaces the previous value whole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalPlayerState {
    pub is_playing: bool,
    pub current_song_id: Option<String>,
    pub current_song: Option<Song>,
    pub playlist: Vec<Song>,
    /// `-1` when there is no current track
    pub current_playlist_idx: i64,
    pub progress_ms: u64,
    pub play_mode: PlayMode,
}

impl Default for GlobalPlayerState {
    fn default() -> Self {
        Self {
            is_playing: false,
            current_song_id: None,
            current_song: None,
            playlist: Vec::new(),
            current_playlist_idx: -1,
            progress_ms: 0,
            play_mode: PlayMode::RepeatAll,
        }
    }
}

impl GlobalPlayerState {
    pub fn current_index(&self) -> Option<usize> {
        usize::try_from(self.current_playlist_idx)
            .ok()
            .filter(|idx| *idx < self.playlist.len())
    }
}

/// Authentication state of this client
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub validated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_snapshot() {
        let raw = r#"{
            "isPlaying": true,
            "currentSongId": "a1",
            "currentSong": {"id": "a1", "title": "Intro", "durationMs": 1000, "bitrate": 320},
            "playlist": [{"id": "a1"}, {"id": "b2"}],
            "currentPlaylistIdx": 0,
            "progressMs": 420,
            "playMode": "REPEAT_ONE"
        }"#;

        let state: GlobalPlayerState = serde_json::from_str(raw).unwrap();
        assert!(state.is_playing);
        assert_eq!(state.current_song_id.as_deref(), Some("a1"));
        assert_eq!(state.current_song.as_ref().unwrap().display_name(), "Intro");
        assert_eq!(state.playlist.len(), 2);
        assert_eq!(state.current_index(), Some(0));
        assert_eq!(state.progress_ms, 420);
        assert_eq!(state.play_mode, PlayMode::RepeatOne);
    }

    #[test]
    fn unknown_play_mode_survives_round_trip() {
        let mode: PlayMode = serde_json::from_str(r#""PARTY""#).unwrap();
        assert_eq!(mode, PlayMode::Other("PARTY".to_string()));
        assert_eq!(serde_json::to_string(&mode).unwrap(), r#""PARTY""#);
    }

    #[test]
    fn negative_index_means_no_current_track() {
        let state = GlobalPlayerState {
            playlist: vec![Song { id: "x".into(), ..Default::default() }],
            ..Default::default()
        };
        assert_eq!(state.current_index(), None);
    }
}
