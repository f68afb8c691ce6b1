//! The request/response command API consumed by the client

use std::future::Future;
use std::path::Path;

use serde_json::{json, Value};

use super::types::Song;
use crate::error::ApiResult;

/// A user-initiated command relayed to the server.
///
/// Commands never change local state; their effect comes back as a pushed
/// snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Play,
    Pause,
    Next,
    Prev,
    Seek { position_ms: u64 },
    PlaySpecific { song_id: String },
    AddToPlaylist { song_id: String },
    RemoveFromPlaylist { song_id: String },
    MovePlaylistItem { song_id: String, new_index: usize },
    ShufflePlaylist,
    RemoveSong { song_id: String },
}

impl Command {
    pub fn route(&self) -> &'static str {
        match self {
            Command::Play => "/player/play",
            Command::Pause => "/player/pause",
            Command::Next => "/player/next",
            Command::Prev => "/player/prev",
            Command::Seek { .. } => "/player/seek",
            Command::PlaySpecific { .. } => "/player/play-specific",
            Command::AddToPlaylist { .. } => "/playlist/add",
            Command::RemoveFromPlaylist { .. } => "/playlist/remove",
            Command::MovePlaylistItem { .. } => "/playlist/move",
            Command::ShufflePlaylist => "/playlist/shuffle",
            Command::RemoveSong { .. } => "/library/remove",
        }
    }

    /// JSON request body, if the route takes one
    pub fn body(&self) -> Option<Value> {
        match self {
            Command::Seek { position_ms } => Some(json!({ "positionMs": position_ms })),
            Command::PlaySpecific { song_id }
            | Command::AddToPlaylist { song_id }
            | Command::RemoveFromPlaylist { song_id }
            | Command::RemoveSong { song_id } => Some(json!({ "songId": song_id })),
            Command::MovePlaylistItem { song_id, new_index } => {
                Some(json!({ "songId": song_id, "newIndex": new_index }))
            }
            _ => None,
        }
    }

    /// Repeating these leaves the server in the same state
    pub fn is_idempotent(&self) -> bool {
        matches!(self, Command::Seek { .. } | Command::Play | Command::Pause)
    }
}

/// An audio file to add to the library
#[derive(Clone, Debug)]
pub struct SongUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SongUpload {
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }
}

/// Command/query capability of the jukebox server
pub trait PlayerApi: Send + Sync + 'static {
    fn validate_token(&self, token: &str) -> impl Future<Output = ApiResult<bool>> + Send;

    fn get_library(&self) -> impl Future<Output = ApiResult<Vec<Song>>> + Send;

    fn upload_song(&self, upload: SongUpload) -> impl Future<Output = ApiResult<()>> + Send;

    fn send_command(&self, command: &Command) -> impl Future<Output = ApiResult<()>> + Send;
}

#[cfg(test)]
pub(crate) mod fake {
    //! Recording in-memory API for tests

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::ApiError;

    #[derive(Default)]
    pub struct FakeApi {
        pub valid_tokens: Vec<String>,
        pub library: Mutex<Vec<Song>>,
        pub sent: Mutex<Vec<Command>>,
        pub uploads: Mutex<Vec<String>>,
        /// Statuses to fail the next commands with, in order
        pub failures: Mutex<VecDeque<u16>>,
        pub validations: AtomicUsize,
        pub library_fetches: AtomicUsize,
    }

    impl FakeApi {
        pub fn with_tokens(tokens: &[&str]) -> Self {
            Self {
                valid_tokens: tokens.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }
        }

        pub fn fail_next(&self, status: u16) {
            self.failures.lock().unwrap().push_back(status);
        }

        pub fn sent(&self) -> Vec<Command> {
            self.sent.lock().unwrap().clone()
        }

        pub fn fetches(&self) -> usize {
            self.library_fetches.load(Ordering::SeqCst)
        }
    }

    impl PlayerApi for FakeApi {
        async fn validate_token(&self, token: &str) -> ApiResult<bool> {
            self.validations.fetch_add(1, Ordering::SeqCst);
            if token == "unreachable" {
                return Err(ApiError::Status { route: "/validate-token", status: 502 });
            }
            Ok(self.valid_tokens.iter().any(|t| t == token))
        }

        async fn get_library(&self) -> ApiResult<Vec<Song>> {
            self.library_fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.library.lock().unwrap().clone())
        }

        async fn upload_song(&self, upload: SongUpload) -> ApiResult<()> {
            self.uploads.lock().unwrap().push(upload.file_name.clone());
            self.library.lock().unwrap().push(Song {
                id: upload.file_name,
                ..Default::default()
            });
            Ok(())
        }

        async fn send_command(&self, command: &Command) -> ApiResult<()> {
            self.sent.lock().unwrap().push(command.clone());
            let failure = self.failures.lock().unwrap().pop_front();
            match failure {
                Some(status) => Err(ApiError::Status { route: command.route(), status }),
                None => Ok(()),
            }
        }
    }
}
