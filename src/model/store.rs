//! Single source of truth for the mirrored player state
//!
//! The player state only ever changes through `SnapshotSink::set_global_state`,
//! which the connection manager calls for each pushed snapshot. Command
//! actions go out to the server and leave local state alone; their effect
//! shows up in a later snapshot.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::api::{Command, PlayerApi, SongUpload};
use super::types::{GlobalPlayerState, Song};
use crate::error::ApiResult;
use crate::log_command_result;

/// Receiver of whole-state replacements from the push channel
pub trait SnapshotSink: Send + Sync + 'static {
    fn set_global_state(&self, snapshot: GlobalPlayerState);
}

/// Hook notified after every dispatched command
pub trait CommandObserver: Send + Sync {
    fn on_outcome(&self, outcome: &CommandOutcome);
}

/// Result of one dispatched command
#[derive(Debug)]
pub struct CommandOutcome {
    pub route: &'static str,
    pub attempts: u32,
    pub result: ApiResult<()>,
}

impl CommandOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Retries for idempotent commands that failed in transport
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn disabled() -> Self {
        Self {
            max_retries: 0,
            delay: Duration::from_millis(250),
        }
    }

    pub const fn new(max_retries: u32, delay: Duration) -> Self {
        Self { max_retries, delay }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Builds playable URLs for tracks served from `{base}/static/audio/`
#[derive(Clone, Debug)]
pub struct MediaResolver {
    base: String,
    default_extension: String,
}

impl MediaResolver {
    pub fn new(base: &str, default_extension: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            default_extension: default_extension.trim_start_matches('.').to_string(),
        }
    }

    /// A server-provided URL wins, then a server-provided extension; the
    /// configured extension is only a fallback.
    pub fn resolve(&self, song: &Song) -> String {
        if let Some(url) = &song.url {
            return url.clone();
        }
        let extension = song
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty())
            .unwrap_or(&self.default_extension);
        format!("{}/static/audio/{}.{}", self.base, song.id, extension)
    }
}

pub struct StateStore<A> {
    api: Arc<A>,
    player: watch::Sender<GlobalPlayerState>,
    library: watch::Sender<Vec<Song>>,
    media: MediaResolver,
    retry: RetryPolicy,
    observer: Option<Arc<dyn CommandObserver>>,
}

impl<A: PlayerApi> StateStore<A> {
    pub fn new(api: Arc<A>, media: MediaResolver) -> Self {
        let (player, _) = watch::channel(GlobalPlayerState::default());
        let (library, _) = watch::channel(Vec::new());
        Self {
            api,
            player,
            library,
            media,
            retry: RetryPolicy::default(),
            observer: None,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CommandObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    // ========================================================================
    // Observation
    // ========================================================================

    pub fn snapshot(&self) -> GlobalPlayerState {
        self.player.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GlobalPlayerState> {
        self.player.subscribe()
    }

    pub fn library(&self) -> Vec<Song> {
        self.library.borrow().clone()
    }

    pub fn subscribe_library(&self) -> watch::Receiver<Vec<Song>> {
        self.library.subscribe()
    }

    pub fn current_song_url(&self) -> Option<String> {
        self.player
            .borrow()
            .current_song
            .as_ref()
            .map(|song| self.media.resolve(song))
    }

    // ========================================================================
    // Commands (fire and forget)
    // ========================================================================

    pub async fn play(&self) -> CommandOutcome {
        self.dispatch(Command::Play).await
    }

    pub async fn pause(&self) -> CommandOutcome {
        self.dispatch(Command::Pause).await
    }

    pub async fn next(&self) -> CommandOutcome {
        self.dispatch(Command::Next).await
    }

    pub async fn prev(&self) -> CommandOutcome {
        self.dispatch(Command::Prev).await
    }

    /// The server answers with a snapshot carrying the corrected progress.
    pub async fn seek_to(&self, position_ms: u64) -> CommandOutcome {
        self.dispatch(Command::Seek { position_ms }).await
    }

    pub async fn play_specific(&self, song_id: &str) -> CommandOutcome {
        self.dispatch(Command::PlaySpecific { song_id: song_id.to_string() }).await
    }

    pub async fn add_to_playlist(&self, song_id: &str) -> CommandOutcome {
        self.dispatch(Command::AddToPlaylist { song_id: song_id.to_string() }).await
    }

    pub async fn remove_from_playlist(&self, song_id: &str) -> CommandOutcome {
        self.dispatch(Command::RemoveFromPlaylist { song_id: song_id.to_string() }).await
    }

    pub async fn move_playlist_item(&self, song_id: &str, new_index: usize) -> CommandOutcome {
        self.dispatch(Command::MovePlaylistItem {
            song_id: song_id.to_string(),
            new_index,
        })
        .await
    }

    pub async fn shuffle_playlist(&self) -> CommandOutcome {
        self.dispatch(Command::ShufflePlaylist).await
    }

    pub async fn remove_song_from_library(&self, song_id: &str) -> CommandOutcome {
        let outcome = self
            .dispatch(Command::RemoveSong { song_id: song_id.to_string() })
            .await;
        if outcome.is_ok() {
            self.fetch_library().await;
        }
        outcome
    }

    pub async fn upload_song(&self, upload: SongUpload) -> CommandOutcome {
        let result = self.api.upload_song(upload).await;
        let outcome = self.report(CommandOutcome {
            route: "/library/upload",
            attempts: 1,
            result,
        });
        if outcome.is_ok() {
            self.fetch_library().await;
        }
        outcome
    }

    /// Replace the media library wholesale. Failures leave it as it was.
    pub async fn fetch_library(&self) {
        match self.api.get_library().await {
            Ok(songs) => {
                tracing::info!(count = songs.len(), "Media library refreshed");
                self.library.send_replace(songs);
            }
            Err(e) => tracing::error!(error = %e, "Failed to fetch library"),
        }
    }

    async fn dispatch(&self, command: Command) -> CommandOutcome {
        let route = command.route();
        let mut attempts = 0;
        let result = loop {
            attempts += 1;
            match self.api.send_command(&command).await {
                Ok(()) => break Ok(()),
                Err(e)
                    if command.is_idempotent()
                        && e.is_transport()
                        && attempts <= self.retry.max_retries =>
                {
                    tracing::warn!(route, attempts, error = %e, "Command failed, retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => break Err(e),
            }
        };

        self.report(CommandOutcome {
            route,
            attempts,
            result,
        })
    }

    fn report(&self, outcome: CommandOutcome) -> CommandOutcome {
        log_command_result!(outcome.route, outcome.result);
        if let Some(observer) = &self.observer {
            observer.on_outcome(&outcome);
        }
        outcome
    }
}

impl<A: PlayerApi> SnapshotSink for StateStore<A> {
    fn set_global_state(&self, snapshot: GlobalPlayerState) {
        tracing::trace!(
            is_playing = snapshot.is_playing,
            progress_ms = snapshot.progress_ms,
            "Applying pushed snapshot"
        );
        self.player.send_replace(snapshot);
    }
}
