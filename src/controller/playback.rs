//! Action handling
//!
//! Player commands are spawned and never awaited here: the prompt stays
//! responsive and the result only becomes visible through the next pushed
//! snapshot. Failures are reported by the store's command observer.

use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::connection::Connector;
use crate::model::{CommandOutcome, PlayerApi, SongUpload, StateStore};
use crate::view;

use super::input::{Action, HELP};
use super::AppController;

impl<A: PlayerApi, C: Connector> AppController<A, C> {
    pub async fn handle_action(&self, action: Action) -> ControlFlow<()> {
        tracing::debug!(?action, "Handling prompt action");

        match action {
            Action::Play => self.fire(|store| async move { store.play().await }),
            Action::Pause => self.fire(|store| async move { store.pause().await }),
            Action::Toggle => {
                // Decided from the last pushed state; nothing is flipped locally
                if self.store.snapshot().is_playing {
                    self.fire(|store| async move { store.pause().await })
                } else {
                    self.fire(|store| async move { store.play().await })
                }
            }
            Action::Next => self.fire(|store| async move { store.next().await }),
            Action::Prev => self.fire(|store| async move { store.prev().await }),
            Action::Seek(position_ms) => {
                self.fire(move |store| async move { store.seek_to(position_ms).await })
            }
            Action::PlaySpecific(id) => {
                self.fire(|store| async move { store.play_specific(&id).await })
            }
            Action::AddToPlaylist(id) => {
                self.fire(|store| async move { store.add_to_playlist(&id).await })
            }
            Action::RemoveFromPlaylist(id) => {
                self.fire(|store| async move { store.remove_from_playlist(&id).await })
            }
            Action::MovePlaylistItem(id, new_index) => self.fire(move |store| async move {
                store.move_playlist_item(&id, new_index).await
            }),
            Action::Shuffle => self.fire(|store| async move { store.shuffle_playlist().await }),
            Action::RemoveSong(id) => {
                self.fire(|store| async move { store.remove_song_from_library(&id).await })
            }
            Action::Upload(path) => match SongUpload::from_path(&path).await {
                Ok(upload) => {
                    println!("uploading {} ({} bytes)", upload.file_name, upload.bytes.len());
                    self.fire(|store| async move { store.upload_song(upload).await })
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Could not read upload");
                    println!("! cannot read {}: {}", path.display(), e);
                }
            },
            Action::Volume(volume) => {
                let result = self.preferences().set_local_volume(volume);
                match result {
                    Ok(stored) => println!("volume {:.0}%", stored * 100.0),
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to save volume");
                        println!("! volume not saved: {}", e);
                    }
                }
            }
            Action::ShowStatus => {
                let state = self.store.snapshot();
                println!("{}", view::status_line(&state, self.volume()));
                if let Some(url) = self.store.current_song_url() {
                    println!("  {}", url);
                }
                if let Some(line) = view::connection_line(self.connection.status()) {
                    println!("{}", line);
                }
            }
            Action::ShowPlaylist => {
                let state = self.store.snapshot();
                if state.playlist.is_empty() {
                    println!("(playlist is empty)");
                }
                for line in view::playlist_lines(&state) {
                    println!("{}", line);
                }
            }
            Action::ShowLibrary => {
                for line in view::library_lines(&self.store.library()) {
                    println!("{}", line);
                }
            }
            Action::RefreshLibrary => {
                let store = self.store.clone();
                tokio::spawn(async move { store.fetch_library().await });
            }
            Action::Reconnect => self.connection.connect(),
            Action::Help => println!("{}", HELP),
            Action::Quit => {
                self.connection.disconnect();
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn fire<F, Fut>(&self, op: F)
    where
        F: FnOnce(Arc<StateStore<A>>) -> Fut,
        Fut: Future<Output = CommandOutcome> + Send + 'static,
    {
        let command = op(self.store.clone());
        tokio::spawn(async move {
            command.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::connection::fake::FakeConnector;
    use crate::connection::{ConnectionManager, ConnectionStatus, ReconnectPolicy};
    use crate::model::api::Command;
    use crate::model::api::fake::FakeApi;
    use crate::model::{
        GlobalPlayerState, LocalPreferenceStore, MediaResolver, MemoryStore, SnapshotSink,
    };

    fn controller(api: Arc<FakeApi>) -> AppController<FakeApi, FakeConnector> {
        let media = MediaResolver::new("http://jukebox.test", "mp3");
        let store = Arc::new(StateStore::new(api, media));
        let connection = ConnectionManager::new(
            FakeConnector::default(),
            "ws://jukebox.test/ws",
            ReconnectPolicy::fixed(Duration::from_secs(3)),
            store.clone(),
        );
        let preferences = LocalPreferenceStore::load(Arc::new(MemoryStore::new()));
        AppController::new(store, connection, preferences)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn toggle_follows_last_pushed_state() {
        let api = Arc::new(FakeApi::default());
        let controller = controller(api.clone());

        let flow = controller.handle_action(Action::Toggle).await;
        assert_eq!(flow, ControlFlow::Continue(()));
        settle().await;
        assert_eq!(api.sent(), vec![Command::Play]);
        assert!(!controller.store.snapshot().is_playing);

        controller.store.set_global_state(GlobalPlayerState {
            is_playing: true,
            ..Default::default()
        });
        let flow = controller.handle_action(Action::Toggle).await;
        assert_eq!(flow, ControlFlow::Continue(()));
        settle().await;
        assert_eq!(api.sent(), vec![Command::Play, Command::Pause]);
    }

    #[tokio::test]
    async fn volume_is_clamped_and_kept() {
        let controller = controller(Arc::new(FakeApi::default()));
        let flow = controller.handle_action(Action::Volume(1.5)).await;
        assert_eq!(flow, ControlFlow::Continue(()));
        assert_eq!(controller.volume(), 1.0);
    }

    #[tokio::test]
    async fn quit_closes_the_connection() {
        let controller = controller(Arc::new(FakeApi::default()));
        controller.connection.connect();
        let flow = controller.handle_action(Action::Quit).await;
        assert_eq!(flow, ControlFlow::Break(()));
        assert_eq!(controller.connection.status(), ConnectionStatus::Idle);
    }
}
