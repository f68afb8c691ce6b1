//! Listener that echoes pushed state to the prompt

use tokio::task::JoinHandle;

use crate::connection::{ConnectionStatus, Connector};
use crate::model::{GlobalPlayerState, PlayMode, PlayerApi};
use crate::view;

use super::AppController;

/// The parts of a snapshot worth a new status line. Progress alone changes
/// on every push and is left to the `status` command.
#[derive(PartialEq)]
struct Headline {
    is_playing: bool,
    current_song_id: Option<String>,
    current_playlist_idx: i64,
    playlist: Vec<String>,
    play_mode: PlayMode,
}

impl Headline {
    fn of(state: &GlobalPlayerState) -> Self {
        Self {
            is_playing: state.is_playing,
            current_song_id: state.current_song_id.clone(),
            current_playlist_idx: state.current_playlist_idx,
            playlist: state.playlist.iter().map(|s| s.id.clone()).collect(),
            play_mode: state.play_mode.clone(),
        }
    }
}

pub fn spawn_state_printer<A, C>(controller: &AppController<A, C>) -> JoinHandle<()>
where
    A: PlayerApi,
    C: Connector,
{
    let controller = controller.clone();
    let mut snapshots = controller.store.subscribe();
    let mut library = controller.store.subscribe_library();
    let mut status = controller.connection.subscribe_status();
    tracing::info!("Starting state printer");

    tokio::spawn(async move {
        let mut last: Option<Headline> = None;
        loop {
            tokio::select! {
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        tracing::debug!("State store dropped, printer shutting down");
                        break;
                    }
                    let state = snapshots.borrow_and_update().clone();
                    let headline = Headline::of(&state);
                    if last.as_ref() != Some(&headline) {
                        println!("{}", view::status_line(&state, controller.volume()));
                        last = Some(headline);
                    }
                }
                changed = library.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let count = library.borrow_and_update().len();
                    println!("library: {} songs", count);
                }
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let current = *status.borrow_and_update();
                    tracing::debug!(status = ?current, "Connection status changed");
                    if let Some(line) = view::connection_line(current) {
                        println!("{}", line);
                    } else if current == ConnectionStatus::Open && last.is_some() {
                        println!("(reconnected)");
                    }
                }
            }
        }
    })
}
