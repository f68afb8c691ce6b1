//! Plain-text rendering of the mirrored state for the terminal prompt

use crate::connection::ConnectionStatus;
use crate::model::{GlobalPlayerState, Song};

const TITLE_WIDTH: usize = 40;

pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{}:{:02}", minutes, seconds)
}

pub fn truncate_string(s: &str, max_width: usize) -> String {
    if s.chars().count() > max_width {
        let truncated: String = s.chars().take(max_width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

fn song_line(song: &Song) -> String {
    let title = truncate_string(song.display_name(), TITLE_WIDTH);
    match (&song.artist, song.duration_ms) {
        (Some(artist), Some(ms)) => format!("{} - {} ({})", title, artist, format_duration(ms)),
        (Some(artist), None) => format!("{} - {}", title, artist),
        (None, Some(ms)) => format!("{} ({})", title, format_duration(ms)),
        (None, None) => title,
    }
}

/// One-line summary printed whenever a snapshot arrives
pub fn status_line(state: &GlobalPlayerState, volume: f32) -> String {
    let marker = if state.is_playing { "▶" } else { "⏸" };
    let track = match &state.current_song {
        Some(song) => song_line(song),
        None => "No track playing".to_string(),
    };
    let position = match state.current_index() {
        Some(idx) => format!("{}/{}", idx + 1, state.playlist.len()),
        None => format!("-/{}", state.playlist.len()),
    };
    format!(
        "{} {} | {} | {} | {} | vol {:.0}%",
        marker,
        track,
        format_duration(state.progress_ms),
        position,
        state.play_mode,
        volume * 100.0
    )
}

pub fn playlist_lines(state: &GlobalPlayerState) -> Vec<String> {
    let current = state.current_index();
    state
        .playlist
        .iter()
        .enumerate()
        .map(|(idx, song)| {
            let cursor = if Some(idx) == current { ">" } else { " " };
            format!("{} {:>3}. {}  [{}]", cursor, idx + 1, song_line(song), song.id)
        })
        .collect()
}

pub fn library_lines(library: &[Song]) -> Vec<String> {
    if library.is_empty() {
        return vec!["(library is empty)".to_string()];
    }
    library
        .iter()
        .map(|song| format!("  {}  [{}]", song_line(song), song.id))
        .collect()
}

pub fn connection_line(status: ConnectionStatus) -> Option<String> {
    match status {
        ConnectionStatus::Open | ConnectionStatus::Idle | ConnectionStatus::Connecting => None,
        ConnectionStatus::Reconnecting { attempt } => {
            Some(format!("(connection lost, reconnect attempt {attempt})"))
        }
        ConnectionStatus::Disconnected => {
            Some("(disconnected from server, type `reconnect` to retry)".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayMode;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(61_500), "1:01");
        assert_eq!(format_duration(3_600_000), "60:00");
    }

    #[test]
    fn status_line_reflects_snapshot() {
        let song = Song {
            id: "a".into(),
            title: Some("Blue".into()),
            artist: Some("Band".into()),
            duration_ms: Some(200_000),
            ..Default::default()
        };
        let state = GlobalPlayerState {
            is_playing: true,
            current_song_id: Some("a".into()),
            current_song: Some(song.clone()),
            playlist: vec![song],
            current_playlist_idx: 0,
            progress_ms: 5_000,
            play_mode: PlayMode::RepeatOne,
        };
        assert_eq!(
            status_line(&state, 0.5),
            "▶ Blue - Band (3:20) | 0:05 | 1/1 | REPEAT_ONE | vol 50%"
        );
        assert!(playlist_lines(&state)[0].starts_with(">   1. Blue"));
    }

    #[test]
    fn long_titles_are_truncated() {
        assert_eq!(truncate_string("abcdefgh", 6), "abc...");
        assert_eq!(truncate_string("abc", 6), "abc");
    }
}
