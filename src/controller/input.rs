//! Text command parsing

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};

/// A user request typed at the prompt
#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Play,
    Pause,
    Toggle,
    Next,
    Prev,
    Seek(u64),
    PlaySpecific(String),
    AddToPlaylist(String),
    RemoveFromPlaylist(String),
    MovePlaylistItem(String, usize),
    Shuffle,
    RemoveSong(String),
    Upload(PathBuf),
    Volume(f32),
    ShowStatus,
    ShowPlaylist,
    ShowLibrary,
    RefreshLibrary,
    Reconnect,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | toggle | next | prev
  seek <m:ss|seconds>       jump within the current track
  jump <song-id>            play a specific track
  add <song-id>             append to the playlist
  remove <song-id>          take out of the playlist
  move <song-id> <index>    reorder the playlist
  shuffle                   shuffle the playlist
  delete <song-id>          remove from the library
  upload <path>             add an audio file to the library
  volume <0-100>            local volume
  status | playlist | library | refresh | reconnect | help | quit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Action>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let verb = verb.to_lowercase();
    let rest: Vec<&str> = words.collect();

    let action = match verb.as_str() {
        "play" | "p" => Action::Play,
        "pause" => Action::Pause,
        "toggle" | "t" => Action::Toggle,
        "next" | "n" => Action::Next,
        "prev" | "previous" => Action::Prev,
        "seek" => Action::Seek(parse_position(single(&rest, "seek <m:ss|seconds>")?)?),
        "jump" => Action::PlaySpecific(single(&rest, "jump <song-id>")?.to_string()),
        "add" => Action::AddToPlaylist(single(&rest, "add <song-id>")?.to_string()),
        "remove" | "rm" => {
            Action::RemoveFromPlaylist(single(&rest, "remove <song-id>")?.to_string())
        }
        "move" | "mv" => match rest.as_slice() {
            [id, index] => {
                let index: usize = index
                    .parse()
                    .with_context(|| format!("`{index}` is not a playlist position"))?;
                if index == 0 {
                    bail!("playlist positions start at 1");
                }
                Action::MovePlaylistItem(id.to_string(), index - 1)
            }
            _ => bail!("usage: move <song-id> <index>"),
        },
        "shuffle" => Action::Shuffle,
        "delete" => Action::RemoveSong(single(&rest, "delete <song-id>")?.to_string()),
        "upload" => {
            if rest.is_empty() {
                bail!("usage: upload <path>");
            }
            Action::Upload(PathBuf::from(rest.join(" ")))
        }
        "volume" | "vol" => {
            let raw = single(&rest, "volume <0-100>")?;
            let percent: f32 = raw
                .trim_end_matches('%')
                .parse()
                .with_context(|| format!("`{raw}` is not a volume"))?;
            Action::Volume(percent / 100.0)
        }
        "status" | "s" => Action::ShowStatus,
        "playlist" | "queue" => Action::ShowPlaylist,
        "library" | "lib" => Action::ShowLibrary,
        "refresh" => Action::RefreshLibrary,
        "reconnect" => Action::Reconnect,
        "help" | "h" | "?" => Action::Help,
        "quit" | "exit" | "q" => Action::Quit,
        other => return Err(anyhow!("unknown command `{other}`, type `help`")),
    };
    Ok(Some(action))
}

fn single<'a>(rest: &[&'a str], usage: &str) -> Result<&'a str> {
    match rest {
        [one] => Ok(*one),
        _ => bail!("usage: {usage}"),
    }
}

/// `90`, `1:30` and `1:30.5` all name a position in milliseconds
fn parse_position(raw: &str) -> Result<u64> {
    let invalid = || anyhow!("`{raw}` is not a position");
    let (minutes, seconds) = match raw.split_once(':') {
        Some((m, s)) => (m.parse::<u64>().map_err(|_| invalid())?, s),
        None => (0, raw),
    };
    let seconds: f64 = seconds.parse().map_err(|_| invalid())?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(invalid());
    }
    Ok(minutes * 60_000 + (seconds * 1000.0).round() as u64)
}
