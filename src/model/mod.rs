//! Model module - Mirrored player state and the capabilities around it
//!
//! - `types`: Data shapes pushed by the server (songs, player snapshot, play mode)
//! - `api`: The command/query capability and the commands it carries
//! - `jukebox_client`: HTTP implementation of that capability
//! - `store`: The single-writer state store and its command dispatcher
//! - `storage`: Durable key-value persistence
//! - `preferences`: Client-local settings (volume)

pub(crate) mod api;
mod jukebox_client;
mod preferences;
mod storage;
mod store;
mod types;

pub use types::{AuthSession, GlobalPlayerState, PlayMode, Song};

pub use api::{PlayerApi, SongUpload};

pub use jukebox_client::JukeboxClient;

pub use store::{
    CommandObserver, CommandOutcome, MediaResolver, RetryPolicy, SnapshotSink, StateStore,
};

pub use storage::{FileStore, KeyValueStore, MemoryStore, TOKEN_KEY};

pub use preferences::LocalPreferenceStore;
