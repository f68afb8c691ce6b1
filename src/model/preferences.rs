//! Client-local preferences that live outside the server session

use std::sync::Arc;

use super::storage::{KeyValueStore, VOLUME_KEY};
use crate::error::StorageError;

pub const DEFAULT_VOLUME: f32 = 0.5;

/// Local output volume, persisted independently of the player state
pub struct LocalPreferenceStore {
    storage: Arc<dyn KeyValueStore>,
    volume: f32,
}

impl LocalPreferenceStore {
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let volume = Self::load_initial_volume(storage.as_ref());
        Self { storage, volume }
    }

    /// Read the persisted volume.
    ///
    /// A stored `0` is an explicit mute and is returned as is; the default
    /// only applies when nothing was ever stored.
    pub fn load_initial_volume(storage: &dyn KeyValueStore) -> f32 {
        let saved = match storage.get(VOLUME_KEY) {
            Ok(saved) => saved,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read saved volume");
                None
            }
        };

        match saved {
            None => DEFAULT_VOLUME,
            Some(raw) => match raw.trim().parse::<f32>() {
                Ok(volume) if volume.is_finite() => volume,
                _ => {
                    tracing::warn!(value = %raw, "Ignoring unreadable saved volume");
                    DEFAULT_VOLUME
                }
            },
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamp into `[0, 1]`, keep it in memory and persist it right away.
    pub fn set_local_volume(&mut self, volume: f32) -> Result<f32, StorageError> {
        if volume.is_nan() {
            tracing::warn!("Ignoring NaN volume");
            return Ok(self.volume);
        }

        let clamped = volume.clamp(0.0, 1.0);
        self.volume = clamped;
        self.storage.set(VOLUME_KEY, &clamped.to_string())?;
        tracing::debug!(volume = clamped, "Local volume saved");
        Ok(clamped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::storage::MemoryStore;

    fn storage() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn defaults_when_never_set() {
        let prefs = LocalPreferenceStore::load(storage());
        assert_eq!(prefs.volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn explicit_mute_survives_reload() {
        let storage = storage();
        let mut prefs = LocalPreferenceStore::load(storage.clone());
        prefs.set_local_volume(0.0).unwrap();

        let reloaded = LocalPreferenceStore::load(storage.clone());
        assert_eq!(reloaded.volume(), 0.0);
        assert_eq!(storage.get(VOLUME_KEY).unwrap().as_deref(), Some("0"));
    }

    #[test]
    fn clamps_out_of_range_values() {
        let storage = storage();
        let mut prefs = LocalPreferenceStore::load(storage.clone());

        assert_eq!(prefs.set_local_volume(-0.4).unwrap(), 0.0);
        assert_eq!(storage.get(VOLUME_KEY).unwrap().as_deref(), Some("0"));

        assert_eq!(prefs.set_local_volume(1.9).unwrap(), 1.0);
        assert_eq!(storage.get(VOLUME_KEY).unwrap().as_deref(), Some("1"));
        assert_eq!(prefs.volume(), 1.0);
    }

    #[test]
    fn keeps_fractional_values() {
        let storage = storage();
        let mut prefs = LocalPreferenceStore::load(storage.clone());
        prefs.set_local_volume(0.25).unwrap();
        assert_eq!(LocalPreferenceStore::load(storage).volume(), 0.25);
    }

    #[test]
    fn unreadable_value_falls_back_to_default() {
        let storage = storage();
        storage.set(VOLUME_KEY, "loud").unwrap();
        assert_eq!(LocalPreferenceStore::load(storage).volume(), DEFAULT_VOLUME);
    }

    #[test]
    fn nan_keeps_current_volume() {
        let mut prefs = LocalPreferenceStore::load(storage());
        prefs.set_local_volume(0.8).unwrap();
        assert_eq!(prefs.set_local_volume(f32::NAN).unwrap(), 0.8);
    }
}
