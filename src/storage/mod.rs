//! Persistent threshold storage.
//!
//! The backing medium (EEPROM, a flash page, a file in the simulator) is
//! abstracted behind [`ConfigStorage`]. [`ConfigStore`] owns the loaded
//! configuration and guarantees it is always valid: a record that cannot be
//! read, decoded, or that fails range validation is replaced by the defaults,
//! which are written back immediately.

mod record;

pub use record::{RECORD_SIZE, decode, encode};

use core::fmt::Debug;

use log::{debug, error, info, warn};
use thiserror_no_std::Error;

use crate::settings::ThresholdConfig;

/// Byte-level access to the medium holding one threshold record.
pub trait ConfigStorage {
    type Error: Debug;

    fn read(&mut self, buf: &mut [u8; RECORD_SIZE]) -> Result<(), Self::Error>;

    fn write(&mut self, buf: &[u8; RECORD_SIZE]) -> Result<(), Self::Error>;
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    #[error("Config storage read failed")]
    Read,
    #[error("Config storage write failed")]
    Write,
    #[error("Config record could not be decoded")]
    Decode,
    #[error("Config record could not be encoded")]
    Encode,
}

/// How the active configuration was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Stored record was valid
    Loaded,
    /// Stored record was unusable; defaults were installed
    Defaulted,
}

/// Owns the backing storage and the active configuration.
pub struct ConfigStore<S: ConfigStorage> {
    storage: S,
    config: ThresholdConfig,
    outcome: LoadOutcome,
}

impl<S: ConfigStorage> ConfigStore<S> {
    /// Load the stored configuration, falling back to defaults.
    ///
    /// Never fails: the result always holds a configuration that passes
    /// [`ThresholdConfig::validate`].
    pub fn load(storage: S) -> Self {
        let mut store = Self {
            storage,
            config: ThresholdConfig::DEFAULT,
            outcome: LoadOutcome::Loaded,
        };

        match store.read_record() {
            Ok(config) => match config.validate() {
                Ok(()) => {
                    info!("Loaded thresholds {:?}", config);
                    store.config = config;
                }
                Err(field) => {
                    warn!(
                        "Stored thresholds invalid ({:?}), restoring defaults",
                        field
                    );
                    store.restore_defaults();
                }
            },
            Err(e) => {
                warn!("Could not load thresholds ({}), restoring defaults", e);
                store.restore_defaults();
            }
        }

        store
    }

    fn read_record(&mut self) -> Result<ThresholdConfig, StorageError> {
        let mut buf = [0u8; RECORD_SIZE];
        self.storage.read(&mut buf).map_err(|e| {
            error!("Config storage read error: {:?}", e);
            StorageError::Read
        })?;
        decode(&buf)
    }

    fn restore_defaults(&mut self) {
        self.config = ThresholdConfig::DEFAULT;
        self.outcome = LoadOutcome::Defaulted;
        if let Err(e) = self.save() {
            // Defaults are still live; the next edit retries the write
            error!("Failed to persist default thresholds: {}", e);
        }
    }

    /// Write the active configuration to storage.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let bytes = encode(&self.config)?;
        self.storage.write(&bytes).map_err(|e| {
            error!("Config storage write error: {:?}", e);
            StorageError::Write
        })?;
        debug!("Saved thresholds {:?}", self.config);
        Ok(())
    }

    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Mutable access for operator edits. Callers keep the record valid by
    /// going through [`ThresholdConfig::adjust`].
    pub fn config_mut(&mut self) -> &mut ThresholdConfig {
        &mut self.config
    }

    pub fn outcome(&self) -> LoadOutcome {
        self.outcome
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MemoryStorage;
    use super::*;
    use crate::settings::Parameter;

    fn stored(delay: i16, soft: f32, abs: f32) -> MemoryStorage {
        let cfg = ThresholdConfig {
            trip_delay_samples: delay,
            soft_limit_amps: soft,
            abs_limit_amps: abs,
        };
        MemoryStorage::with_record(encode(&cfg).unwrap())
    }

    #[test]
    fn test_load_valid_record() {
        let store = ConfigStore::load(stored(50, 3.0, 8.0));
        assert_eq!(store.outcome(), LoadOutcome::Loaded);
        assert_eq!(store.config().trip_delay_samples, 50);
        assert_eq!(store.config().soft_limit_amps, 3.0);
        assert_eq!(store.config().abs_limit_amps, 8.0);
        assert_eq!(store.storage().writes, 0, "a good load writes nothing");
    }

    #[test]
    fn test_invalid_record_restores_and_saves_defaults() {
        let store = ConfigStore::load(stored(25, 5.0, -5.0));
        assert_eq!(store.outcome(), LoadOutcome::Defaulted);
        assert_eq!(*store.config(), ThresholdConfig::DEFAULT);

        let storage = store.into_storage();
        assert_eq!(storage.writes, 1);
        assert_eq!(
            decode(&storage.bytes.unwrap()).unwrap(),
            ThresholdConfig::DEFAULT
        );
    }

    #[test]
    fn test_soft_above_abs_is_invalid() {
        let store = ConfigStore::load(stored(25, 12.0, 10.0));
        assert_eq!(store.outcome(), LoadOutcome::Defaulted);
    }

    #[test]
    fn test_unreadable_storage_restores_defaults() {
        let store = ConfigStore::load(MemoryStorage::default());
        assert_eq!(store.outcome(), LoadOutcome::Defaulted);
        assert_eq!(*store.config(), ThresholdConfig::DEFAULT);
        assert_eq!(store.storage().writes, 1);
    }

    #[test]
    fn test_erased_storage_restores_defaults() {
        let store = ConfigStore::load(MemoryStorage::with_record([0xFF; RECORD_SIZE]));
        assert_eq!(store.outcome(), LoadOutcome::Defaulted);
        assert_eq!(store.storage().writes, 1);
    }

    #[test]
    fn test_failed_default_write_keeps_defaults_live() {
        let storage = MemoryStorage {
            fail_writes: true,
            ..MemoryStorage::default()
        };
        let store = ConfigStore::load(storage);
        assert_eq!(*store.config(), ThresholdConfig::DEFAULT);
        assert_eq!(store.storage().writes, 0);
    }

    #[test]
    fn test_save_after_edit_round_trips() {
        let mut store = ConfigStore::load(stored(25, 5.0, 10.0));
        store.config_mut().adjust(Parameter::TripDelay, 2);
        store.save().unwrap();

        let reloaded = ConfigStore::load(store.into_storage());
        assert_eq!(reloaded.config().trip_delay_samples, 27);
    }

    #[test]
    fn test_save_reports_write_failure() {
        let mut store = ConfigStore::load(stored(25, 5.0, 10.0));
        let mut storage = store.into_storage();
        storage.fail_writes = true;
        store = ConfigStore::load(storage);
        assert_eq!(store.save(), Err(StorageError::Write));
    }
}
