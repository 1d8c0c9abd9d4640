//! What the main phase left on disk, as seen by the post phase.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::gha::StateStore;

pub const KEYCHAIN_PATH: &str = "keychainPath";
pub const KEYCHAIN_SEARCH_PATH: &str = "keychainSearchPath";
pub const KEY_PATH: &str = "keyPath";
pub const PROVISIONING_PROFILE_PATHS: &str = "provisioningProfilePaths";

/// Every state key a [`SecretsRecord`] occupies
pub const STATE_KEYS: [&str; 4] = [
    KEYCHAIN_PATH,
    KEYCHAIN_SEARCH_PATH,
    KEY_PATH,
    PROVISIONING_PROFILE_PATHS,
];

/// Secret-bearing resources created by the main phase
///
/// Holds paths and registration details only; secret values never enter it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretsRecord {
    pub keychain_path: Option<PathBuf>,
    /// User keychain search list before ours was prepended
    pub keychain_search_path: Option<Vec<String>>,
    pub key_path: Option<PathBuf>,
    pub provisioning_profile_paths: Vec<PathBuf>,
}

impl SecretsRecord {
    pub fn is_empty(&self) -> bool {
        self.keychain_path.is_none()
            && self.keychain_search_path.is_none()
            && self.key_path.is_none()
            && self.provisioning_profile_paths.is_empty()
    }

    /// Read the record back from state
    ///
    /// Unreadable list values are dropped with a warning; the post phase has
    /// nothing better to fall back on.
    pub fn load(state: &dyn StateStore) -> Self {
        let record = Self {
            keychain_path: state.get(KEYCHAIN_PATH).map(PathBuf::from),
            keychain_search_path: load_list(state, KEYCHAIN_SEARCH_PATH),
            key_path: state.get(KEY_PATH).map(PathBuf::from),
            provisioning_profile_paths: load_list(state, PROVISIONING_PROFILE_PATHS)
                .unwrap_or_default(),
        };
        debug!(?record, "loaded secrets record");
        record
    }

    /// Forget the record so a repeated post phase does nothing
    pub fn clear(state: &dyn StateStore) -> Result<()> {
        for key in STATE_KEYS {
            if state.get(key).is_some() {
                state.clear(key)?;
            }
        }
        Ok(())
    }
}

fn load_list<T: for<'de> Deserialize<'de>>(state: &dyn StateStore, key: &str) -> Option<Vec<T>> {
    let text = state.get(key)?;
    match serde_json::from_str(&text) {
        Ok(list) => Some(list),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable state value");
            None
        }
    }
}

/// Writes a [`SecretsRecord`] through to state as resources are created
///
/// Each path is persisted before the resource it names exists, so a crash
/// midway still leaves the post phase enough to clean up.
pub struct SecretsLedger<'a> {
    state: &'a dyn StateStore,
    record: SecretsRecord,
}

impl<'a> SecretsLedger<'a> {
    pub fn new(state: &'a dyn StateStore) -> Self {
        Self {
            state,
            record: SecretsRecord::default(),
        }
    }

    pub fn keychain_path(&mut self, path: &Path) -> Result<()> {
        self.state.save(KEYCHAIN_PATH, &path.display().to_string())?;
        self.record.keychain_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn keychain_search_path(&mut self, search_path: &[String]) -> Result<()> {
        self.state.save(KEYCHAIN_SEARCH_PATH, &serde_json::to_string(search_path)?)?;
        self.record.keychain_search_path = Some(search_path.to_vec());
        Ok(())
    }

    pub fn key_path(&mut self, path: &Path) -> Result<()> {
        self.state.save(KEY_PATH, &path.display().to_string())?;
        self.record.key_path = Some(path.to_path_buf());
        Ok(())
    }

    pub fn provisioning_profile(&mut self, path: &Path) -> Result<()> {
        let mut paths = self.record.provisioning_profile_paths.clone();
        paths.push(path.to_path_buf());
        let encoded = serde_json::to_string(&paths)?;
        self.state.save(PROVISIONING_PROFILE_PATHS, &encoded)?;
        self.record.provisioning_profile_paths = paths;
        Ok(())
    }

    pub fn record(&self) -> &SecretsRecord {
        &self.record
    }

    pub fn into_record(self) -> SecretsRecord {
        self.record
    }
}
