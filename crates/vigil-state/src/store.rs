//! StateStore: JSON-file persistence for the probe's stall-detection state.

use std::fs::{self, File};
use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use vigil_core::{PersistedState, WarningKind};

use crate::error::{StateError, StateResult};

/// Outcome of a fail-soft [`StateStore::load`].
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedState {
    pub state: PersistedState,
    /// Set when an existing file could not be read or decoded.
    pub warning: Option<WarningKind>,
}

/// State file owned exclusively by the probe.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Strict read. `Ok(None)` when no state has been written yet.
    pub fn read(&self) -> StateResult<Option<PersistedState>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StateError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let state = serde_json::from_slice(&bytes)
            .map_err(|e| StateError::Deserialize(e.to_string()))?;
        Ok(Some(state))
    }

    /// Read the state, never failing.
    ///
    /// A missing file yields the default state silently; any other failure
    /// yields the default state and a warning.
    pub fn load(&self) -> LoadedState {
        match self.read() {
            Ok(Some(state)) => {
                debug!(path = ?self.path, "state loaded");
                LoadedState {
                    state,
                    warning: None,
                }
            }
            Ok(None) => {
                debug!(path = ?self.path, "no state file, starting fresh");
                LoadedState {
                    state: PersistedState::default(),
                    warning: None,
                }
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "state unreadable, starting fresh");
                LoadedState {
                    state: PersistedState::default(),
                    warning: Some(WarningKind::StateUnreadable {
                        reason: e.to_string(),
                    }),
                }
            }
        }
    }

    /// Write the state, replacing the previous document atomically.
    pub fn save(&self, state: &PersistedState) -> StateResult<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| StateError::Write {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let json = serde_json::to_vec(state).map_err(|e| StateError::Serialize(e.to_string()))?;
        let tmp_path = self.temp_path();

        if let Err(source) = write_synced(&tmp_path, &json) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StateError::Write {
                path: tmp_path,
                source,
            });
        }
        if let Err(source) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(StateError::Write {
                path: self.path.clone(),
                source,
            });
        }

        debug!(path = ?self.path, last_seen = ?state.last_seen, "state saved");
        Ok(())
    }

    /// Delete the state file. Returns true if it existed.
    pub fn clear(&self) -> StateResult<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "state cleared");
                Ok(true)
            }
            Err(e) if e.kind() == IoErrorKind::NotFound => Ok(false),
            Err(source) => Err(StateError::Write {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Sibling temp file, unique per process so overlapping runs never share one.
    fn temp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        self.path
            .with_file_name(format!(".{name}.{}.tmp", std::process::id()))
    }
}

fn write_synced(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use vigil_core::CounterValues;

    fn test_state() -> PersistedState {
        PersistedState {
            last: CounterValues {
                finality_events_total: Some(1042.0),
                anchors_received_total: Some(88.0),
                anchors_verified_total: Some(87.0),
            },
            last_seen: Some(1_700_000_000),
            updated: Some(1_700_000_300),
        }
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let state = test_state();
        store.save(&state).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.warning, None);
        assert_eq!(store.read().unwrap(), Some(state));
    }

    #[test]
    fn missing_file_is_default_without_warning() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("absent.json"));

        assert_eq!(store.read().unwrap(), None);
        let loaded = store.load();
        assert_eq!(loaded.state, PersistedState::default());
        assert_eq!(loaded.warning, None);
    }

    #[test]
    fn corrupted_file_is_default_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, b"{\"last\": {\"finality_events_total\": ").unwrap();
        let store = StateStore::new(&path);

        assert!(matches!(store.read(), Err(StateError::Deserialize(_))));
        let loaded = store.load();
        assert_eq!(loaded.state, PersistedState::default());
        assert!(matches!(
            loaded.warning,
            Some(WarningKind::StateUnreadable { .. })
        ));
    }

    #[test]
    fn directory_in_place_of_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path());

        let loaded = store.load();
        assert_eq!(loaded.state, PersistedState::default());
        assert!(loaded.warning.is_some());
    }

    #[test]
    fn save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("var/lib/vigil/state.json");
        let store = StateStore::new(&path);

        store.save(&test_state()).unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn save_replaces_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        store.save(&test_state()).unwrap();
        let mut newer = test_state();
        newer.updated = Some(1_700_000_600);
        store.save(&newer).unwrap();

        assert_eq!(store.read().unwrap(), Some(newer));
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn save_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let store = StateStore::new(blocker.join("state.json"));

        assert!(matches!(
            store.save(&test_state()),
            Err(StateError::Write { .. })
        ));
    }

    #[test]
    fn clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        assert!(!store.clear().unwrap());
        store.save(&test_state()).unwrap();
        assert!(store.clear().unwrap());
        assert_eq!(store.read().unwrap(), None);
    }

    #[test]
    fn on_disk_format_is_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let store = StateStore::new(&path);
        store.save(&test_state()).unwrap();

        let value: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["last"]["finality_events_total"], 1042.0);
        assert_eq!(value["last_seen"], 1_700_000_000u64);
        assert_eq!(value["updated"], 1_700_000_300u64);
    }
}
