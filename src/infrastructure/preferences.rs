// Preference stores - toml file on disk, or process memory
use crate::application::preference_store::{PreferenceError, PreferenceStore};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Flat `key = "value"` toml file, rewritten on every change.
pub struct FilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferenceStore {
    /// A missing file is an empty store; an unreadable one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => toml::from_str(&raw).map_err(|e| PreferenceError::Corrupted {
                message: e.to_string(),
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!("Loaded preferences from {}", path.display());
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut values = self.lock();
        values.insert(key.to_string(), value.to_string());
        let raw = toml::to_string(&*values).map_err(|e| PreferenceError::SaveFailed {
            message: e.to_string(),
        })?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// Nothing survives the process.
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.values
            .lock()
            .map_err(|_| PreferenceError::SaveFailed {
                message: "preference lock poisoned".to_string(),
            })?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_round_trips_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");

        let store = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(store.get("baristaDarkTheme"), None);
        store.set("baristaDarkTheme", "true").unwrap();

        let reopened = FilePreferenceStore::open(&path).unwrap();
        assert_eq!(reopened.get("baristaDarkTheme").as_deref(), Some("true"));
    }

    #[test]
    fn test_corrupted_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = FilePreferenceStore::open(&path).err().unwrap();
        assert!(matches!(err, PreferenceError::Corrupted { .. }));
    }

    #[test]
    fn test_unwritable_location_fails_to_save() {
        let dir = tempfile::tempdir().unwrap();
        let store = FilePreferenceStore::open(dir.path().join("missing/prefs.toml")).unwrap();
        assert!(matches!(
            store.set("theme", "dark"),
            Err(PreferenceError::Io { .. })
        ));
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryPreferenceStore::default();
        store.set("theme", "dark").unwrap();
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
    }
}
