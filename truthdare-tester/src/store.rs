//! Directory-backed key/value store: one file per key.
use std::fs;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use truthdare_game::KeyValueStore;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("invalid storage key \"{0}\"")]
    InvalidKey(String),
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, FileStoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| FileStoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, FileStoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(FileStoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    type Error = FileStoreError;

    fn get_item(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(FileStoreError::Io { path, source }),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        fs::write(&path, value).map_err(|source| FileStoreError::Io { path, source })
    }

    fn remove_item(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(FileStoreError::Io { path, source }),
        }
    }
}
