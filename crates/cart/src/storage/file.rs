//! Directory-backed storage: one file per key.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ContextId, StorageArea, StorageError};

/// File extension for stored blobs.
const EXTENSION: &str = "json";

/// Storage area persisted as files in a directory.
///
/// Each key maps to `<dir>/<key>.json`. Writes go through a temporary file
/// and a rename, so readers never observe a half-written blob. There is no
/// native event delivery between processes.
///
/// An optional quota caps the bytes of keys and values across the whole
/// directory, like a browser's per-origin storage limit.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
    quota: Option<usize>,
    context: ContextId,
}

impl FileStorage {
    /// Open a storage area rooted at `dir`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            quota: None,
            context: ContextId::new(),
        }
    }

    /// Open a storage area rooted at `dir`, limited to `quota` bytes.
    #[must_use]
    pub fn with_quota(dir: impl Into<PathBuf>, quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Self::new(dir)
        }
    }

    /// The directory holding the blobs.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }

    /// Bytes used by every key except `key`.
    fn used_bytes_except(&self, key: &str) -> Result<usize, StorageError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut used: usize = 0;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem == key {
                continue;
            }
            let len = usize::try_from(fs::metadata(&path)?.len()).unwrap_or(usize::MAX);
            used = used.saturating_add(stem.len()).saturating_add(len);
        }
        Ok(used)
    }

    fn check_quota(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let Some(quota) = self.quota else {
            return Ok(());
        };
        let attempted = self
            .used_bytes_except(key)?
            .saturating_add(key.len())
            .saturating_add(value.len());
        if attempted > quota {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                attempted,
                quota,
            });
        }
        Ok(())
    }
}

/// Keys become file names, so only a conservative character set is allowed.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

impl StorageArea for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        self.check_quota(key, value)?;
        fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension(format!("{EXTENSION}.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;

        debug!(key, path = %path.display(), bytes = value.len(), "wrote storage file");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn context(&self) -> ContextId {
        self.context
    }
}
