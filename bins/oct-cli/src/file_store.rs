//! JSON-file-backed [`KeyValueStore`].
//!
//! The file is a flat JSON object of base64 values. Every `set` rewrites the
//! whole file through a temporary sibling and a rename, so a crash leaves
//! either the old or the new file, never a torn one. `set_many` applies a
//! whole batch before the single rewrite.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use oct_wallet::{KeyValueStore, WalletError};

pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self, WalletError> {
        let entries = match fs::read(path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| WalletError::Storage(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(WalletError::Storage(format!("{}: {e}", path.display()))),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), WalletError> {
        let storage = |e: std::io::Error| WalletError::Storage(format!("{}: {e}", self.path.display()));
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(storage)?;
        }
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|e| WalletError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(storage)?;
        restrict_permissions(&tmp).map_err(storage)?;
        fs::rename(&tmp, &self.path).map_err(storage)
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, WalletError> {
        self.entries
            .get(key)
            .map(|v| {
                STANDARD
                    .decode(v)
                    .map_err(|_| WalletError::Storage(format!("value for {key} is not base64")))
            })
            .transpose()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), WalletError> {
        self.entries.insert(key.to_string(), STANDARD.encode(value));
        self.persist()
    }

    fn remove(&mut self, key: &str) -> Result<(), WalletError> {
        if self.entries.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, &[u8])]) -> Result<(), WalletError> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), STANDARD.encode(value));
        }
        self.persist()
    }
}
