//! Persistent display-name storage.
//!
//! One fixed key holds the last display name used to join. It is read once at
//! startup and written once at a successful join; nothing here clears it.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Storage key for the remembered display name.
pub const DISPLAY_NAME_KEY: &str = "mdshare.displayName";

/// Key-value storage for the display name.
pub trait IdentityStore: Send {
    fn load(&self) -> Result<Option<String>, IdentityError>;
    fn save(&mut self, display_name: &str) -> Result<(), IdentityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Identity store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Identity store is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    entries: HashMap<String, String>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with a remembered name.
    pub fn with_name(display_name: impl Into<String>) -> Self {
        let mut entries = HashMap::new();
        entries.insert(DISPLAY_NAME_KEY.to_string(), display_name.into());
        Self { entries }
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        Ok(self.entries.get(DISPLAY_NAME_KEY).cloned())
    }

    fn save(&mut self, display_name: &str) -> Result<(), IdentityError> {
        self.entries
            .insert(DISPLAY_NAME_KEY.to_string(), display_name.to_string());
        Ok(())
    }
}

/// JSON object on disk, `{"mdshare.displayName": "Alice"}`.
///
/// Unrelated keys already in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<config dir>/mdshare/identity.json`, when the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mdshare").join("identity.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<HashMap<String, String>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(HashMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        Ok(self.read_entries()?.remove(DISPLAY_NAME_KEY))
    }

    fn save(&mut self, display_name: &str) -> Result<(), IdentityError> {
        let mut entries = self.read_entries()?;
        entries.insert(DISPLAY_NAME_KEY.to_string(), display_name.to_string());
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&entries)?)?;
        Ok(())
    }
}
