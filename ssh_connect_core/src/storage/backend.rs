use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use directories::ProjectDirs;

use crate::errors::StoreError;

/// Name of the single slot that holds the serialized profile list.
pub const PROFILES_KEY: &str = "ssh-connections";

/// A durable key-value slot holding the serialized profile list.
pub trait ProfileBackend {
    /// Returns the stored payload, or `None` if nothing was ever saved.
    fn load(&self) -> Result<Option<String>, StoreError>;
    /// Replaces the stored payload.
    fn save(&self, payload: &str) -> Result<(), StoreError>;
}

/// Keeps the slot as a JSON file inside a config directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    /// `~/.config/ssh_connect` on Linux, `%APPDATA%\ssh_connect` on Windows, etc.
    pub fn new() -> io::Result<Self> {
        let proj = ProjectDirs::from("", "", "ssh_connect")
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Unable to locate config dir"))?;
        Self::in_dir(proj.config_dir())
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{PROFILES_KEY}.json"))
    }
}

impl ProfileBackend for FileBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path()) {
            Ok(payload) => Ok(Some(payload)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, payload: &str) -> Result<(), StoreError> {
        // Write next to the target and rename so a crash never leaves half a list.
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

/// In-process slot. Clones share the same slot, so a store can be reopened
/// over it to observe what was persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with `payload` already stored.
    pub fn with_payload(payload: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(payload.into()))),
        }
    }

    pub fn payload(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProfileBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.payload())
    }

    fn save(&self, payload: &str) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(payload.to_string());
        Ok(())
    }
}
