//! Persistent storage for the settings document.

use crate::settings::Settings;
use log::{debug, trace};
use phone_core::Error;
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const APP_DIR: &str = "softphone";
const SETTINGS_FILE: &str = "settings.json";

/// Synchronous key-value contract for the one persisted settings entry.
#[cfg_attr(test, mockall::automock)]
pub trait SettingsStorage {
    /// The persisted document, `None` when nothing has been stored yet.
    fn get(&self) -> Result<Option<Value>, Error>;

    fn set(&mut self, settings: &Settings) -> Result<(), Error>;

    fn clear(&mut self) -> Result<(), Error>;
}

/// JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage in the user's data directory
    pub fn new() -> Result<Self, Error> {
        let mut data_dir = dirs::data_dir()
            .ok_or_else(|| Error::Config("Failed to determine data directory".to_string()))?;
        data_dir.push(APP_DIR);

        Ok(Self {
            path: data_dir.join(SETTINGS_FILE),
        })
    }

    /// Storage at an explicit path
    pub fn with_file<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStorage for FileStorage {
    fn get(&self) -> Result<Option<Value>, Error> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!("No settings file at {:?}", self.path);
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::Storage(format!(
                    "Failed to read {:?}: {}",
                    self.path, e
                )))
            }
        };

        let value: Value = serde_json::from_str(&contents)
            .map_err(|e| Error::Storage(format!("Failed to parse {:?}: {}", self.path, e)))?;

        Ok(match value {
            Value::Null => None,
            value => Some(value),
        })
    }

    fn set(&mut self, settings: &Settings) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|e| Error::Serialization(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| {
                    Error::Storage(format!("Failed to create {:?}: {}", parent, e))
                })?;
            }
        }

        fs::write(&self.path, json)
            .map_err(|e| Error::Storage(format!("Failed to write {:?}: {}", self.path, e)))?;

        debug!("Saved settings to {:?}", self.path);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Removed settings file {:?}", self.path);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to remove {:?}: {}",
                self.path, e
            ))),
        }
    }
}

/// In-process storage. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slot: Rc<RefCell<Option<Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that starts out holding `value`
    pub fn with_value(value: Value) -> Self {
        Self {
            slot: Rc::new(RefCell::new(Some(value))),
        }
    }
}

impl SettingsStorage for MemoryStorage {
    fn get(&self) -> Result<Option<Value>, Error> {
        Ok(self.slot.borrow().clone())
    }

    fn set(&mut self, settings: &Settings) -> Result<(), Error> {
        let value = serde_json::to_value(settings)
            .map_err(|e| Error::Serialization(format!("Failed to serialize settings: {}", e)))?;
        *self.slot.borrow_mut() = Some(value);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Error> {
        self.slot.borrow_mut().take();
        Ok(())
    }
}
