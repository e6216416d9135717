//! Settings management for the softphone
//!
//! This crate resolves the effective settings at startup and
//! mediates every read and write against persistent storage.

use log::{debug, info};
use phone_core::Error;
use serde_json::Value;

pub mod merge;
pub mod overrides;
pub mod settings;
pub mod storage;

pub use overrides::{load_overrides, SettingsOverrides};
pub use settings::{
    CallstatsSettings, IceServer, PeerConnectionConfig, RtcpMuxPolicy, Settings, SocketSettings,
    ViaTransport, DEFAULT_SIP_DOMAIN,
};
pub use storage::{FileStorage, MemoryStorage, SettingsStorage};

/// Owner of the one current settings profile.
///
/// Built once by the host and handed to whoever needs it.
pub struct SettingsManager {
    settings: Settings,
    storage: Box<dyn SettingsStorage>,
}

impl SettingsManager {
    /// Resolve the effective settings from `storage`, `overrides` and the
    /// defaults. Persisted values win over overrides, which win over defaults.
    pub fn new(storage: Box<dyn SettingsStorage>, overrides: Option<Value>) -> Result<Self, Error> {
        let persisted = storage.get()?;

        match (&persisted, &overrides) {
            (Some(_), Some(_)) => debug!("settings found in storage, layering over overrides"),
            (Some(_), None) => debug!("settings found in storage"),
            (None, Some(_)) => debug!("override settings found"),
            (None, None) => debug!("no settings found, using default ones"),
        }

        let settings = merge::resolve(persisted.as_ref(), overrides.as_ref())?;
        info!(
            "Settings loaded (uri: {}, socket: {})",
            settings.uri.as_deref().unwrap_or("<unset>"),
            settings.socket.uri
        );

        Ok(Self { settings, storage })
    }

    /// Get the current settings
    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Owned copy of the current settings, for editing
    pub fn snapshot(&self) -> Settings {
        self.settings.clone()
    }

    /// Persist `settings` and make them current.
    ///
    /// On a storage failure the current settings are left unchanged.
    pub fn set(&mut self, settings: Settings) -> Result<(), Error> {
        self.storage.set(&settings)?;
        self.settings = settings;
        debug!("Settings updated");
        Ok(())
    }

    /// Erase the persisted entry and fall back to the defaults
    pub fn clear(&mut self) -> Result<(), Error> {
        self.storage.clear()?;
        self.settings = Settings::default();
        info!("Settings cleared");
        Ok(())
    }

    /// Whether storage holds a persisted entry, i.e. this is not a first run
    pub fn is_ready(&self) -> Result<bool, Error> {
        Ok(self.storage.get()?.is_some())
    }

    /// Domain used for synthesized identity URIs
    pub fn default_domain(&self) -> &'static str {
        DEFAULT_SIP_DOMAIN
    }
}
