//! Host-injected override settings.
//!
//! Read once at startup from an optional TOML file and from `SOFTPHONE__*`
//! environment variables, e.g. `SOFTPHONE__SOCKET__URI=wss://sip.example.com`.
//! Environment values take precedence over the file.
//!
//! Values are read into [`SettingsOverrides`], so each one takes the type of
//! the setting it names: `SOFTPHONE__AUTHORIZATION_USER=1002` is the string
//! `"1002"`, `SOFTPHONE__SESSION_TIMERS=true` is a boolean.

use crate::settings::{IceServer, RtcpMuxPolicy, ViaTransport};
use config::{Config, Environment, File, FileFormat};
use log::debug;
use phone_core::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

pub const ENV_PREFIX: &str = "SOFTPHONE";
const ENV_SEPARATOR: &str = "__";

/// A partial [`Settings`](crate::Settings): only the keys the host provided.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<SocketOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registrar_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_timers: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub use_preloaded_route: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pc_config: Option<PeerConnectionOverrides>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callstats: Option<CallstatsOverrides>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_transport: Option<ViaTransport>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConnectionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtcp_mux_policy: Option<RtcpMuxPolicy>,
    /// Replaces the whole list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ice_servers: Option<Vec<IceServer>>,
}

/// Partial [`CallstatsSettings`](crate::CallstatsSettings)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallstatsOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,
}

/// Load overrides from `path` (if given) and the process environment.
///
/// Returns `None` when neither source provides a single key.
pub fn load_overrides(path: Option<&Path>) -> Result<Option<Value>, Error> {
    load_overrides_with(path, environment())
}

// Values stay strings here; deserializing into `SettingsOverrides` converts
// them per field, so "007" keeps its leading zeros.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_SEPARATOR)
        .separator(ENV_SEPARATOR)
}

fn load_overrides_with(path: Option<&Path>, env: Environment) -> Result<Option<Value>, Error> {
    let mut builder = Config::builder();
    if let Some(path) = path {
        debug!("Reading override settings from {:?}", path);
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(true));
    }

    let config = builder
        .add_source(env)
        .build()
        .map_err(|e| Error::Config(format!("Failed to load override settings: {}", e)))?;

    let overrides: SettingsOverrides = config
        .try_deserialize()
        .map_err(|e| Error::Config(format!("Failed to read override settings: {}", e)))?;

    let value = serde_json::to_value(&overrides)
        .map_err(|e| Error::Serialization(format!("Failed to serialize override settings: {}", e)))?;

    match value {
        Value::Object(table) if !table.is_empty() => {
            debug!("Override settings found for keys {:?}", table.keys().collect::<Vec<_>>());
            Ok(Some(Value::Object(table)))
        }
        _ => {
            debug!("No override settings found");
            Ok(None)
        }
    }
}
