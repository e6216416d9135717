//! Layered resolution of the effective settings.

use crate::settings::Settings;
use phone_core::Error;
use serde_json::Value;

/// Recursively merge `overlay` into `base`.
///
/// Objects merge key by key. Any other overlay value, `null` and arrays
/// included, replaces what `base` holds.
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, overlay_val) in overlay {
                match base.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base.insert(key.clone(), overlay_val.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Resolve the effective settings from persisted values, host overrides and
/// the built-in defaults, in that order of precedence.
pub fn resolve(persisted: Option<&Value>, overrides: Option<&Value>) -> Result<Settings, Error> {
    let layered = match (overrides, persisted) {
        (Some(overrides), Some(persisted)) => {
            let mut layered = overrides.clone();
            deep_merge(&mut layered, persisted);
            Some(layered)
        }
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    };

    let Some(layered) = layered else {
        return Ok(Settings::default());
    };

    let mut effective = serde_json::to_value(Settings::default())
        .map_err(|e| Error::Serialization(format!("Failed to serialize defaults: {}", e)))?;
    deep_merge(&mut effective, &layered);

    let settings: Settings = serde_json::from_value(effective)
        .map_err(|e| Error::Config(format!("Invalid settings: {}", e)))?;
    settings.validate()?;

    Ok(settings)
}
