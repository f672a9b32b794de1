//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`GatewaySettings::default()`]
//! 2. If `~/.appgw/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `APPGW_*` environment overrides (highest priority)

use std::path::{Path, PathBuf};

use appgw_core::normalize_router_url;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::GatewaySettings;

/// Directory holding settings and auth state (`~/.appgw`).
pub fn data_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".appgw")
}

/// Path of the settings file (`~/.appgw/settings.json`).
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Load settings from the default path with env overrides.
pub fn load_settings() -> Result<GatewaySettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path` with env overrides.
///
/// A missing file yields defaults. Invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<GatewaySettings> {
    let defaults = serde_json::to_value(GatewaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: GatewaySettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    Ok(settings)
}

/// Write settings as pretty JSON, creating parent directories.
pub fn save_settings_to_path(path: &Path, settings: &GatewaySettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    debug!(?path, "settings saved");
    Ok(())
}

/// Write settings to the default path.
pub fn save_settings(settings: &GatewaySettings) -> Result<()> {
    save_settings_to_path(&settings_path(), settings)
}

/// Recursive deep merge of two JSON values.
///
/// Objects merge per key, arrays and primitives are replaced by `source`,
/// and nulls in `source` leave `target` untouched.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `APPGW_*` environment overrides from the process environment.
pub fn apply_env_overrides(settings: &mut GatewaySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using an arbitrary variable lookup.
///
/// Empty values are ignored; invalid values are logged and ignored.
pub fn apply_overrides_from<F>(settings: &mut GatewaySettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("APPGW_PROXY_URL") {
        settings.proxy.host_prefix = normalize_router_url(&v);
    }
    if let Some(v) = read("APPGW_SMART_BROWSER") {
        match parse_bool(&v) {
            Some(b) => settings.proxy.smart_browser = b,
            None => warn!(key = "APPGW_SMART_BROWSER", value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = read("APPGW_TOKEN_ENDPOINT") {
        settings.token.endpoint = v;
    }
    if let Some(v) = read("APPGW_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("APPGW_HTTP_TIMEOUT_MS") {
        match parse_u64_range(&v, 1000, 600_000) {
            Some(ms) => settings.http.timeout_ms = Some(ms),
            None => warn!(key = "APPGW_HTTP_TIMEOUT_MS", value = %v, "invalid timeout env var, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`, case-insensitively.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a `u64` within `min..=max`.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
