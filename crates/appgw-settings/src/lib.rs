//! # appgw-settings
//!
//! Layered configuration for the application gateway client.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`GatewaySettings::default()`]
//! 2. **User file**: `~/.appgw/settings.json`, deep-merged over defaults
//! 3. **Environment variables**: `APPGW_*` overrides
//!
//! The router URL and smart-mode flag chosen on the router settings screen
//! are persisted here through [`save_settings`].

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    data_dir, deep_merge, load_settings, load_settings_from_path, save_settings,
    save_settings_to_path, settings_path,
};
pub use types::{GatewaySettings, HttpSettings, LoggingSettings, ProxySettings, TokenServiceSettings};

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
