//! Proxy origin and browse endpoint.
//!
//! The configured proxy is an explicit context object: components receive a
//! [`SharedProxy`] handle rather than reading process-wide state. Only the
//! owning context writes to it (router settings changes).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::constants::{
    BROWSER_PATH, DEFAULT_PROXY_URL, HTTP_PREFIX, HTTPS_PREFIX, SMART_BROWSER_PATH, SYSTEM_PATH,
};

/// Shared, mutable proxy configuration.
pub type SharedProxy = Arc<RwLock<ProxyConfig>>;

/// Proxy origin ("host prefix") plus the smart-mode flag selecting the browse path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    host_prefix: String,
    smart_browser: bool,
}

impl ProxyConfig {
    /// Create a configuration. A trailing `/` is added to the origin if missing.
    pub fn new(host_prefix: impl Into<String>, smart_browser: bool) -> Self {
        let mut host_prefix = host_prefix.into();
        if !host_prefix.ends_with('/') {
            host_prefix.push('/');
        }
        Self {
            host_prefix,
            smart_browser,
        }
    }

    /// Wrap into a [`SharedProxy`] handle.
    pub fn into_shared(self) -> SharedProxy {
        Arc::new(RwLock::new(self))
    }

    /// Proxy origin, always ending in `/`.
    pub fn host_prefix(&self) -> &str {
        &self.host_prefix
    }

    /// Smart mode selects the smart-browser path.
    pub fn smart_browser(&self) -> bool {
        self.smart_browser
    }

    /// The browse path for the current mode.
    pub fn browse_path(&self) -> &'static str {
        if self.smart_browser {
            SMART_BROWSER_PATH
        } else {
            BROWSER_PATH
        }
    }

    /// Host prefix joined with the browse path.
    pub fn browse_endpoint(&self) -> String {
        format!("{}{}", self.host_prefix, self.browse_path())
    }

    /// Absolute URL of an API path under the proxy origin.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.host_prefix, path.trim_start_matches('/'))
    }

    /// URL of the proxy's status page.
    pub fn system_url(&self) -> String {
        self.endpoint(SYSTEM_PATH)
    }

    /// Replace the origin (trailing `/` added if missing).
    pub fn set_host_prefix(&mut self, host_prefix: impl Into<String>) {
        *self = Self::new(host_prefix, self.smart_browser);
    }

    /// Switch between regular and smart mode.
    pub fn set_smart_browser(&mut self, smart_browser: bool) {
        self.smart_browser = smart_browser;
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self::new(DEFAULT_PROXY_URL, false)
    }
}

/// Normalize a user-entered router URL.
///
/// Surrounding whitespace is trimmed, `https://` is prefixed when the value has
/// no HTTP scheme, and a trailing `/` is appended when missing.
pub fn normalize_router_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut url = if trimmed.starts_with(HTTP_PREFIX) || trimmed.starts_with(HTTPS_PREFIX) {
        trimmed.to_owned()
    } else {
        format!("{HTTPS_PREFIX}{trimmed}")
    };
    if !url.ends_with('/') {
        url.push('/');
    }
    url
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
