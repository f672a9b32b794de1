//! Settings schema.
//!
//! Field names are camelCase on disk. Every section carries
//! `#[serde(default)]` so a partial file only overrides what it names.

use appgw_core::ProxyConfig;
use appgw_core::constants::DEFAULT_PROXY_URL;
use serde::{Deserialize, Serialize};

/// Root settings for the gateway client.
///
/// ```json
/// {
///   "proxy": { "hostPrefix": "https://gw.example.com/", "smartBrowser": true },
///   "logging": { "level": "debug" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// Proxy router selection.
    pub proxy: ProxySettings,
    /// Identity endpoint used for the credential exchange.
    pub token: TokenServiceSettings,
    /// HTTP transport tuning.
    pub http: HttpSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

/// Router URL and browse mode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProxySettings {
    /// Proxy origin, ending in `/`.
    pub host_prefix: String,
    /// Route pages through the smart-browser path.
    pub smart_browser: bool,
}

impl ProxySettings {
    /// Build the runtime proxy context from these settings.
    pub fn to_config(&self) -> ProxyConfig {
        ProxyConfig::new(self.host_prefix.clone(), self.smart_browser)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host_prefix: DEFAULT_PROXY_URL.to_string(),
            smart_browser: false,
        }
    }
}

/// WS-Trust identity endpoint parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenServiceSettings {
    /// Token issue endpoint.
    pub endpoint: String,
    /// `SOAPAction` header value.
    pub soap_action: String,
    /// Target resource the token is requested for.
    pub resource: String,
    /// Requested token lifetime in seconds.
    pub lifetime_secs: u64,
}

impl Default for TokenServiceSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://login.microsoftonline.com/extSTS.srf".to_string(),
            soap_action: "http://docs.oasis-open.org/ws-sx/ws-trust/200512/RST/Issue".to_string(),
            resource: "appgportal.cloudapp.net".to_string(),
            lifetime_secs: 600,
        }
    }
}

/// HTTP client options.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HttpSettings {
    /// Whole-request timeout. Unset leaves the transport default in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

/// Logging options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
