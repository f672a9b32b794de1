//! Wire-level constants shared by the gateway clients and the URL rewriter.

/// Proxy origin used when no router has been configured.
pub const DEFAULT_PROXY_URL: &str = "https://appgateway.windows.net/";

/// Browse path appended to the proxy origin in regular mode.
pub const BROWSER_PATH: &str = "connect/browser/";

/// Browse path appended to the proxy origin in smart mode.
pub const SMART_BROWSER_PATH: &str = "connect/smartbrowser/";

/// Path of the proxy's own status page.
pub const SYSTEM_PATH: &str = "system";

/// Path of the agent directory endpoint.
pub const AGENTS_PATH: &str = "user/agents";

/// Path of the session endpoint.
pub const SESSION_PATH: &str = "user/session";

/// Header carrying the security token on directory and session requests.
pub const AUTH_TOKEN_HEADER: &str = "X-Bhut-AuthN-Token";

/// Marker the proxy places in a page URL once the session has expired.
pub const SESSION_EXPIRED_MARKER: &str = "session-expired/?orig_url=";

/// Opening marker of the token inside a federation response.
pub const TOKEN_OPEN_TAG: &str = "<wst:RequestedSecurityToken>";

/// Closing marker of the token inside a federation response.
pub const TOKEN_CLOSE_TAG: &str = "</wst:RequestedSecurityToken>";

/// Scheme prefix for plain HTTP URLs.
pub const HTTP_PREFIX: &str = "http://";

/// Scheme prefix for HTTPS URLs.
pub const HTTPS_PREFIX: &str = "https://";

/// JSON key of the agent array in a directory response.
pub const JSON_AGENTS_KEY: &str = "agents";

/// JSON key of an agent's identifier.
pub const JSON_AGENT_ID_KEY: &str = "agent_id";

/// JSON key of an agent's display name.
pub const JSON_AGENT_DISPLAY_NAME_KEY: &str = "display_name";

/// JSON key of the session identifier in a session response.
pub const JSON_SESSION_ID_KEY: &str = "session_id";
