//! Normal ↔ cloudified URL rewriting.
//!
//! A cloudified URL routes through the proxy's browse endpoint and embeds the
//! session id and the original scheme:
//!
//! ```text
//! http://intranet/app/page
//!   ⇄ https://gw.example.com/connect/browser/S1/http/intranet/app/page
//! ```
//!
//! Both directions fail open: anything that cannot be rewritten comes back
//! unchanged.

use appgw_core::ProxyConfig;
use appgw_core::constants::{HTTP_PREFIX, HTTPS_PREFIX};
use tracing::debug;

const HTTP_SEGMENT: &str = "http";
const HTTPS_SEGMENT: &str = "https";

/// Rewriter bound to one proxy configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UrlRewriter {
    host_prefix: String,
    browse_endpoint: String,
}

impl UrlRewriter {
    /// Snapshot the host prefix and browse endpoint of `proxy`.
    pub fn new(proxy: &ProxyConfig) -> Self {
        Self {
            host_prefix: proxy.host_prefix().to_owned(),
            browse_endpoint: proxy.browse_endpoint(),
        }
    }

    /// Browse endpoint every cloudified URL starts with.
    pub fn browse_endpoint(&self) -> &str {
        &self.browse_endpoint
    }

    /// `url` already routes through the browse endpoint.
    pub fn is_cloud(&self, url: &str) -> bool {
        url.starts_with(&self.browse_endpoint)
    }

    /// Route `url` through the proxy under `session_id`.
    ///
    /// A URL on the bare proxy origin (a relative link resolved by a proxied
    /// page) is re-anchored onto `original_url` first.
    pub fn to_cloud(&self, url: &str, session_id: Option<&str>, original_url: Option<&str>) -> String {
        let Some(session_id) = session_id.filter(|s| !s.is_empty()) else {
            return url.to_owned();
        };
        if self.is_cloud(url) {
            return url.to_owned();
        }

        let anchored;
        let mut target = url;
        if let Some(relative) = url.strip_prefix(&self.host_prefix) {
            match self.reanchor(relative, original_url) {
                Some(joined) => {
                    anchored = joined;
                    target = &anchored;
                }
                None => return url.to_owned(),
            }
        }

        let (scheme, rest) = if let Some(rest) = target.strip_prefix(HTTPS_PREFIX) {
            (HTTPS_SEGMENT, rest)
        } else if let Some(rest) = target.strip_prefix(HTTP_PREFIX) {
            (HTTP_SEGMENT, rest)
        } else {
            (HTTP_SEGMENT, target)
        };
        format!("{}{session_id}/{scheme}/{rest}", self.browse_endpoint)
    }

    fn reanchor(&self, relative: &str, original_url: Option<&str>) -> Option<String> {
        let Some(original) = original_url.filter(|o| !o.is_empty()) else {
            debug!("no original url to re-anchor onto, leaving url as is");
            return None;
        };
        if self.is_cloud(original) {
            debug!("original url is already cloudified, leaving url as is");
            return None;
        }
        if original.ends_with('/') {
            Some(format!("{original}{relative}"))
        } else {
            Some(format!("{original}/{relative}"))
        }
    }

    /// Recover the origin URL from a cloudified one.
    pub fn to_normal(&self, url: &str) -> String {
        let Some(after_endpoint) = url.strip_prefix(&self.browse_endpoint) else {
            return url.to_owned();
        };
        // The session id is at least one character long.
        let Some(slash) = after_endpoint
            .char_indices()
            .skip(1)
            .find_map(|(i, c)| (c == '/').then_some(i))
        else {
            return url.to_owned();
        };
        let remainder = &after_endpoint[slash + 1..];
        match remainder.split_once('/') {
            Some((scheme, rest)) => format!("{scheme}://{rest}"),
            None => url.to_owned(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rewriter() -> UrlRewriter {
        UrlRewriter::new(&ProxyConfig::new("https://gw.example.com/", false))
    }

    #[test]
    fn cloudifies_http_url() {
        let cloud = rewriter().to_cloud("http://intranet/app/page", Some("S1"), None);
        assert_eq!(cloud, "https://gw.example.com/connect/browser/S1/http/intranet/app/page");
        assert_eq!(rewriter().to_normal(&cloud), "http://intranet/app/page");
    }

    #[test]
    fn cloudifies_https_url() {
        let cloud = rewriter().to_cloud("https://hr.corp/", Some("S1"), None);
        assert_eq!(cloud, "https://gw.example.com/connect/browser/S1/https/hr.corp/");
    }

    #[test]
    fn schemeless_url_is_treated_as_http() {
        let cloud = rewriter().to_cloud("intranet/x", Some("S1"), None);
        assert_eq!(cloud, "https://gw.example.com/connect/browser/S1/http/intranet/x");
    }

    #[test]
    fn smart_mode_uses_smart_path() {
        let rw = UrlRewriter::new(&ProxyConfig::new("https://gw.example.com/", true));
        let cloud = rw.to_cloud("http://a/b", Some("S1"), None);
        assert_eq!(cloud, "https://gw.example.com/connect/smartbrowser/S1/http/a/b");
        assert_eq!(rw.to_normal(&cloud), "http://a/b");
    }

    #[test]
    fn missing_session_is_noop() {
        let rw = rewriter();
        assert_eq!(rw.to_cloud("http://a/b", None, None), "http://a/b");
        assert_eq!(rw.to_cloud("http://a/b", Some(""), None), "http://a/b");
    }

    #[test]
    fn already_cloud_is_noop() {
        let url = "https://gw.example.com/connect/browser/S0/http/a/b";
        assert_eq!(rewriter().to_cloud(url, Some("S1"), None), url);
    }

    #[test]
    fn same_origin_link_is_reanchored() {
        let rw = rewriter();
        let cloud = rw.to_cloud(
            "https://gw.example.com/scripts/app.js",
            Some("S1"),
            Some("http://intranet/app"),
        );
        assert_eq!(
            cloud,
            "https://gw.example.com/connect/browser/S1/http/intranet/app/scripts/app.js"
        );
    }

    #[test]
    fn reanchor_avoids_double_slash() {
        let cloud = rewriter().to_cloud(
            "https://gw.example.com/x",
            Some("S1"),
            Some("https://intranet/"),
        );
        assert_eq!(cloud, "https://gw.example.com/connect/browser/S1/https/intranet/x");
    }

    #[test]
    fn reanchor_without_original_fails_open() {
        let url = "https://gw.example.com/x";
        assert_eq!(rewriter().to_cloud(url, Some("S1"), None), url);
        assert_eq!(rewriter().to_cloud(url, Some("S1"), Some("")), url);
    }

    #[test]
    fn reanchor_onto_cloud_original_fails_open() {
        let url = "https://gw.example.com/x";
        let original = "https://gw.example.com/connect/browser/S0/http/intranet";
        assert_eq!(rewriter().to_cloud(url, Some("S1"), Some(original)), url);
    }

    #[test]
    fn to_normal_leaves_foreign_urls() {
        let rw = rewriter();
        assert_eq!(rw.to_normal("http://intranet/a"), "http://intranet/a");
        assert_eq!(rw.to_normal("https://gw.example.com/system"), "https://gw.example.com/system");
    }

    #[test]
    fn to_normal_without_session_separator_is_unchanged() {
        let url = "https://gw.example.com/connect/browser/S1";
        assert_eq!(rewriter().to_normal(url), url);
        let bare = "https://gw.example.com/connect/browser/";
        assert_eq!(rewriter().to_normal(bare), bare);
    }

    #[test]
    fn to_normal_without_scheme_separator_is_unchanged() {
        let url = "https://gw.example.com/connect/browser/S1/http";
        assert_eq!(rewriter().to_normal(url), url);
    }

    #[test]
    fn expiry_url_normalizes_to_marker_path() {
        let url = "https://gw.example.com/connect/browser/S1/http/intranet/session-expired/?orig_url=x";
        assert_eq!(
            rewriter().to_normal(url),
            "http://intranet/session-expired/?orig_url=x"
        );
    }

    proptest! {
        #[test]
        fn round_trips(
            https in any::<bool>(),
            host in "[a-z]{1,10}(\\.[a-z]{2,5})?",
            path in "(/[A-Za-z0-9_.-]{0,8}){0,4}",
            sid in "[A-Za-z0-9]{1,16}",
        ) {
            let scheme = if https { "https" } else { "http" };
            let url = format!("{scheme}://{host}{path}");
            let rw = rewriter();
            let cloud = rw.to_cloud(&url, Some(&sid), Some(&url));
            prop_assert!(rw.is_cloud(&cloud));
            prop_assert_eq!(rw.to_normal(&cloud), url);
        }

        #[test]
        fn empty_session_never_rewrites(url in "\\PC{0,40}") {
            prop_assert_eq!(rewriter().to_cloud(&url, Some(""), Some("http://o/")), url);
        }

        #[test]
        fn non_endpoint_urls_stay_normal(url in "https?://[a-z]{1,8}(/[a-z]{0,6}){0,3}") {
            prop_assert_eq!(rewriter().to_normal(&url), url);
        }
    }
}
