//! Token client: exchanges credentials for a security token (WS-Trust issue).
//!
//! The request is a fixed SOAP envelope with the username, password, a
//! creation timestamp, an expiry timestamp, and the target resource spliced in.
//! A successful body carries the token between fixed markers; a failed one is
//! a SOAP fault (see [`crate::fault`]).

use appgw_core::{ConnectionTraits, Credentials, ErrorScope, GatewayError, SecurityToken};
use appgw_core::constants::TOKEN_OPEN_TAG;
use appgw_settings::TokenServiceSettings;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info, warn};

use crate::fault::SoapFault;

/// Fault could not be interpreted.
pub const TOKEN_RETRIEVAL_FAILED: &str = "Token retrieval failed.";
/// Transport failure or unreadable body.
pub const TOKEN_RETRIEVAL_EXCEPTION: &str = "Token retrieval failed with exception.";

const SOAP_CONTENT_TYPE: &str = "application/soap+xml; charset=utf-8";

macro_rules! request_template {
    () => {
        concat!(
            "<s:Envelope xmlns:s='http://www.w3.org/2003/05/soap-envelope' ",
            "xmlns:o='http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd' ",
            "xmlns:p='http://schemas.xmlsoap.org/ws/2004/09/policy' ",
            "xmlns:u='http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd' ",
            "xmlns:a='http://www.w3.org/2005/08/addressing' ",
            "xmlns:wssc='http://schemas.xmlsoap.org/ws/2005/02/sc' ",
            "xmlns:t='http://schemas.xmlsoap.org/ws/2005/02/trust'>",
            "<s:Header>",
            "<o:Security>",
            "<u:Timestamp u:Id='_0'>",
            "<u:Created>{created}</u:Created>",
            "<u:Expires>{expires}</u:Expires>",
            "</u:Timestamp>",
            "<o:UsernameToken u:Id='uuid-588aa9a6-b538-49c4-9112-625ec501575d-8'>",
            "<o:Username>{user}</o:Username>",
            "<o:Password>{pass}</o:Password>",
            "</o:UsernameToken>",
            "</o:Security>",
            "</s:Header>",
            "<s:Body>",
            "<t:RequestSecurityToken>",
            "<p:AppliesTo>",
            "<a:EndpointReference>",
            "<a:Address>{resource}</a:Address>",
            "</a:EndpointReference>",
            "</p:AppliesTo>",
            "<t:RequestType>http://schemas.xmlsoap.org/ws/2005/02/trust/Issue</t:RequestType>",
            "<p:PolicyReference URI='MCMBI'></p:PolicyReference>",
            "<o:LoginOptions>3</o:LoginOptions>",
            "</t:RequestSecurityToken>",
            "</s:Body>",
            "</s:Envelope>",
        )
    };
}

/// UTC timestamp in the `YYYY-MM-DDTHH:MM:SS.mmmZ` form the endpoint expects.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Build the issue request envelope.
///
/// Username and password are XML-escaped. The expiry is `created + lifetime`.
pub fn build_request_envelope(
    credentials: &Credentials,
    resource: &str,
    created: DateTime<Utc>,
    lifetime: Duration,
) -> String {
    format!(
        request_template!(),
        created = format_timestamp(created),
        expires = format_timestamp(created + lifetime),
        user = quick_xml::escape::escape(credentials.username.as_str()),
        pass = quick_xml::escape::escape(credentials.password.as_str()),
        resource = quick_xml::escape::escape(resource),
    )
}

/// Turn a response body into traits holding either a token or an error.
pub fn interpret_response(body: &str) -> ConnectionTraits {
    // The framed element is the token even when nothing sits between the
    // markers; the gateway rejects it later if it is unusable.
    if let Some(token) = SecurityToken::extract(body) {
        return ConnectionTraits::with_token(token);
    }
    if body.contains(TOKEN_OPEN_TAG) {
        debug!("token element is not closed");
        return token_error(GatewayError::protocol(ErrorScope::Token, TOKEN_RETRIEVAL_FAILED));
    }

    match SoapFault::parse(body) {
        Ok(fault) => match fault.describe() {
            Some(text) => {
                warn!(reason = ?fault.reason, detail = ?fault.detail, "token request rejected");
                token_error(GatewayError::business(ErrorScope::Token, text))
            }
            None => {
                warn!("token response is neither a token nor a readable fault");
                token_error(GatewayError::protocol(ErrorScope::Token, TOKEN_RETRIEVAL_FAILED))
            }
        },
        Err(e) => {
            warn!(error = %e, "token response could not be parsed");
            token_error(GatewayError::protocol(ErrorScope::Token, TOKEN_RETRIEVAL_EXCEPTION))
        }
    }
}

fn token_error(error: GatewayError) -> ConnectionTraits {
    ConnectionTraits::failed(error)
}

/// Exchange credentials for a token.
///
/// Never fails outright: the returned traits hold exactly one of a token or
/// an error.
#[tracing::instrument(skip_all, fields(endpoint = %service.endpoint))]
pub async fn obtain_token(
    client: &reqwest::Client,
    service: &TokenServiceSettings,
    credentials: &Credentials,
) -> ConnectionTraits {
    let lifetime = i64::try_from(service.lifetime_secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::minutes(10));
    let envelope = build_request_envelope(credentials, &service.resource, Utc::now(), lifetime);

    let response = match client
        .post(&service.endpoint)
        .header("SOAPAction", &service.soap_action)
        .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
        .body(envelope)
        .send()
        .await
    {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "token request failed");
            return token_error(GatewayError::transport(
                ErrorScope::Token,
                TOKEN_RETRIEVAL_EXCEPTION,
            ));
        }
    };

    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(b) => b,
        Err(e) => {
            warn!(status, error = %e, "token response body unreadable");
            return token_error(GatewayError::transport(
                ErrorScope::Token,
                TOKEN_RETRIEVAL_EXCEPTION,
            ));
        }
    };

    let traits = interpret_response(&body);
    if !traits.is_error() {
        info!(status, "security token obtained");
    }
    traits
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
