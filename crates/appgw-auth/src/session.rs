//! Session client: exchanges token + agent for a proxy session id.

use appgw_core::constants::{AUTH_TOKEN_HEADER, JSON_SESSION_ID_KEY, SESSION_PATH};
use appgw_core::{AgentEntity, ConnectionTraits, ErrorScope, GatewayError, ProxyConfig};
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info, warn};

/// No usable token on the input traits.
pub const SESSION_NO_TOKEN: &str = "Traits argument is null or does not contain valid token.";
/// No agent payload to bind the session to.
pub const SESSION_NO_AGENT: &str = "Traits argument does not contain a connector.";
/// Response had no session id.
pub const SESSION_EMPTY: &str = "Session is null or empty.";
/// Transport failure or non-JSON body.
pub const SESSION_RETRIEVAL_FAILED: &str = "Session retrieval failed.";

/// Read the session id out of a session response body.
pub fn parse_session_body(body: &str) -> Result<String, GatewayError> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "session body is not JSON");
        GatewayError::protocol(ErrorScope::Session, SESSION_RETRIEVAL_FAILED)
    })?;

    json.get(JSON_SESSION_ID_KEY)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| GatewayError::business(ErrorScope::Session, SESSION_EMPTY))
}

/// Request a session for the agent in `agent_id_json`.
///
/// `agent_id_json` is the `{"agent_id":"<id>"}` wrapper and is sent verbatim
/// once it is known to carry a non-empty id.
/// On success the session id is stored on `traits` and returned; on failure
/// the error is written to `traits`.
#[tracing::instrument(skip_all)]
pub async fn obtain_session(
    client: &reqwest::Client,
    proxy: &ProxyConfig,
    traits: &mut ConnectionTraits,
    agent_id_json: &str,
) -> Option<String> {
    let Some(token) = traits.token_header().map(str::to_owned) else {
        let _ = traits.fail(GatewayError::validation(ErrorScope::Session, SESSION_NO_TOKEN));
        return None;
    };
    let Some(agent) =
        AgentEntity::from_agent_id_json(agent_id_json).filter(|a| !a.agent_id.is_empty())
    else {
        let _ = traits.fail(GatewayError::validation(ErrorScope::Session, SESSION_NO_AGENT));
        return None;
    };
    debug!(agent_id = %agent.agent_id, "requesting session");

    let result = client
        .post(proxy.endpoint(SESSION_PATH))
        .header(AUTH_TOKEN_HEADER, token)
        .header(CONTENT_TYPE, "application/json")
        .body(agent_id_json.to_owned())
        .send()
        .await;
    let body = match result {
        Ok(response) => response.text().await,
        Err(e) => Err(e),
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "session request failed");
            let _ = traits.fail(GatewayError::transport(
                ErrorScope::Session,
                SESSION_RETRIEVAL_FAILED,
            ));
            return None;
        }
    };

    match parse_session_body(&body) {
        Ok(session_id) => {
            info!("session established");
            traits.set_session(session_id.clone());
            Some(session_id)
        }
        Err(e) => {
            let _ = traits.fail(e);
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
