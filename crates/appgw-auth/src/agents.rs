//! Agent directory client and agent selection.

use appgw_core::constants::{
    AGENTS_PATH, AUTH_TOKEN_HEADER, JSON_AGENT_DISPLAY_NAME_KEY, JSON_AGENT_ID_KEY, JSON_AGENTS_KEY,
};
use appgw_core::{AgentEntity, ConnectionTraits, ErrorScope, GatewayError, ProxyConfig};
use serde_json::Value;
use tracing::{debug, info, warn};

/// No usable token on the input traits.
pub const AGENT_NO_TOKEN: &str = "Traits argument is null or does not contain valid token.";
/// Directory returned no agents.
pub const AGENT_NONE_FOUND: &str = "No connectors found.";
/// An entry lacked its id or name.
pub const AGENT_PARSING_FAILED: &str = "Connectors list parsing failed.";
/// Transport failure or non-JSON body.
pub const AGENT_RETRIEVAL_FAILED: &str = "Connectors retrieval failed.";
/// The preferred entry matched but carries an empty id.
pub const AGENT_ID_EMPTY: &str = "Connector ID is empty.";
/// The default entry carries an empty id.
pub const AGENT_ID_NULL_OR_EMPTY: &str = "Connector ID is null or empty.";

/// Read one directory entry. `None` when either field is missing or not a string.
pub fn parse_agent_entry(item: &Value) -> Option<AgentEntity> {
    let agent_id = item.get(JSON_AGENT_ID_KEY)?.as_str()?;
    let display_name = item.get(JSON_AGENT_DISPLAY_NAME_KEY)?.as_str()?;
    Some(AgentEntity::new(agent_id, display_name))
}

/// Extract the non-empty agent array from a directory response body.
pub fn parse_agents_body(body: &str) -> Result<Vec<Value>, GatewayError> {
    let json: Value = serde_json::from_str(body).map_err(|e| {
        debug!(error = %e, "agent directory body is not JSON");
        GatewayError::protocol(ErrorScope::Agent, AGENT_RETRIEVAL_FAILED)
    })?;

    match json.get(JSON_AGENTS_KEY).and_then(Value::as_array) {
        Some(agents) if !agents.is_empty() => Ok(agents.clone()),
        _ => Err(GatewayError::business(ErrorScope::Agent, AGENT_NONE_FOUND)),
    }
}

/// Pick an agent from the directory listing.
///
/// Entries are scanned in order. Index 0 is the default. The first entry that
/// matches `preferred` by id and display name wins and ends the scan. A
/// malformed entry reached during the scan aborts it.
pub fn select_agent(
    agents: &[Value],
    preferred: Option<&AgentEntity>,
) -> Result<AgentEntity, GatewayError> {
    let mut default = None;

    for (index, item) in agents.iter().enumerate() {
        let Some(entry) = parse_agent_entry(item) else {
            warn!(index, "malformed agent entry");
            return Err(GatewayError::protocol(ErrorScope::Agent, AGENT_PARSING_FAILED));
        };

        if preferred.is_some_and(|p| p.matches(&entry)) {
            if entry.agent_id.is_empty() {
                return Err(GatewayError::validation(ErrorScope::Agent, AGENT_ID_EMPTY));
            }
            debug!(index, agent_id = %entry.agent_id, "preferred agent found");
            return Ok(entry);
        }

        if index == 0 {
            default = Some(entry);
        }
    }

    match default {
        Some(agent) if !agent.agent_id.is_empty() => Ok(agent),
        _ => Err(GatewayError::validation(
            ErrorScope::Agent,
            AGENT_ID_NULL_OR_EMPTY,
        )),
    }
}

/// Fetch the raw agent listing.
///
/// On failure the error is written to `traits` and `None` is returned.
#[tracing::instrument(skip_all)]
pub async fn obtain_agents(
    client: &reqwest::Client,
    proxy: &ProxyConfig,
    traits: &mut ConnectionTraits,
) -> Option<Vec<Value>> {
    let Some(token) = traits.token_header().map(str::to_owned) else {
        let _ = traits.fail(GatewayError::validation(ErrorScope::Agent, AGENT_NO_TOKEN));
        return None;
    };

    let body = match fetch_directory(client, proxy, &token).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "agent directory request failed");
            let _ = traits.fail(GatewayError::transport(
                ErrorScope::Agent,
                AGENT_RETRIEVAL_FAILED,
            ));
            return None;
        }
    };

    match parse_agents_body(&body) {
        Ok(agents) => {
            debug!(count = agents.len(), "agent directory fetched");
            Some(agents)
        }
        Err(e) => {
            let _ = traits.fail(e);
            None
        }
    }
}

async fn fetch_directory(
    client: &reqwest::Client,
    proxy: &ProxyConfig,
    token: &str,
) -> Result<String, reqwest::Error> {
    client
        .get(proxy.endpoint(AGENTS_PATH))
        .header(AUTH_TOKEN_HEADER, token)
        .send()
        .await?
        .text()
        .await
}

/// Fetch the directory and select one agent.
///
/// On success the agent is also stored on `traits`.
#[tracing::instrument(skip_all)]
pub async fn obtain_agent(
    client: &reqwest::Client,
    proxy: &ProxyConfig,
    traits: &mut ConnectionTraits,
    preferred: Option<&AgentEntity>,
) -> Option<AgentEntity> {
    let agents = obtain_agents(client, proxy, traits).await?;
    if traits.is_error() {
        return None;
    }

    match select_agent(&agents, preferred) {
        Ok(agent) => {
            info!(agent_id = %agent.agent_id, "agent selected");
            traits.set_agent(agent.clone());
            Some(agent)
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
