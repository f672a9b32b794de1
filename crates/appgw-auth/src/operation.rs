//! Operation tags and results for background execution.
//!
//! An [`Operation`] names one of the five primitive actions together with its
//! arguments. An [`OperationRunner`] turns it into an [`OperationOutput`]; the
//! async harness runs that on a worker and hands the output back to the
//! owning context.

use std::fmt;

use appgw_core::{AgentEntity, ConnectionTraits, Credentials};
use async_trait::async_trait;
use serde_json::Value;

/// Which primitive action an operation runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Credentials → token.
    ObtainToken,
    /// Token → raw agent listing.
    ObtainAgents,
    /// Token → selected agent.
    ObtainAgent,
    /// Token + agent → session id.
    ObtainSession,
    /// Credentials → token → agent → session.
    Authenticate,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ObtainToken => "obtain_token",
            Self::ObtainAgents => "obtain_agents",
            Self::ObtainAgent => "obtain_agent",
            Self::ObtainSession => "obtain_session",
            Self::Authenticate => "authenticate",
        })
    }
}

/// A primitive action plus its arguments.
#[derive(Clone, Debug)]
pub enum Operation {
    /// Exchange credentials for a token.
    ObtainToken(Credentials),
    /// Fetch the agent listing with the traits' token.
    ObtainAgents(ConnectionTraits),
    /// Fetch the listing and select an agent.
    ObtainAgent(ConnectionTraits),
    /// Request a session for the agent in `agent_id_json`.
    ObtainSession {
        /// Traits holding the token.
        traits: ConnectionTraits,
        /// `{"agent_id":"<id>"}` request body.
        agent_id_json: String,
    },
    /// Run the full Token → Agent → Session pipeline.
    Authenticate(Credentials),
}

impl Operation {
    /// The tag of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::ObtainToken(_) => OperationKind::ObtainToken,
            Self::ObtainAgents(_) => OperationKind::ObtainAgents,
            Self::ObtainAgent(_) => OperationKind::ObtainAgent,
            Self::ObtainSession { .. } => OperationKind::ObtainSession,
            Self::Authenticate(_) => OperationKind::Authenticate,
        }
    }

    /// Session request for the agent already on `traits`.
    ///
    /// With no agent on `traits` the payload is empty and the session client
    /// reports a validation error.
    pub fn refresh_session(traits: ConnectionTraits) -> Self {
        let agent_id_json = traits
            .agent
            .as_ref()
            .map(AgentEntity::agent_id_json)
            .unwrap_or_default();
        Self::ObtainSession {
            traits,
            agent_id_json,
        }
    }

    /// Session request binding `traits`' token to a different agent.
    pub fn switch_agent(traits: ConnectionTraits, agent: &AgentEntity) -> Self {
        Self::ObtainSession {
            traits,
            agent_id_json: agent.agent_id_json(),
        }
    }
}

/// Result of running an [`Operation`].
#[derive(Clone, Debug)]
pub enum OperationOutput {
    /// Traits with a token or an error.
    Token(ConnectionTraits),
    /// Raw listing (empty on error) plus traits.
    Agents {
        /// Directory entries, unchanged.
        agents: Vec<Value>,
        /// Input traits, possibly with an error.
        traits: ConnectionTraits,
    },
    /// Selected agent plus traits.
    Agent {
        /// The chosen agent, if any.
        agent: Option<AgentEntity>,
        /// Input traits with the agent or an error.
        traits: ConnectionTraits,
    },
    /// Session id plus traits.
    Session {
        /// The new session id, if any.
        session_id: Option<String>,
        /// Input traits with the session or an error.
        traits: ConnectionTraits,
    },
    /// Fully populated traits, or the first error.
    Authenticated(ConnectionTraits),
}

impl OperationOutput {
    /// Which operation produced this output.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Token(_) => OperationKind::ObtainToken,
            Self::Agents { .. } => OperationKind::ObtainAgents,
            Self::Agent { .. } => OperationKind::ObtainAgent,
            Self::Session { .. } => OperationKind::ObtainSession,
            Self::Authenticated(_) => OperationKind::Authenticate,
        }
    }

    /// The traits carried by this output.
    pub fn traits(&self) -> &ConnectionTraits {
        match self {
            Self::Token(traits)
            | Self::Authenticated(traits)
            | Self::Agents { traits, .. }
            | Self::Agent { traits, .. }
            | Self::Session { traits, .. } => traits,
        }
    }

    /// Take the traits out of this output.
    pub fn into_traits(self) -> ConnectionTraits {
        match self {
            Self::Token(traits)
            | Self::Authenticated(traits)
            | Self::Agents { traits, .. }
            | Self::Agent { traits, .. }
            | Self::Session { traits, .. } => traits,
        }
    }
}

/// Executes operations. Implemented by the real router and by test fakes.
#[async_trait]
pub trait OperationRunner: Send + Sync + 'static {
    /// Run one operation to completion. Never fails; errors land on the traits.
    async fn run(&self, operation: Operation) -> OperationOutput;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
