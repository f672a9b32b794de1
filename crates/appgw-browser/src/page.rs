//! Collaborators the browser session drives: the page host and agent-scoped storage.

use std::io;
use std::path::{Path, PathBuf};

use appgw_core::AgentEntity;
use serde::Serialize;
use tracing::debug;

/// Label prefix for the agent currently carrying the session.
pub const IN_USE_PREFIX: &str = "[CURRENTLY IN USE] ";

/// Prompt shown when recovery could not restore the session.
pub const SESSION_EXPIRED_PROMPT: &str = "Your session has expired. Please sign in again.";

/// Rendering surface: loads pages and presents prompts.
///
/// All methods are called on the owning context.
pub trait PageHost {
    /// Start loading a (cloudified) URL.
    fn load_url(&mut self, url: &str);

    /// Stop the in-flight page load.
    fn stop_loading(&mut self);

    /// Ask the user to sign in, optionally explaining why.
    fn show_sign_in(&mut self, message: Option<&str>);

    /// Blocking notification for a background failure.
    fn notify_error(&mut self, message: &str);

    /// Present the agent directory.
    fn show_agents(&mut self, agents: &[AgentListing]);

    /// Background work started or finished.
    fn show_activity(&mut self, _busy: bool) {}
}

/// One row of the agent chooser.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentListing {
    /// The agent.
    pub agent: AgentEntity,
    /// The current session is bound to this agent.
    pub in_use: bool,
}

impl AgentListing {
    /// Display label, prefixed when in use.
    pub fn label(&self) -> String {
        if self.in_use {
            format!("{IN_USE_PREFIX}{}", self.agent.display_name)
        } else {
            self.agent.display_name.clone()
        }
    }
}

/// Per-agent local data (bookmarks, history) that follows the selected agent.
pub trait AgentScopedStore {
    /// Point the store at `agent_id`'s data.
    fn switch_agent(&mut self, agent_id: &str) -> io::Result<()>;
}

/// [`AgentScopedStore`] keeping each agent's data under `<root>/agents/<id>/`.
#[derive(Clone, Debug)]
pub struct AgentDataDir {
    root: PathBuf,
    current: Option<PathBuf>,
}

impl AgentDataDir {
    /// Store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: None,
        }
    }

    /// Directory of the active agent, once one is selected.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }
}

impl AgentScopedStore for AgentDataDir {
    fn switch_agent(&mut self, agent_id: &str) -> io::Result<()> {
        let valid = !agent_id.is_empty()
            && agent_id != "."
            && agent_id != ".."
            && !agent_id.contains(['/', '\\']);
        if !valid {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("agent id is not a valid directory name: {agent_id:?}"),
            ));
        }
        let dir = self.root.join("agents").join(agent_id);
        std::fs::create_dir_all(&dir)?;
        debug!(path = %dir.display(), "agent data directory active");
        self.current = Some(dir);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
