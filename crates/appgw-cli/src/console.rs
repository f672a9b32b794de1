//! Page host that reports to the terminal instead of rendering.

use appgw_browser::{AgentListing, PageHost};

/// Prints what a browser would do and remembers the last URL it was asked to load.
#[derive(Debug, Default)]
pub struct ConsolePage {
    last_url: Option<String>,
    sign_in_message: Option<String>,
    sign_in_requested: bool,
}

impl ConsolePage {
    /// Last URL handed to [`PageHost::load_url`].
    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    /// Sign-in was requested, with its message if any.
    pub fn sign_in_request(&self) -> Option<Option<&str>> {
        self.sign_in_requested
            .then_some(self.sign_in_message.as_deref())
    }
}

impl PageHost for ConsolePage {
    fn load_url(&mut self, url: &str) {
        tracing::debug!(url, "load");
        self.last_url = Some(url.to_owned());
    }

    fn stop_loading(&mut self) {
        println!("stop");
    }

    fn show_sign_in(&mut self, message: Option<&str>) {
        self.sign_in_requested = true;
        self.sign_in_message = message.map(str::to_owned);
    }

    fn notify_error(&mut self, message: &str) {
        eprintln!("error: {message}");
    }

    fn show_agents(&mut self, agents: &[AgentListing]) {
        for listing in agents {
            println!("{}\t{}", listing.agent.agent_id, listing.label());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
