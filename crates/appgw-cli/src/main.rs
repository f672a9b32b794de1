//! # appgw
//!
//! Command-line client for the application gateway: sign in, pick a
//! connector, rewrite URLs, and open pages through the proxy.

#![deny(unsafe_code)]

mod console;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use appgw_auth::agents::parse_agent_entry;
use appgw_auth::{AuthStore, FileAuthStore, GatewayRouter};
use appgw_browser::{AgentDataDir, BrowserSession, UrlRewriter};
use appgw_core::{ConnectionTraits, Credentials, normalize_router_url};
use appgw_settings::GatewaySettings;
use clap::{Parser, Subcommand};

use crate::console::ConsolePage;

/// Environment variable read when `--password` is not given.
const PASSWORD_ENV: &str = "APPGW_PASSWORD";

/// Application gateway client.
#[derive(Parser, Debug)]
#[command(name = "appgw", about = "Browse internal sites through the application gateway")]
struct Cli {
    /// Log level filter (overrides settings; `RUST_LOG` wins over both).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate and establish a session; credentials are saved on success.
    SignIn {
        /// Account name.
        #[arg(long, short)]
        username: String,
        /// Password (falls back to `APPGW_PASSWORD`).
        #[arg(long, short)]
        password: Option<String>,
    },
    /// List connectors available to the saved account.
    Agents,
    /// Remember a connector as the preferred one.
    UseAgent {
        /// Connector id as shown by `agents`.
        agent_id: String,
    },
    /// Rewrite a URL to route through the proxy.
    ToCloud {
        /// Normal URL.
        url: String,
        /// Session id to embed.
        #[arg(long)]
        session: String,
        /// URL that same-origin links are re-anchored onto.
        #[arg(long)]
        original: Option<String>,
    },
    /// Recover the origin URL from a proxied one.
    ToNormal {
        /// Cloudified URL.
        url: String,
    },
    /// Set the proxy router URL and browse mode.
    Router {
        /// Router URL; `https://` and a trailing `/` are added when missing.
        url: String,
        /// Use the smart-browser path.
        #[arg(long)]
        smart: bool,
    },
    /// Show configuration and saved account state.
    Status,
    /// Sign in with saved credentials and open a page through the proxy.
    Open {
        /// Address to open; `http://` is assumed without a scheme.
        url: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = appgw_settings::load_settings().unwrap_or_else(|e| {
        eprintln!("warning: settings unreadable, using defaults: {e}");
        GatewaySettings::default()
    });
    let level = cli.log_level.as_deref().unwrap_or(&settings.logging.level);
    appgw_core::logging::init_subscriber(level);

    let data_dir = appgw_settings::data_dir();
    let store: Arc<dyn AuthStore> = Arc::new(FileAuthStore::in_dir(&data_dir));

    match cli.command {
        Command::SignIn { username, password } => {
            let password = match password {
                Some(password) => password,
                None => std::env::var(PASSWORD_ENV)
                    .with_context(|| format!("no --password given and {PASSWORD_ENV} is unset"))?,
            };
            sign_in(&settings, store, Credentials::new(username, password)).await
        }
        Command::Agents => list_agents(&settings, store).await,
        Command::UseAgent { agent_id } => use_agent(&settings, store, &agent_id).await,
        Command::ToCloud {
            url,
            session,
            original,
        } => {
            let rewriter = UrlRewriter::new(&settings.proxy.to_config());
            println!("{}", rewriter.to_cloud(&url, Some(&session), original.as_deref()));
            Ok(())
        }
        Command::ToNormal { url } => {
            let rewriter = UrlRewriter::new(&settings.proxy.to_config());
            println!("{}", rewriter.to_normal(&url));
            Ok(())
        }
        Command::Router { url, smart } => set_router(settings, &url, smart),
        Command::Status => {
            print_status(&settings, store.as_ref());
            Ok(())
        }
        Command::Open { url } => open(&settings, store, &data_dir, &url).await,
    }
}

fn router(settings: &GatewaySettings, store: Arc<dyn AuthStore>) -> Result<GatewayRouter> {
    GatewayRouter::new(settings, settings.proxy.to_config().into_shared(), store)
        .context("Failed to build HTTP client")
}

fn stored_credentials(store: &dyn AuthStore) -> Result<Credentials> {
    match store.load_credentials() {
        Some(credentials) if credentials.is_complete() => Ok(credentials),
        _ => bail!("not signed in; run `appgw sign-in` first"),
    }
}

fn ensure_ok(traits: &ConnectionTraits) -> Result<()> {
    if traits.is_error() {
        bail!("{}", traits.error_text());
    }
    Ok(())
}

async fn sign_in(
    settings: &GatewaySettings,
    store: Arc<dyn AuthStore>,
    credentials: Credentials,
) -> Result<()> {
    let traits = router(settings, store)?.authenticate(&credentials).await;
    ensure_ok(&traits)?;
    if let Some(agent) = &traits.agent {
        println!("connector: {} ({})", agent.display_name, agent.agent_id);
    }
    println!("session: {}", traits.session().unwrap_or_default());
    Ok(())
}

async fn fetch_listing(
    settings: &GatewaySettings,
    store: Arc<dyn AuthStore>,
) -> Result<Vec<serde_json::Value>> {
    let credentials = stored_credentials(store.as_ref())?;
    let router = router(settings, store)?;
    let traits = router.obtain_token(&credentials).await;
    ensure_ok(&traits)?;
    let (agents, traits) = router.obtain_agents(traits).await;
    ensure_ok(&traits)?;
    Ok(agents)
}

async fn list_agents(settings: &GatewaySettings, store: Arc<dyn AuthStore>) -> Result<()> {
    let preferred = store.load_preferred_agent();
    let agents = fetch_listing(settings, store).await?;
    for agent in agents.iter().filter_map(parse_agent_entry) {
        let marker = if preferred.as_ref().is_some_and(|p| p.matches(&agent)) {
            "*"
        } else {
            " "
        };
        println!("{marker} {}\t{}", agent.agent_id, agent.display_name);
    }
    Ok(())
}

async fn use_agent(
    settings: &GatewaySettings,
    store: Arc<dyn AuthStore>,
    agent_id: &str,
) -> Result<()> {
    let agents = fetch_listing(settings, Arc::clone(&store)).await?;
    let Some(agent) = agents
        .iter()
        .filter_map(parse_agent_entry)
        .find(|a| a.agent_id == agent_id)
    else {
        bail!("no connector with id {agent_id}");
    };
    store
        .store_preferred_agent(&agent)
        .context("Failed to save preferred connector")?;
    println!("preferred connector: {} ({})", agent.display_name, agent.agent_id);
    Ok(())
}

fn set_router(mut settings: GatewaySettings, url: &str, smart: bool) -> Result<()> {
    settings.proxy.host_prefix = normalize_router_url(url);
    settings.proxy.smart_browser = smart;
    appgw_settings::save_settings(&settings).context("Failed to save settings")?;
    println!(
        "router: {} (browse endpoint {})",
        settings.proxy.host_prefix,
        settings.proxy.to_config().browse_endpoint()
    );
    Ok(())
}

fn print_status(settings: &GatewaySettings, store: &dyn AuthStore) {
    let proxy = settings.proxy.to_config();
    println!("router:        {}", proxy.host_prefix());
    println!("smart browser: {}", proxy.smart_browser());
    println!("browse:        {}", proxy.browse_endpoint());
    println!("status page:   {}", proxy.system_url());
    println!("identity:      {}", settings.token.endpoint);
    match store.load_credentials() {
        Some(credentials) => println!("account:       {}", credentials.username),
        None => println!("account:       (not signed in)"),
    }
    match store.load_preferred_agent() {
        Some(agent) => println!("connector:     {} ({})", agent.display_name, agent.agent_id),
        None => println!("connector:     (first available)"),
    }
}

async fn open(
    settings: &GatewaySettings,
    store: Arc<dyn AuthStore>,
    data_dir: &Path,
    url: &str,
) -> Result<()> {
    let proxy = settings.proxy.to_config().into_shared();
    let router = GatewayRouter::new(settings, Arc::clone(&proxy), Arc::clone(&store))
        .context("Failed to build HTTP client")?;
    let mut session = BrowserSession::new(
        Arc::new(router),
        proxy,
        store,
        ConsolePage::default(),
        AgentDataDir::new(data_dir),
    );

    if !session.sign_in_with_stored() {
        bail!("not signed in; run `appgw sign-in` first");
    }
    session.settle().await;
    if let Some(message) = session.page().sign_in_request() {
        bail!("sign-in failed: {}", message.unwrap_or("credentials rejected"));
    }

    if !session.navigate(url) {
        bail!("could not open {url}");
    }
    if let Some(loaded) = session.page().last_url() {
        println!("{loaded}");
    }
    let status = session.status();
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
