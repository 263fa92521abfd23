//! Account Idler
//!
//! Single-binary service that:
//! 1. Loads a roster of accounts and the activities each should declare
//! 2. Logs the accounts on one by one, a random 12–20 s apart
//! 3. Keeps each session alive: reconnects after failures, waits out
//!    session conflicts, answers guard challenges
//! 4. Asks the operator on the console when a guard code can't be generated

mod config;
mod console;

use std::sync::Arc;

use anyhow::{Context, Result};
use guard_code::{CodeGenerator, SteamGuardTotp};
use metrics_exporter_prometheus::PrometheusBuilder;
use session_client::DryRunClient;
use session_pool::{AccountSession, GuardPromptQueue, load_roster};
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::console::ConsolePrompt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    info!("starting account-idler");

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    if let Some(addr) = config.metrics.listen_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .with_context(|| format!("failed to start metrics exporter on {addr}"))?;
        info!(addr = %addr, "metrics exporter listening");
    }

    let roster = load_roster(&config.roster.path).with_context(|| {
        format!(
            "failed to load account roster from {}",
            config.roster.path.display()
        )
    })?;
    if roster.accounts.is_empty() {
        anyhow::bail!(
            "no usable accounts in {} ({} rejected)",
            config.roster.path.display(),
            roster.rejected.len()
        );
    }

    let policy = config.session_policy();
    info!(
        accounts = roster.accounts.len(),
        rejected = roster.rejected.len(),
        reconnect_delay_secs = policy.reconnect_delay.as_secs(),
        conflict_retry_secs = policy.conflict_retry_period.as_secs(),
        "configuration loaded"
    );

    let (prompts, prompt_worker) = GuardPromptQueue::spawn(ConsolePrompt::stdio());
    let codes: Arc<dyn CodeGenerator> = Arc::new(SteamGuardTotp);
    let slots = config.startup_scheduler().plan(roster.accounts.len());

    let mut sessions = JoinSet::new();
    for (account, slot) in roster.accounts.into_iter().zip(slots) {
        info!(
            account = %account.username,
            start_in_secs = slot.offset.as_secs(),
            next_gap_secs = slot.next_gap.as_secs(),
            "account scheduled"
        );
        let (client, events) = DryRunClient::new(account.username.clone());
        let session = AccountSession::new(
            account,
            client,
            events,
            codes.clone(),
            prompts.clone(),
            policy,
        );
        sessions.spawn(session.run(slot.offset));
    }
    drop(prompts);

    tokio::select! {
        _ = shutdown_signal() => {}
        _ = wait_for_sessions(&mut sessions) => warn!("every account session ended"),
    }

    // Stop the console first so no prompt is left half-asked.
    prompt_worker.abort();
    sessions.shutdown().await;

    info!("shutdown complete");
    Ok(())
}

/// Initialize tracing with LOG_LEVEL / RUST_LOG support. Logs go to stderr so
/// they don't mix with guard prompts on stdout; LOG_FORMAT=json selects JSON.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn wait_for_sessions(sessions: &mut JoinSet<()>) {
    while let Some(result) = sessions.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "account session task failed");
        }
    }
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
