// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley serve` and `parley prune` command implementations.
//!
//! Wires the Telegram channel, completion provider, SQLite history and the
//! in-memory pacing cache into a relay loop, plus the background prune and
//! ticket-sweep tasks.

use std::sync::Arc;

use parley_agent::shutdown;
use parley_agent::{
    ConversationOrchestrator, DeliveryShim, OrchestratorSettings, PruneTask, RelayLoop,
};
use parley_config::ParleyConfig;
use parley_core::{ChannelAdapter, CompletionProvider, HistoryStore, ParleyError, PluginAdapter};
use parley_openai::OpenAiProvider;
use parley_pacing::{MemoryTicketCache, PacingGate};
use parley_storage::SqliteHistory;
use tracing::{info, warn};

#[cfg(feature = "telegram")]
use parley_telegram::TelegramChannel;

/// Runs the `parley serve` command until SIGINT/SIGTERM.
pub async fn run_serve(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(config.agent.effective_log_level());

    info!(agent_name = config.agent.name.as_str(), "starting parley serve");

    let history = open_history(&config).await?;
    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(&config.completion)?);
    let channel = connect_channel(&config).await?;

    let cancel = shutdown::install_signal_handler();

    let cache = Arc::new(MemoryTicketCache::new());
    let sweeper = cache
        .clone()
        .spawn_sweeper(config.pacing.sweep_interval(), cancel.clone());

    let pruner = tokio::spawn(
        PruneTask::from_config(history.clone(), &config.retention).run(cancel.clone()),
    );

    let gate = PacingGate::new(cache, &config.pacing);
    let delivery = DeliveryShim::new(channel.clone(), &config.delivery);
    let orchestrator = Arc::new(ConversationOrchestrator::new(
        gate,
        history.clone(),
        provider,
        delivery,
        OrchestratorSettings::from_config(&config),
    ));

    let relay = RelayLoop::new(
        channel.clone(),
        history,
        orchestrator,
        config.agent.drain_timeout(),
    );
    let result = relay.run(cancel.clone()).await;

    // The loop also stops when the channel closes; stop the background tasks.
    cancel.cancel();
    for (name, handle) in [("sweeper", sweeper), ("pruner", pruner)] {
        if let Err(e) = handle.await {
            warn!(task = name, error = %e, "background task ended abnormally");
        }
    }
    if let Err(e) = channel.shutdown().await {
        warn!(error = %e, "channel shutdown failed");
    }

    info!("parley serve stopped");
    result
}

/// Runs the `parley prune` command: one retention cycle, then exit.
pub async fn run_prune(config: ParleyConfig) -> Result<(), ParleyError> {
    init_tracing(config.agent.effective_log_level());

    let history = open_history(&config).await?;
    let removed = PruneTask::from_config(history.clone(), &config.retention)
        .run_once()
        .await?;
    history.close().await?;

    println!(
        "parley: removed {removed} turn(s) older than {}s",
        config.retention.max_age_secs
    );
    Ok(())
}

async fn open_history(config: &ParleyConfig) -> Result<Arc<dyn HistoryStore>, ParleyError> {
    let history = SqliteHistory::from_config(config.storage.clone())?;
    history.initialize().await?;
    info!(
        path = config.storage.database_path.as_str(),
        encrypted = config.storage.encryption_key.is_some(),
        "history store ready"
    );
    Ok(Arc::new(history))
}

#[cfg(feature = "telegram")]
async fn connect_channel(config: &ParleyConfig) -> Result<Arc<dyn ChannelAdapter>, ParleyError> {
    let mut channel = TelegramChannel::new(&config.telegram)?;
    channel.connect().await?;
    Ok(Arc::new(channel))
}

#[cfg(not(feature = "telegram"))]
async fn connect_channel(_config: &ParleyConfig) -> Result<Arc<dyn ChannelAdapter>, ParleyError> {
    Err(ParleyError::Config(
        "no channel adapter compiled in: rebuild with the 'telegram' feature".into(),
    ))
}

/// Initializes the tracing subscriber. `RUST_LOG` takes precedence.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("parley={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
