use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use daily_planner::bot::{DigestRunner, Dispatcher, Planner, spawn_digest_scheduler};
use daily_planner::channels::{Channel, TelegramChannel};
use daily_planner::config::PlannerConfig;
use daily_planner::store::{LibSqlBackend, TaskStore};
use daily_planner::tasks::TaskService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = PlannerConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC...");
        std::process::exit(1);
    });

    eprintln!("📋 Daily Planner v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Timezone: UTC{}", config.utc_offset);
    eprintln!("   Digest: {}", config.digest_schedule);

    // ── Database ─────────────────────────────────────────────────────────
    let store: Arc<dyn TaskStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Telegram ─────────────────────────────────────────────────────────
    eprintln!(
        "   Telegram: allowed {}\n",
        if config.allowed_users.iter().any(|u| u == "*") {
            "everyone".to_string()
        } else {
            config.allowed_users.join(", ")
        }
    );
    let channel: Arc<dyn Channel> = Arc::new(TelegramChannel::new(
        config.telegram_token.clone(),
        config.allowed_users.clone(),
    ));
    channel
        .health_check()
        .await
        .context("Telegram is not reachable with the configured token")?;

    // ── Planner + digest scheduler ───────────────────────────────────────
    let service = TaskService::new(store);
    let (schedule_tx, schedule_rx) = watch::channel(config.digest_schedule.clone());
    let planner = Arc::new(Planner::new(
        Arc::clone(&channel),
        service.clone(),
        config.utc_offset,
        schedule_tx,
    ));

    let cancel = CancellationToken::new();
    let runner = Arc::new(DigestRunner::new(
        Arc::clone(&channel),
        service,
        config.utc_offset,
    ));
    let scheduler = spawn_digest_scheduler(runner, schedule_rx, cancel.clone());

    let mut dispatcher = Dispatcher::new(planner);
    let mut updates = channel.start().await?;
    tracing::info!("Planner started");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
            next = updates.next() => {
                let Some(msg) = next else {
                    tracing::warn!("Update stream ended");
                    break;
                };
                dispatcher.dispatch(msg);
            }
        }
    }

    cancel.cancel();
    dispatcher.shutdown().await;
    if let Err(e) = scheduler.await {
        tracing::warn!(error = %e, "Digest scheduler ended abnormally");
    }
    if let Err(e) = channel.shutdown().await {
        tracing::warn!(error = %e, "Channel shutdown failed");
    }

    Ok(())
}
