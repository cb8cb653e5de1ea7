// Main entry point for the submission-statement janitor

use std::sync::Arc;

use anyhow::{Context, Result};
use janitor_core::domains::moderation::LifecycleTracker;
use janitor_core::kernel::RedditForum;
use janitor_core::Config;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,janitor_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting submission-statement janitor");

    // Load configuration
    let config = Arc::new(Config::from_env().context("Failed to load configuration")?);
    tracing::info!(
        subreddit = %config.subreddit,
        poll_interval_secs = config.poll_interval.as_secs(),
        time_limit_minutes = config.time_limit_minutes,
        "Configuration loaded"
    );

    // Build the Reddit client and the forum adapter
    let client = reddit::RedditClient::new(reddit::RedditOptions {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        user_agent: format!(
            "linux:submission-statement-janitor:v{} (by /u/{})",
            env!("CARGO_PKG_VERSION"),
            config.username
        ),
    })
    .context("Failed to build Reddit client")?;
    let forum = Arc::new(RedditForum::new(client, config.subreddit.clone()));

    let mut tracker = LifecycleTracker::new(forum, config.clone());

    // Graceful shutdown on ctrl-c
    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    // The supervision loop: a successful cycle sleeps the poll interval, a
    // failed one discards the working set and backs off. The next cycle
    // rebuilds state from the listings plus the durable comment markers.
    loop {
        if shutdown.is_cancelled() {
            break;
        }

        let sleep_for = match tracker.run_cycle().await {
            Ok(_stats) => config.poll_interval,
            Err(error) => {
                tracing::error!(
                    error = ?error,
                    backoff_secs = config.error_backoff.as_secs(),
                    "cycle failed; backing off"
                );
                tracker.reset();
                config.error_backoff
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(sleep_for) => {}
        }
    }

    tracing::info!("Janitor stopped");
    Ok(())
}
