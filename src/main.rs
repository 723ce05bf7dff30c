//! Sync Cache - lock holder
//!
//! Acquires a networked write lock, keeps it renewed until the process is
//! asked to stop, then releases it.
//!
//! ```text
//! sync_cache <lock-id>
//! ```

use anyhow::{bail, Context};
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sync_cache::{Config, NetworkedSynchroniser};

/// Main entry point for the lock holder.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Connect to the lease backend
/// 4. Acquire the write lock named on the command line
/// 5. Hold it until SIGINT/SIGTERM, then release it
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sync_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let Some(lock_id) = std::env::args().nth(1) else {
        bail!("usage: sync_cache <lock-id>");
    };

    let config = Config::from_env();
    info!(
        "Configuration loaded: redis_dsn={}, redis_db={}, lock_timeout={}s",
        config.redis_dsn, config.redis_db, config.lock_timeout
    );

    let synchroniser = NetworkedSynchroniser::connect(config.synchroniser_options())
        .await
        .context("connecting to lease backend")?;

    let lock = synchroniser
        .acquire(&lock_id)
        .await
        .with_context(|| format!("acquiring write lock {}", lock_id))?;
    info!(lock_id = %lock_id, key = %lock.key(), "Holding write lock");

    shutdown_signal().await?;

    lock.unlock().await.context("releasing write lock")?;
    info!(lock_id = %lock_id, "Write lock released");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() -> anyhow::Result<()> {
    #[cfg(unix)]
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
        .context("installing SIGTERM handler")?;

    #[cfg(unix)]
    let terminate = sigterm.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        res = signal::ctrl_c() => {
            res.context("installing Ctrl+C handler")?;
            info!("Received Ctrl+C, releasing lock...");
        }
        _ = terminate => {
            info!("Received SIGTERM, releasing lock...");
        }
    }
    Ok(())
}
