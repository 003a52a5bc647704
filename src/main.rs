// Squad builder entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not the console)
// 2. Load config
// 3. Open the local database
// 4. Build the HTTP gateway
// 5. Create mpsc channels and session state
// 6. Spawn the session loop
// 7. Run the console until the user quits
// 8. Cleanup on exit

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use touchline::app::{self, AppState};
use touchline::cli;
use touchline::config;
use touchline::db::Database;
use touchline::gateway::HttpGateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not the console)
    init_tracing()?;
    info!("touchline starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: api={}, user={}, {} athletes per squad, {} budget",
        config.api.base_url,
        config.session.user_id,
        config.rules.squad_size,
        config.rules.budget_cap
    );

    // 3. Open the local database
    let db = Database::open(&config.db_path).context("failed to open database")?;
    info!("Database opened at {}", config.db_path);

    // 4. Build the HTTP gateway
    let gateway = HttpGateway::new(
        config.api.base_url.clone(),
        Duration::from_secs(config.api.timeout_secs),
    )
    .context("failed to build HTTP client")?;

    // 5. Create mpsc channels and session state
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);
    let (state, gw_rx) = AppState::new(config, db, Arc::new(gateway));

    // 6. Spawn the session loop
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, gw_rx, state).await {
            error!("session loop error: {e}");
        }
    });

    // 7. Run the console until the user quits
    if let Err(e) = cli::run(ui_rx, cmd_tx).await {
        error!("console error: {e}");
    }

    // 8. Cleanup: wait for the session loop to finish (with timeout)
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("touchline shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (keeping stdout for the console).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("touchline.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("touchline=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
