// OpenClaw Companion entry point.
//
// Startup sequence:
// 1. Load config (writes the template on first run)
// 2. Initialize tracing (log to file, not terminal)
// 3. Open the secure store
// 4. Build the app state and channels
// 5. Spawn the app event loop
// 6. Run the TUI until the user quits

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use companion_app::app::{self, gateway_connector, AppState};
use companion_app::auth::PasscodeAuthenticator;
use companion_core::config::{self, Config};
use companion_core::credentials::CredentialStore;
use companion_core::store::{SecureStore, SqliteSecureStore};
use companion_tui::tui;
use tokio::sync::mpsc;
use tracing::{error, info};

const LOG_FILE_NAME: &str = "companion.log";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::load_config().context("failed to load configuration")?;
    init_tracing(&config)?;
    info!("OpenClaw Companion starting up");
    info!(
        "Config loaded: store={}, auth enabled={}, request timeout={:?}",
        config.store_path.display(),
        config.auth.enabled,
        config.gateway.request_timeout_secs
    );

    let store: Arc<dyn SecureStore> = Arc::new(
        SqliteSecureStore::open(&config.store_path).context("failed to open secure store")?,
    );

    let (gateway_tx, gateway_rx) = mpsc::channel(64);
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    let app_state = AppState::new(
        CredentialStore::new(Arc::clone(&store)),
        Arc::new(PasscodeAuthenticator::new(config.auth.enabled, store)),
        gateway_connector(config.gateway.clone()),
        gateway_tx,
    );

    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(gateway_rx, cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {e:#}");
        }
    });

    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {e:#}");
    }

    // In-flight requests are not cancelled; give the loop a moment to wind down.
    let _ = tokio::time::timeout(Duration::from_secs(5), app_handle).await;

    info!("OpenClaw Companion shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to a file (not the terminal, which is used by the TUI).
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("failed to create log directory {}", config.log_dir.display()))?;
    let log_file = std::fs::File::create(config.log_dir.join(LOG_FILE_NAME))
        .context("failed to create log file")?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
