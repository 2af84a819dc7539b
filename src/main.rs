use std::sync::Arc;

use tokio::net::{TcpListener, TcpSocket};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use linecrab::{Config, IdleReaper, SessionRegistry, router};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "🦀 linecrab";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> std::io::Result<()> {
    setup().await;
    run_forever().await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup() {
    // This has to be the first thing we do, because it initializes the config
    Config::init().await;

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::try_new(config.log_level.as_str())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run_forever() -> std::io::Result<()> {
    let config = Config::snapshot();

    let registry = Arc::new(SessionRegistry::new(config.sessions.clone()));
    let reaper = IdleReaper::spawn(registry.clone());

    let socket = if config.listen_addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };

    socket.set_reuseaddr(true)?;
    socket.bind(config.listen_addr)?;

    let listener: TcpListener = socket.listen(1024)?;

    info!(
        "{} listening on {}, backend {}",
        APP_NAME, config.listen_addr, config.sessions.backend
    );

    let app = router(registry.clone(), config.secure_cookies);
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    reaper.stop().await;
    let dropped = registry.shutdown();
    info!("{} stopped, closed {dropped} sessions", APP_NAME);

    served
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }

    info!("{} shutting down", APP_NAME);
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
