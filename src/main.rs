//! meetflowd: runs the reminder scheduler against the configured database.
//!
//! Starts the tick loop and waits for ctrl-c. The request workflow itself is
//! library-driven; this binary only keeps reminders and auto-completion
//! running while nothing else is active.

use std::sync::Arc;

use tokio::sync::watch;

use meetflow::reminder::ReminderScheduler;
use meetflow::state;
use meetflow::{LogNotifier, MeetingDb};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match state::load_config() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Failed to load config: {e}");
            std::process::exit(1);
        }
    };
    let db_path = match state::resolve_db_path(&config) {
        Ok(path) => path,
        Err(e) => {
            log::error!("Failed to resolve database path: {e}");
            std::process::exit(1);
        }
    };

    // Open once up front so schema problems surface at startup, not mid-tick
    if let Err(e) = MeetingDb::open_at(db_path.clone()) {
        log::error!("Failed to open database at {}: {e}", db_path.display());
        std::process::exit(1);
    }
    log::info!("meetflowd using database at {}", db_path.display());

    let scheduler = ReminderScheduler::new(db_path, config.scheduler, Arc::new(LogNotifier));
    let (stop_tx, stop_rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(stop_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for shutdown signal: {e}");
    }
    log::info!("Shutdown requested");

    let _ = stop_tx.send(true);
    let _ = handle.await;
    log::info!("meetflowd stopped");
}
