mod cli;
mod core;
mod player;
mod tray;

use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};
use tray_proto::config::Config;
use tray_proto::playlist::Playlists;
use tray_proto::protocol::{IconState, TrayEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let data_dir = tray_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("music-tray.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,music_tray=debug,tray_proto=debug".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("music-tray log: {}", log_path.display());
    info!("music-tray starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    args.apply(&mut config);
    info!("Config loaded");

    // No playlists, no tray: a bad file is fatal.
    let playlists = Playlists::load(&config.playlists.file)
        .with_context(|| format!("cannot start without {}", config.playlists.file.display()))?;
    info!(
        "Loaded {} playlists from {:?}",
        playlists.len(),
        config.playlists.file
    );
    if playlists.is_empty() {
        warn!("no playlists configured, the menu will only offer \"None\"");
    }

    // ── Tray ─────────────────────────────────────────────────────────────────
    let (event_tx, event_rx) = mpsc::unbounded_channel::<TrayEvent>();
    let icon_dir = absolute(&config.icons.dir);
    for icon in [IconState::Off, IconState::On] {
        if !icon_dir.join(icon.file_name()).exists() {
            warn!("icon {} missing from {}", icon.file_name(), icon_dir.display());
        }
    }
    let (view, tray_task) = tray::spawn(icon_dir, event_tx).await?;

    // ── Controller ───────────────────────────────────────────────────────────
    let spawner = player::ProcessSpawner::new(&config.player, &config.shutdown);
    let controller = core::TrayController::new(playlists, spawner, view);

    controller
        .run(
            event_rx,
            config.poll.interval(),
            config.shutdown.grace(),
            shutdown_signal(),
        )
        .await;

    // The controller owned the bridge sender, so the tray task is winding down.
    if let Err(e) = tray_task.await {
        error!("tray task failed: {}", e);
    }

    info!("Goodbye");
    Ok(())
}

/// ksni wants an absolute icon theme path.
fn absolute(dir: &Path) -> PathBuf {
    std::fs::canonicalize(dir).unwrap_or_else(|_| {
        std::env::current_dir()
            .map(|cwd| cwd.join(dir))
            .unwrap_or_else(|_| dir.to_path_buf())
    })
}

/// Resolves on the first SIGINT/SIGTERM. A second one exits immediately.
fn shutdown_signal() -> impl Future<Output = ()> {
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = watch_signals(tx).await {
            error!("signal handling unavailable: {}", e);
        }
    });

    async move {
        if rx.await.is_err() {
            // Signal watcher failed; only the tray can end the loop now.
            std::future::pending::<()>().await;
        }
    }
}

/// The first signal asks the controller to shut down; any later one means
/// the user has run out of patience.
struct SignalLatch {
    shutdown: Option<oneshot::Sender<()>>,
}

impl SignalLatch {
    fn new(shutdown: oneshot::Sender<()>) -> Self {
        Self {
            shutdown: Some(shutdown),
        }
    }

    /// Returns true when the process should exit right away.
    fn trip(&mut self) -> bool {
        match self.shutdown.take() {
            Some(tx) => {
                info!("Caught signal, shutting down");
                let _ = tx.send(());
                false
            }
            None => {
                warn!("Hard shutdown");
                true
            }
        }
    }
}

#[cfg(unix)]
async fn watch_signals(tx: oneshot::Sender<()>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut latch = SignalLatch::new(tx);

    loop {
        tokio::select! {
            _ = interrupt.recv() => {}
            _ = terminate.recv() => {}
        }
        if latch.trip() {
            std::process::exit(1);
        }
    }
}

#[cfg(not(unix))]
async fn watch_signals(tx: oneshot::Sender<()>) -> anyhow::Result<()> {
    let mut latch = SignalLatch::new(tx);

    loop {
        tokio::signal::ctrl_c().await?;
        if latch.trip() {
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_signal_requests_shutdown_second_exits() {
        let (tx, rx) = oneshot::channel();
        let mut latch = SignalLatch::new(tx);

        assert!(!latch.trip());
        assert!(rx.await.is_ok());

        assert!(latch.trip());
        assert!(latch.trip());
    }

    #[test]
    fn signal_after_controller_is_gone_is_not_fatal() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(rx);
        let mut latch = SignalLatch::new(tx);
        assert!(!latch.trip());
    }
}
