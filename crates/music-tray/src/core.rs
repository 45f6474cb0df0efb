/// TrayController: single owner of the playback state.
///
/// All inputs (menu clicks, icon activation, the liveness tick, shutdown)
/// are funnelled into `run()`. The controller owns the one tracked player
/// and pushes a fresh `TrayView` to the status view after every change.
///
/// Stopped players are interrupted and handed to the reaper, a `JoinSet`
/// of tasks awaiting their exit, so a slow player never blocks the loop.
/// `quit()` drains the reaper before restoring the terminal.
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};
use tray_proto::playlist::Playlists;
use tray_proto::protocol::{
    IconState, MenuEntry, Selection, TrayEvent, TrayView, IDLE_TOOLTIP, NO_MUSIC_LABEL,
};

use crate::player::{Player, Spawner};

/// Receives every rendered state of the tray.
pub trait StatusView {
    fn render(&mut self, view: &TrayView);
}

/// The selected playlist and its process travel together: one is never set
/// without the other.
struct Playback<P> {
    id: String,
    player: P,
}

pub struct TrayController<S: Spawner, V: StatusView> {
    playlists: Playlists,
    spawner: S,
    view: V,
    playback: Option<Playback<S::Player>>,
    icon: IconState,
    tooltip: String,
    reaper: JoinSet<()>,
}

impl<S: Spawner, V: StatusView> TrayController<S, V> {
    /// Start in the "off" state and show the icon.
    pub fn new(playlists: Playlists, spawner: S, view: V) -> Self {
        let mut controller = Self {
            playlists,
            spawner,
            view,
            playback: None,
            icon: IconState::Off,
            tooltip: IDLE_TOOLTIP.to_string(),
            reaper: JoinSet::new(),
        };
        controller.update_icon(IconState::Off);
        controller
    }

    pub fn selected(&self) -> Option<&str> {
        self.playback.as_ref().map(|p| p.id.as_str())
    }

    #[cfg(test)]
    pub(crate) fn player_pid(&self) -> Option<u32> {
        self.playback.as_ref().and_then(|p| p.player.pid())
    }

    // ── icon / menu ───────────────────────────────────────────────────────────

    fn update_icon(&mut self, kind: IconState) {
        if self.icon != kind {
            debug!("icon: {} → {}", self.icon, kind);
        }
        self.icon = kind;
        self.render();
    }

    /// "None" first, then every playlist in identifier order. The current
    /// selection (or "None" when idle) is the checked entry.
    pub fn make_popup(&self) -> Vec<MenuEntry> {
        let selected = self.selected();

        let mut entries = Vec::with_capacity(self.playlists.len() + 1);
        entries.push(MenuEntry {
            selection: Selection::NoMusic,
            label: NO_MUSIC_LABEL.to_string(),
            checked: selected.is_none(),
        });
        entries.extend(self.playlists.iter().map(|(id, entry)| MenuEntry {
            selection: Selection::Playlist(id.to_string()),
            label: entry.name.clone(),
            checked: selected == Some(id),
        }));
        entries
    }

    pub fn icon_click(&mut self) {
        debug!("icon clicked");
        self.render();
    }

    fn render(&mut self) {
        let view = TrayView {
            icon: self.icon,
            tooltip: self.tooltip.clone(),
            entries: self.make_popup(),
        };
        self.view.render(&view);
    }

    // ── playback ──────────────────────────────────────────────────────────────

    pub fn select(&mut self, selection: Selection) -> anyhow::Result<()> {
        match selection {
            Selection::NoMusic => self.stop_music(),
            Selection::Playlist(id) => {
                self.play_music(&id)?;
            }
        }
        Ok(())
    }

    /// Returns `Ok(false)` without touching any state when `id` is not a
    /// configured playlist.
    pub fn play_music(&mut self, id: &str) -> anyhow::Result<bool> {
        let Some(entry) = self.playlists.get(id).cloned() else {
            warn!(id, "unknown playlist");
            return Ok(false);
        };

        self.stop_music();

        let player = match self.spawner.spawn_player(&entry.url) {
            Ok(player) => player,
            Err(e) => {
                error!(id, url = %entry.url, "could not start playing: {:#}", e);
                return Err(e);
            }
        };
        info!(id, pid = ?player.pid(), url = %entry.url, "playing {}", entry.name);

        self.playback = Some(Playback {
            id: id.to_string(),
            player,
        });
        self.tooltip = format!("Playing {}", entry.name);
        self.update_icon(IconState::On);
        Ok(true)
    }

    /// Interrupt the tracked player, if any, and go idle. Never kills.
    pub fn stop_music(&mut self) {
        if let Some(Playback { id, mut player }) = self.playback.take() {
            let pid = player.pid();
            info!(id = %id, ?pid, "stopping player");
            if let Err(e) = player.interrupt() {
                warn!(id = %id, ?pid, "interrupt failed: {:#}", e);
            }
            self.reaper.spawn(async move {
                match player.wait().await {
                    Ok(code) => debug!(id = %id, ?pid, ?code, "player reaped"),
                    Err(e) => warn!(id = %id, ?pid, "waiting for player failed: {:#}", e),
                }
            });
        }
        self.tooltip = IDLE_TOOLTIP.to_string();
        self.update_icon(IconState::Off);
    }

    /// Liveness poll. A player that exited on its own is reconciled to "off".
    pub fn update(&mut self) {
        while let Some(res) = self.reaper.try_join_next() {
            if let Err(e) = res {
                warn!("reaper task failed: {}", e);
            }
        }

        let exited = match self.playback.as_mut() {
            Some(playback) => match playback.player.has_exited() {
                Ok(exited) => exited,
                // A player we can no longer observe is as good as gone.
                Err(e) => {
                    warn!(id = %playback.id, "liveness check failed, dropping player: {:#}", e);
                    true
                }
            },
            None => false,
        };

        if exited {
            info!(id = ?self.selected(), "player exited on its own");
            self.stop_music();
        }
    }

    /// Stop playback, wait for every interrupted player (up to `grace`, after
    /// which they are killed) and restore the terminal.
    pub async fn quit(mut self, grace: Duration) {
        self.stop_music();

        if !self.reaper.is_empty() {
            debug!(pending = self.reaper.len(), "waiting for players to exit");
            let reaper = &mut self.reaper;
            let drained = tokio::time::timeout(grace, async move {
                while reaper.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                warn!(pending = self.reaper.len(), "players ignored the interrupt, killing them");
                self.reaper.shutdown().await;
            }
        }

        if let Err(e) = self.spawner.reset_terminal() {
            warn!("terminal reset failed: {:#}", e);
        }
        info!("controller: quit");
    }

    // ── event loop ────────────────────────────────────────────────────────────

    /// Run until `shutdown` resolves, the tray asks to quit or the event
    /// channel closes, then `quit()`.
    pub async fn run<F>(
        mut self,
        mut events: mpsc::UnboundedReceiver<TrayEvent>,
        poll_interval: Duration,
        grace: Duration,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        info!("controller: starting event loop");

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("controller: shutdown requested");
                    break;
                }

                evt = events.recv() => match evt {
                    None => {
                        info!("controller: event channel closed, shutting down");
                        break;
                    }
                    Some(TrayEvent::Quit) => {
                        info!("controller: quit from tray");
                        break;
                    }
                    Some(TrayEvent::IconClicked) => self.icon_click(),
                    Some(TrayEvent::Select(selection)) => {
                        debug!(id = selection.id(), "controller: select");
                        if let Err(e) = self.select(selection) {
                            error!("controller: selection failed: {:#}", e);
                        }
                    }
                },

                _ = ticker.tick() => self.update(),
            }
        }

        self.quit(grace).await;
    }
}
