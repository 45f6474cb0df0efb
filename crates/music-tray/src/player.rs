/// External player process driver.
///
/// The player is a plain child process: `<binary> <args...> <url>` with all
/// stdio on the null device. We only ever start it, interrupt it and wait for
/// it. The controller talks to it through the `Spawner` / `Player` seams so
/// the event loop can be exercised without real processes.
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;

use tracing::{debug, info, warn};
use tray_proto::config::{PlayerConfig, ShutdownConfig};

// ── seams ─────────────────────────────────────────────────────────────────────

/// A running player.
pub trait Player: Send + 'static {
    fn pid(&self) -> Option<u32>;

    /// Non-blocking liveness check. Reaps the process if it has exited.
    fn has_exited(&mut self) -> anyhow::Result<bool>;

    /// Ask the player to stop. Does not wait.
    fn interrupt(&mut self) -> anyhow::Result<()>;

    /// Resolves with the exit code once the process is gone.
    fn wait(self) -> impl Future<Output = anyhow::Result<Option<i32>>> + Send + 'static;
}

/// Starts players and owns the rest of the process environment.
pub trait Spawner {
    type Player: Player;

    fn spawn_player(&self, url: &str) -> anyhow::Result<Self::Player>;

    /// Restore terminal line settings a child may have disturbed.
    fn reset_terminal(&self) -> anyhow::Result<()>;
}

// ── real processes ────────────────────────────────────────────────────────────

pub struct ProcessSpawner {
    binary: PathBuf,
    args: Vec<String>,
    reset_command: Option<Vec<String>>,
}

impl ProcessSpawner {
    pub fn new(player: &PlayerConfig, shutdown: &ShutdownConfig) -> Self {
        let binary = tray_proto::platform::find_player_binary(&player.binary, player.use_system_path)
            .unwrap_or_else(|| {
                warn!(binary = %player.binary, "player binary not found, relying on the OS lookup");
                PathBuf::from(&player.binary)
            });
        debug!(binary = %binary.display(), args = ?player.args, "player configured");

        Self {
            binary,
            args: player.args.clone(),
            reset_command: shutdown.reset_argv().map(<[String]>::to_vec),
        }
    }
}

impl Spawner for ProcessSpawner {
    type Player = PlayerProcess;

    fn spawn_player(&self, url: &str) -> anyhow::Result<PlayerProcess> {
        let child = tokio::process::Command::new(&self.binary)
            .args(&self.args)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            // Dropping an un-reaped handle only happens when quit gives up on it.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| anyhow::anyhow!("failed to launch {}: {}", self.binary.display(), e))?;

        info!(pid = ?child.id(), url, "player launched");
        Ok(PlayerProcess {
            child,
            url: url.to_string(),
        })
    }

    fn reset_terminal(&self) -> anyhow::Result<()> {
        let Some((program, args)) = self.reset_command.as_ref().and_then(|c| c.split_first())
        else {
            debug!("terminal reset disabled");
            return Ok(());
        };

        let status = std::process::Command::new(program).args(args).status()?;
        if !status.success() {
            anyhow::bail!("{} exited with {}", program, status);
        }
        debug!("terminal reset with {}", program);
        Ok(())
    }
}

pub struct PlayerProcess {
    child: tokio::process::Child,
    url: String,
}

impl Player for PlayerProcess {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    fn has_exited(&mut self) -> anyhow::Result<bool> {
        Ok(self.child.try_wait()?.is_some())
    }

    #[cfg(unix)]
    fn interrupt(&mut self) -> anyhow::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        // No pid means the child was already reaped.
        let Some(pid) = self.child.id() else {
            return Ok(());
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
            Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
            Err(e) => Err(anyhow::anyhow!("failed to interrupt player {}: {}", pid, e)),
        }
    }

    #[cfg(not(unix))]
    fn interrupt(&mut self) -> anyhow::Result<()> {
        // No SIGINT for arbitrary children here; terminate instead.
        self.child.start_kill()?;
        Ok(())
    }

    fn wait(mut self) -> impl Future<Output = anyhow::Result<Option<i32>>> + Send + 'static {
        async move {
            let status = self.child.wait().await?;
            debug!(url = %self.url, ?status, "player exited");
            Ok(status.code())
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn spawner(binary: &str, args: &[&str]) -> ProcessSpawner {
        ProcessSpawner {
            binary: PathBuf::from(binary),
            args: args.iter().map(|a| a.to_string()).collect(),
            reset_command: None,
        }
    }

    #[tokio::test]
    async fn interrupt_stops_a_running_player() {
        // `sh -c 'exec sleep 30' player <url>`: the url lands in $1 and is ignored.
        let spawner = spawner("sh", &["-c", "exec sleep 30", "player"]);
        let mut player = spawner.spawn_player("http://x/jazz").unwrap();
        assert_eq!(player.url, "http://x/jazz");
        assert!(player.pid().is_some());
        assert!(!player.has_exited().unwrap());

        player.interrupt().unwrap();
        let code = tokio::time::timeout(Duration::from_secs(5), player.wait())
            .await
            .expect("player did not exit after SIGINT")
            .unwrap();
        // Killed by a signal, so there is no exit code.
        assert_eq!(code, None);
    }

    #[tokio::test]
    async fn exit_is_observed_without_blocking() {
        let spawner = spawner("sh", &["-c", "exit 3", "player"]);
        let mut player = spawner.spawn_player("http://x/rock").unwrap();

        let mut exited = false;
        for _ in 0..100 {
            if player.has_exited().unwrap() {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(exited);
        // Already reaped: interrupting is a no-op.
        player.interrupt().unwrap();
        assert_eq!(player.wait().await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn missing_binary_fails_to_spawn() {
        let spawner = spawner("/nonexistent/music-player", &[]);
        let err = spawner.spawn_player("http://x/jazz").err().unwrap();
        assert!(err.to_string().contains("failed to launch"));
    }

    #[test]
    fn reset_runs_configured_command() {
        let mut spawner = spawner("true", &[]);
        assert!(spawner.reset_terminal().is_ok());

        spawner.reset_command = Some(vec!["true".to_string()]);
        assert!(spawner.reset_terminal().is_ok());

        spawner.reset_command = Some(vec!["false".to_string()]);
        assert!(spawner.reset_terminal().is_err());
    }

    #[cfg(target_os = "linux")]
    struct NullView;

    #[cfg(target_os = "linux")]
    impl crate::core::StatusView for NullView {
        fn render(&mut self, _view: &tray_proto::protocol::TrayView) {}
    }

    /// Alive and not a zombie.
    #[cfg(target_os = "linux")]
    fn running(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .is_some_and(|state| state != 'Z'),
            Err(_) => false,
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn quit_kills_a_player_that_ignores_the_interrupt() {
        use crate::core::TrayController;
        use std::time::Instant;
        use tray_proto::playlist::{PlaylistEntry, Playlists};

        let dir = tempfile::tempdir().unwrap();
        let ready = dir.path().join("ready");

        // The "url" is a marker file the player creates once SIGINT is ignored.
        let spawner = spawner("sh", &["-c", "trap '' INT; : > \"$1\"; exec sleep 30", "player"]);
        let playlists: Playlists = [(
            "stubborn".to_string(),
            PlaylistEntry {
                name: "Stubborn FM".to_string(),
                url: ready.display().to_string(),
            },
        )]
        .into_iter()
        .collect();
        let mut controller = TrayController::new(playlists, spawner, NullView);

        assert!(controller.play_music("stubborn").unwrap());
        let pid = controller.player_pid().unwrap();
        for _ in 0..250 {
            if ready.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(ready.exists(), "player never became ready");

        let grace = Duration::from_millis(300);
        let started = Instant::now();
        tokio::time::timeout(Duration::from_secs(5), controller.quit(grace))
            .await
            .expect("quit did not give up on the player");
        assert!(started.elapsed() >= grace);

        let mut gone = false;
        for _ in 0..100 {
            if !running(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(gone, "player {pid} survived quit");
    }
}
