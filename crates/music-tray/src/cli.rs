use std::path::PathBuf;

use clap::Parser;
use tray_proto::config::Config;

/// Pick a stream from the tray and play it with an external player.
#[derive(Debug, Parser)]
#[command(name = "music-tray", version)]
pub struct Args {
    /// Settings file (default: ~/.config/music-tray/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Playlist mapping file
    #[arg(long, value_name = "PATH")]
    pub playlists: Option<PathBuf>,

    /// Directory holding off.png and on.png
    #[arg(long, value_name = "DIR")]
    pub icons: Option<PathBuf>,

    /// Player binary, name or path
    #[arg(long, value_name = "BINARY")]
    pub player: Option<String>,
}

impl Args {
    /// Command-line values win over the settings file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(path) = &self.playlists {
            config.playlists.file = path.clone();
        }
        if let Some(dir) = &self.icons {
            config.icons.dir = dir.clone();
        }
        if let Some(binary) = &self.player {
            config.player.binary = binary.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_settings() {
        let args = Args::parse_from([
            "music-tray",
            "--playlists",
            "/tmp/streams.toml",
            "--player",
            "mpv",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);

        assert_eq!(config.playlists.file, PathBuf::from("/tmp/streams.toml"));
        assert_eq!(config.player.binary, "mpv");
        assert_eq!(config.icons.dir, PathBuf::from("."));
        assert!(args.config.is_none());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
