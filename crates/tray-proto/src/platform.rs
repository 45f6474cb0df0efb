use std::path::{Path, PathBuf};

const APP_DIR: &str = "music-tray";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/music-tray/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

#[cfg(unix)]
const PATH_SEPARATOR: &str = ":";
#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";

#[cfg(unix)]
fn binary_names(name: &str) -> Vec<String> {
    vec![name.to_string()]
}

#[cfg(windows)]
fn binary_names(name: &str) -> Vec<String> {
    if name.ends_with(".exe") {
        vec![name.to_string()]
    } else {
        vec![format!("{}.exe", name), name.to_string()]
    }
}

fn find_beside_exe(names: &[String]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.is_file() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.is_file() {
            return Some(p);
        }
    }
    None
}

fn find_in_dirs(path_var: &str, names: &[String]) -> Option<PathBuf> {
    for dir in path_var.split(PATH_SEPARATOR) {
        if dir.is_empty() {
            continue;
        }
        for name in names {
            let p = PathBuf::from(dir).join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

/// Resolve the player binary named in the settings.
///
/// A name containing a path separator is taken as given. A bare name is
/// searched beside the current executable (unless `use_system_path` is set)
/// and then on `PATH`. Returns `None` when nothing matches; callers fall back
/// to the bare name and let the spawn report the failure.
pub fn find_player_binary(name: &str, use_system_path: bool) -> Option<PathBuf> {
    let as_path = Path::new(name);
    if as_path.components().count() > 1 {
        return Some(as_path.to_path_buf());
    }

    let names = binary_names(name);

    if !use_system_path {
        if let Some(p) = find_beside_exe(&names) {
            return Some(p);
        }
    }

    let path = std::env::var("PATH").ok()?;
    find_in_dirs(&path, &names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_is_kept() {
        let found = find_player_binary("/opt/players/mplayer", true);
        assert_eq!(found, Some(PathBuf::from("/opt/players/mplayer")));
    }

    #[test]
    fn missing_binary_is_none() {
        assert!(find_player_binary("definitely-not-a-player-binary-xyz", true).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn finds_binary_in_path_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("fakeplayer");
        std::fs::write(&bin, "#!/bin/sh\n").unwrap();

        let path_var = format!("/nonexistent:{}", dir.path().display());
        let names = binary_names("fakeplayer");
        assert_eq!(find_in_dirs(&path_var, &names), Some(bin));
    }

    #[test]
    fn dirs_are_app_scoped() {
        assert!(config_dir().ends_with(APP_DIR));
        assert!(data_dir().ends_with(APP_DIR));
    }
}
