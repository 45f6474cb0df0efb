// ── playlist mapping ──────────────────────────────────────────────────────────
//
// The playlist file is a TOML mapping from identifier to a table:
//
//   [jazz]
//   name = "Jazz FM"
//   url = "http://x/jazz"
//
// Loaded once at startup and never written back.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PlaylistError {
    #[error("failed to read playlist file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed playlist file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("playlist '{id}' has an empty {field}")]
    Invalid { id: String, field: &'static str },
}

/// One streamable source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistEntry {
    pub name: String,
    pub url: String,
}

/// Identifier → entry, iterated in identifier order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Playlists {
    entries: BTreeMap<String, PlaylistEntry>,
}

impl Playlists {
    pub fn load(path: &Path) -> Result<Self, PlaylistError> {
        let content = std::fs::read_to_string(path).map_err(|source| PlaylistError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let playlists = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), count = playlists.len(), "playlists loaded");
        Ok(playlists)
    }

    pub fn parse(content: &str) -> Result<Self, PlaylistError> {
        let entries: BTreeMap<String, PlaylistEntry> = toml::from_str(content)?;
        for (id, entry) in &entries {
            if entry.name.trim().is_empty() {
                return Err(PlaylistError::Invalid {
                    id: id.clone(),
                    field: "name",
                });
            }
            if entry.url.trim().is_empty() {
                return Err(PlaylistError::Invalid {
                    id: id.clone(),
                    field: "url",
                });
            }
        }
        Ok(Self { entries })
    }

    pub fn get(&self, id: &str) -> Option<&PlaylistEntry> {
        self.entries.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PlaylistEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, PlaylistEntry)> for Playlists {
    fn from_iter<I: IntoIterator<Item = (String, PlaylistEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
