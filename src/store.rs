// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::episode::partial_path;
use crate::error::PersistenceError;
use crate::model::PlayList;

/// File name of the playlist document inside the cache directory
pub const PLAYLIST_FILE_NAME: &str = "playlists.json";

/// JSON file holding every playlist
#[derive(Debug, Clone)]
pub struct PlaylistStore {
    path: PathBuf,
}

impl PlaylistStore {
    /// Store backed by an explicit file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store backed by `playlists.json` inside `dir`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(PLAYLIST_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all playlists.
    ///
    /// A missing file is not an error and yields an empty list.
    pub fn load(&self) -> Result<Vec<PlayList>, PersistenceError> {
        if !self.path.exists() {
            debug!("No playlist file at {}", self.path.display());
            return Ok(Vec::new());
        }

        let content =
            std::fs::read_to_string(&self.path).map_err(|e| PersistenceError::ReadFailed {
                path: self.path.clone(),
                source: e,
            })?;

        serde_json::from_str(&content).map_err(|e| PersistenceError::JsonParseFailed {
            path: self.path.clone(),
            source: e,
        })
    }

    /// Replace the file with the given playlists.
    ///
    /// The document is written next to the target first and renamed into
    /// place, so a failed write never leaves a truncated file behind.
    pub fn save(&self, playlists: &[PlayList]) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(playlists)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PersistenceError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let partial = partial_path(&self.path);
        std::fs::write(&partial, json).map_err(|e| PersistenceError::WriteFailed {
            path: partial.clone(),
            source: e,
        })?;

        std::fs::rename(&partial, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&partial);
            PersistenceError::WriteFailed {
                path: self.path.clone(),
                source: e,
            }
        })?;

        debug!(
            "Saved {} playlists to {}",
            playlists.len(),
            self.path.display()
        );
        Ok(())
    }
}
