// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use crate::model::{PlayList, Show};

/// Scheme prefixes stripped from audio URLs when deriving cache file names
const SCHEME_PREFIXES: [&str; 2] = ["https://", "http://"];

/// Local directory holding downloaded show audio
#[derive(Debug, Clone)]
pub struct ShowCache {
    root: PathBuf,
}

impl ShowCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the audio for `mp3_url` lives once downloaded.
    ///
    /// Returns `None` for an empty URL.
    pub fn local_path(&self, mp3_url: &str) -> Option<PathBuf> {
        cache_file_name(mp3_url).map(|name| self.root.join(name))
    }

    /// Cache location of a show's audio
    pub fn show_path(&self, show: &Show) -> Option<PathBuf> {
        self.local_path(&show.mp3_url)
    }

    /// Whether the show's audio is already on disk
    pub fn is_downloaded(&self, show: &Show) -> bool {
        self.show_path(show).is_some_and(|path| path.is_file())
    }

    /// Number of shows in the playlist whose audio still needs downloading
    pub fn not_downloaded_count(&self, playlist: &PlayList) -> usize {
        playlist
            .shows
            .iter()
            .filter(|show| !self.is_downloaded(show))
            .count()
    }
}

/// Flat file name for an audio URL: scheme removed, path separators
/// replaced by dashes.
///
/// `https://media.example.com/shows/1850.mp3` becomes
/// `media.example.com-shows-1850.mp3`.
pub fn cache_file_name(mp3_url: &str) -> Option<String> {
    let trimmed = mp3_url.trim();
    let without_scheme = SCHEME_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(trimmed, prefix))
        .unwrap_or(trimmed);

    if without_scheme.is_empty() {
        return None;
    }

    Some(
        without_scheme
            .chars()
            .map(|c| if c == '/' || c == '\\' { '-' } else { c })
            .collect(),
    )
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
