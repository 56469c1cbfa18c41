// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// Default number of shows fetched per batch
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// Default period of the playback progress sampler
pub const DEFAULT_SAMPLE_PERIOD: Duration = Duration::from_millis(50);

/// Default podcast name sent to the episode API
pub const DEFAULT_SHOW_NAME: &str = "dotnetrocks";

/// Default episode API location
pub const DEFAULT_API_URL: &str = "http://localhost:5000/shows";

/// Runtime settings shared by the client components
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the episode API (no trailing slash)
    pub api_url: String,
    /// Podcast name used in API requests
    pub show_name: String,
    /// Root of the local cache: audio files, show details and playlists
    pub cache_dir: PathBuf,
    /// Shows fetched per batch when paging
    pub batch_size: usize,
    /// How often playback progress is sampled
    pub sample_period: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            show_name: DEFAULT_SHOW_NAME.to_string(),
            cache_dir: default_cache_dir().to_path_buf(),
            batch_size: DEFAULT_BATCH_SIZE,
            sample_period: DEFAULT_SAMPLE_PERIOD,
        }
    }
}

impl Config {
    /// Directory holding cached show detail documents
    pub fn details_dir(&self) -> PathBuf {
        self.cache_dir.join("shows")
    }
}

/// Platform cache directory for this application.
///
/// Resolved once per process.
pub fn default_cache_dir() -> &'static Path {
    static CACHE_DIR: OnceLock<PathBuf> = OnceLock::new();
    CACHE_DIR.get_or_init(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("podlist")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_cache_dir_is_memoized() {
        let first = default_cache_dir();
        let second = default_cache_dir();
        assert!(std::ptr::eq(first, second));
        assert!(first.ends_with("podlist"));
    }

    #[test]
    fn defaults_match_constants() {
        let config = Config::default();
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.sample_period, Duration::from_millis(50));
        assert_eq!(config.show_name, "dotnetrocks");
        assert!(config.details_dir().ends_with("shows"));
    }
}
