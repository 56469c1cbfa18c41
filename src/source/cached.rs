// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::connectivity::OnlineStatus;
use crate::error::SourceError;
use crate::model::Show;

use super::EpisodeSource;

const SHOW_NUMBERS_FILE: &str = "show-numbers.json";

/// Wraps a source and keeps show details on disk so they can be browsed
/// and played without a connection.
///
/// While online every call goes to the wrapped source; detail lookups and
/// the show number list are written to the cache as a side effect. While
/// offline the cache answers instead.
pub struct CachingSource<S> {
    inner: S,
    dir: PathBuf,
    online: OnlineStatus,
}

impl<S: EpisodeSource> CachingSource<S> {
    pub fn new(inner: S, dir: impl Into<PathBuf>, online: OnlineStatus) -> Self {
        Self {
            inner,
            dir: dir.into(),
            online,
        }
    }

    fn show_path(&self, show_number: i32) -> PathBuf {
        self.dir.join(format!("show-{show_number}.json"))
    }

    fn store<T: Serialize>(&self, path: &Path, value: &T) {
        let result = std::fs::create_dir_all(&self.dir)
            .and_then(|_| {
                serde_json::to_vec_pretty(value)
                    .map_err(std::io::Error::other)
            })
            .and_then(|json| std::fs::write(path, json));

        match result {
            Ok(()) => debug!("Cached {}", path.display()),
            Err(e) => warn!("Failed to cache {}: {}", path.display(), e),
        }
    }

    fn read_cached_show(&self, show_number: i32) -> Option<Show> {
        read_json(&self.show_path(show_number))
    }

    /// Every cached show, newest first
    fn cached_shows(&self) -> Vec<Show> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut shows: Vec<Show> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("show-") && n.ends_with(".json"))
                    && path.file_name().and_then(|n| n.to_str()) != Some(SHOW_NUMBERS_FILE)
            })
            .filter_map(|path| read_json::<Show>(&path))
            .collect();

        shows.sort_by(|a, b| b.show_number.cmp(&a.show_number));
        shows
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = std::fs::read(path).ok()?;
    match serde_json::from_slice(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring unreadable cache file {}: {}", path.display(), e);
            None
        }
    }
}

#[async_trait]
impl<S: EpisodeSource> EpisodeSource for CachingSource<S> {
    async fn get_show_numbers(&self) -> Result<Vec<i32>, SourceError> {
        let path = self.dir.join(SHOW_NUMBERS_FILE);

        if self.online.is_online() {
            let numbers = self.inner.get_show_numbers().await?;
            self.store(&path, &numbers);
            return Ok(numbers);
        }

        read_json(&path).ok_or_else(|| SourceError::Offline("show numbers".to_string()))
    }

    async fn get_shows_by_numbers(&self, numbers: &[i32]) -> Result<Vec<Show>, SourceError> {
        if self.online.is_online() {
            return self.inner.get_shows_by_numbers(numbers).await;
        }

        let mut shows: Vec<Show> = numbers
            .iter()
            .filter_map(|&n| self.read_cached_show(n))
            .collect();
        shows.sort_by(|a, b| b.show_number.cmp(&a.show_number));
        Ok(shows)
    }

    async fn get_filtered_shows(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, SourceError> {
        if self.online.is_online() {
            return self.inner.get_filtered_shows(query, offset, limit).await;
        }

        let query = query.to_lowercase();
        Ok(self
            .cached_shows()
            .into_iter()
            .filter(|s| s.show_title.to_lowercase().contains(&query))
            .skip(offset)
            .take(limit)
            .collect())
    }

    async fn get_show_with_details(&self, show_number: i32) -> Result<Show, SourceError> {
        if !self.online.is_online() {
            return self
                .read_cached_show(show_number)
                .ok_or(SourceError::NotCached(show_number));
        }

        match self.inner.get_show_with_details(show_number).await {
            Ok(show) => {
                self.store(&self.show_path(show_number), &show);
                Ok(show)
            }
            Err(e) => match self.read_cached_show(show_number) {
                Some(show) => {
                    warn!(
                        "Using cached details for show {} after error: {}",
                        show_number, e
                    );
                    Ok(show)
                }
                None => Err(e),
            },
        }
    }
}
