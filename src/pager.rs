// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use tracing::debug;

use crate::config::DEFAULT_BATCH_SIZE;
use crate::connectivity::ConnectivityProbe;
use crate::error::SourceError;
use crate::progress::{NoopReporter, ProgressEvent, SharedProgressReporter};
use crate::session::Session;
use crate::source::EpisodeSource;

/// Fills the session's show listing batch by batch.
///
/// With a filter, batches come from the source's text search at increasing
/// offsets. Without one, they are windows of show numbers walking down from
/// the newest show.
pub struct FeedPager<S> {
    source: S,
    batch_size: usize,
    reporter: SharedProgressReporter,
}

impl<S: EpisodeSource> FeedPager<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            batch_size: DEFAULT_BATCH_SIZE,
            reporter: NoopReporter::shared(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_reporter(mut self, reporter: SharedProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Change the search text and load the first batch for it.
    ///
    /// Setting the current filter again does nothing. Otherwise the
    /// playlist-only view is dropped, the listing and cursor are reset and
    /// connectivity is re-checked before fetching.
    pub async fn set_filter<P: ConnectivityProbe + ?Sized>(
        &self,
        session: &mut Session,
        text: &str,
        probe: &P,
    ) -> Result<usize, SourceError> {
        if session.filter() == text {
            return Ok(0);
        }

        debug!("Filter changed to {:?}", text);
        session.discard_playlist_only_view();
        session.set_filter_text(text);
        session.reset_listing();
        session.refresh_online_status(probe).await;

        self.fetch_next_batch(session).await
    }

    /// Clear the filter and start over from the newest show
    pub async fn reset_filter(&self, session: &mut Session) -> Result<usize, SourceError> {
        session.discard_playlist_only_view();
        session.clear_show_numbers();
        session.reset_listing();
        session.set_filter_text("");

        self.fetch_next_batch(session).await
    }

    /// Re-check connectivity, then fetch the next batch
    pub async fn load_more<P: ConnectivityProbe + ?Sized>(
        &self,
        session: &mut Session,
        probe: &P,
    ) -> Result<usize, SourceError> {
        session.refresh_online_status(probe).await;
        self.fetch_next_batch(session).await
    }

    /// Append the next batch to the listing. Returns how many shows were added.
    ///
    /// Does nothing while the playlist-only view is active.
    pub async fn fetch_next_batch(&self, session: &mut Session) -> Result<usize, SourceError> {
        if session.is_playlist_only() {
            return Ok(0);
        }

        let added = if session.filter().is_empty() {
            self.fetch_unfiltered(session).await?
        } else {
            self.fetch_filtered(session).await?
        };

        if added > 0 {
            self.reporter.report(ProgressEvent::ShowsChanged {
                count: session.all_shows().len(),
            });
        }
        Ok(added)
    }

    async fn fetch_filtered(&self, session: &mut Session) -> Result<usize, SourceError> {
        let offset = session.all_shows().len();
        let shows = self
            .source
            .get_filtered_shows(session.filter(), offset, self.batch_size)
            .await?;

        let added = shows.len();
        session.append_shows(shows);
        Ok(added)
    }

    async fn fetch_unfiltered(&self, session: &mut Session) -> Result<usize, SourceError> {
        if session.show_numbers().is_empty() {
            let numbers = self.source.get_show_numbers().await?;
            debug!("Source knows {} show numbers", numbers.len());
            session.set_show_numbers(numbers);
        }

        let Some(window) = next_window(
            session.show_numbers(),
            session.last_show_number(),
            self.batch_size,
        ) else {
            return Ok(0);
        };

        let shows = self.source.get_shows_by_numbers(&window).await?;

        // The window is never empty, so there is always a fallback lower bound
        let lowest = shows
            .iter()
            .map(|s| s.show_number)
            .chain(window.last().copied())
            .min()
            .unwrap_or_default();
        session.set_last_show_number(lowest);

        let added = shows.len();
        session.append_shows(shows);
        Ok(added)
    }
}

/// Show numbers to request next, newest first, or `None` once the cursor
/// has passed the oldest known show.
///
/// `cursor` is the exclusive upper bound; `None` means paging has not started.
fn next_window(numbers: &[i32], cursor: Option<i32>, batch_size: usize) -> Option<Vec<i32>> {
    let oldest = *numbers.iter().min()?;
    let newest = *numbers.iter().max()?;

    let mut upper = match cursor {
        Some(cursor) => i64::from(cursor),
        None => i64::from(newest) + 1,
    };
    if upper <= i64::from(oldest) {
        return None;
    }

    let size = i64::try_from(batch_size).unwrap_or(i64::MAX);
    let in_window =
        |upper: i64, n: i32| (upper.saturating_sub(size)..upper).contains(&i64::from(n));

    if !numbers.iter().any(|&n| in_window(upper, n)) {
        // Slide past a gap to the next lower known number
        let below = numbers.iter().filter(|&&n| i64::from(n) < upper).max()?;
        upper = i64::from(*below) + 1;
    }

    let mut window: Vec<i32> = numbers
        .iter()
        .copied()
        .filter(|&n| in_window(upper, n))
        .collect();
    window.sort_unstable_by(|a, b| b.cmp(a));
    window.dedup();
    Some(window)
}
