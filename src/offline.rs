// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Downloading a whole playlist for offline listening.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::connectivity::OnlineStatus;
use crate::episode::{ShowCache, download_show};
use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::model::{PlayList, Show};
use crate::progress::{ProgressEvent, SharedProgressReporter};
use crate::source::EpisodeSource;

/// Summary of a playlist download
#[derive(Debug, Default)]
pub struct PlaylistDownloadResult {
    /// Shows downloaded by this run
    pub downloaded: usize,
    /// Shows already in the cache
    pub skipped: usize,
    /// Shows that could not be downloaded
    pub failed: usize,
    /// Show numbers and errors of the failures
    pub failed_shows: Vec<(i32, DownloadError)>,
    /// Whether the run stopped early because it was cancelled
    pub cancelled: bool,
}

/// Download every show of `playlist` that is not in the cache yet.
///
/// Shows are handled one after another. Each show's details are fetched
/// first so they are available offline later. A failing show is recorded
/// and the next one attempted. Refuses to start while offline.
pub async fn download_playlist<C, S>(
    client: &C,
    source: &S,
    cache: &ShowCache,
    playlist: &PlayList,
    online: &OnlineStatus,
    reporter: &SharedProgressReporter,
    cancel: &CancellationToken,
) -> Result<PlaylistDownloadResult, DownloadError>
where
    C: HttpClient,
    S: EpisodeSource,
{
    if !online.is_online() {
        return Err(DownloadError::Offline);
    }

    let (pending, cached): (Vec<&Show>, Vec<&Show>) =
        playlist.shows.iter().partition(|s| !cache.is_downloaded(s));
    let total = pending.len();
    let mut result = PlaylistDownloadResult {
        skipped: cached.len(),
        ..Default::default()
    };

    info!(
        "Downloading {} of {} shows in '{}'",
        total,
        playlist.shows.len(),
        playlist.name
    );

    for (i, show) in pending.into_iter().enumerate() {
        if cancel.is_cancelled() {
            result.cancelled = true;
            break;
        }

        reporter.report(ProgressEvent::PlaylistDownloadProgress {
            show_number: show.show_number,
            current: i + 1,
            total,
        });

        match fetch_show(client, source, cache, show, reporter, cancel).await {
            Ok(()) => result.downloaded += 1,
            Err(DownloadError::Cancelled { .. }) => {
                result.cancelled = true;
                break;
            }
            Err(e) => {
                warn!("Show {} failed: {}", show.show_number, e);
                reporter.report(ProgressEvent::DownloadFailed {
                    show_number: show.show_number,
                    error: e.to_string(),
                });
                result.failed += 1;
                result.failed_shows.push((show.show_number, e));
            }
        }
    }

    reporter.report(ProgressEvent::PlaylistDownloadCompleted {
        downloaded_count: result.downloaded,
        skipped_count: result.skipped,
        failed_count: result.failed,
    });

    Ok(result)
}

async fn fetch_show<C, S>(
    client: &C,
    source: &S,
    cache: &ShowCache,
    show: &Show,
    reporter: &SharedProgressReporter,
    cancel: &CancellationToken,
) -> Result<(), DownloadError>
where
    C: HttpClient,
    S: EpisodeSource,
{
    let detailed = source
        .get_show_with_details(show.show_number)
        .await
        .map_err(|e| DownloadError::Details {
            show_number: show.show_number,
            source: e,
        })?;

    // Stored playlist entries may predate a changed audio URL
    let target = if detailed.is_playable() {
        &detailed
    } else {
        show
    };

    download_show(client, cache, target, reporter, cancel).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::episode::testing::MockAudioServer;
    use crate::progress::NoopReporter;
    use crate::progress::testing::RecordingReporter;
    use crate::source::testing::{FakeSource, make_show};
    use tempfile::tempdir;

    fn playlist(numbers: &[i32]) -> PlayList {
        let mut playlist = PlayList::new("Road trip");
        playlist.shows = numbers.iter().map(|&n| make_show(n)).collect();
        playlist
    }

    fn server_for(numbers: &[i32]) -> MockAudioServer {
        let mut server = MockAudioServer::default();
        for &n in numbers {
            server.bodies.insert(make_show(n).mp3_url, vec![n as u8; 4]);
        }
        server
    }

    #[tokio::test]
    async fn downloads_missing_shows_and_skips_cached() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let list = playlist(&[1, 2, 3]);
        std::fs::write(cache.show_path(&list.shows[1]).unwrap(), b"have it").unwrap();
        let server = server_for(&[1, 2, 3]);
        let source = FakeSource::with_numbers(&[1, 2, 3]);
        let recorder = RecordingReporter::shared();
        let reporter: SharedProgressReporter = recorder.clone();

        let result = download_playlist(
            &server,
            &source,
            &cache,
            &list,
            &OnlineStatus::default(),
            &reporter,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.downloaded, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(cache.not_downloaded_count(&list), 0);
        assert_eq!(server.requests().len(), 2);
        assert_eq!(source.calls(), vec!["details 1", "details 3"]);

        let progress: Vec<(i32, usize, usize)> = recorder
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::PlaylistDownloadProgress {
                    show_number,
                    current,
                    total,
                } => Some((show_number, current, total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![(1, 1, 2), (3, 2, 2)]);
    }

    #[tokio::test]
    async fn failure_does_not_stop_the_run() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let list = playlist(&[1, 2, 3]);
        let server = server_for(&[1, 3]);

        let result = download_playlist(
            &server,
            &FakeSource::with_numbers(&[1, 2, 3]),
            &cache,
            &list,
            &OnlineStatus::default(),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.downloaded, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_shows[0].0, 2);
        assert!(!cache.is_downloaded(&list.shows[1]));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn failed_details_count_as_failure() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let mut source = FakeSource::with_numbers(&[1]);
        source.fail_details = true;

        let result = download_playlist(
            &server_for(&[1]),
            &source,
            &cache,
            &playlist(&[1]),
            &OnlineStatus::default(),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.failed, 1);
        assert!(matches!(
            result.failed_shows[0].1,
            DownloadError::Details { show_number: 1, .. }
        ));
    }

    #[tokio::test]
    async fn refuses_to_start_offline() {
        let dir = tempdir().unwrap();
        let server = server_for(&[1]);

        let result = download_playlist(
            &server,
            &FakeSource::with_numbers(&[1]),
            &ShowCache::new(dir.path()),
            &playlist(&[1]),
            &OnlineStatus::new(false),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DownloadError::Offline)));
        assert!(server.requests().is_empty());
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_show() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let list = playlist(&[1, 2]);
        let server = server_for(&[1, 2]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = download_playlist(
            &server,
            &FakeSource::with_numbers(&[1, 2]),
            &cache,
            &list,
            &OnlineStatus::default(),
            &NoopReporter::shared(),
            &cancel,
        )
        .await
        .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.downloaded, 0);
        assert_eq!(cache.not_downloaded_count(&list), 2);
    }
}
