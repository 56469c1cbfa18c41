// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::http::HttpClient;
use crate::model::Show;
use crate::progress::{ProgressEvent, SharedProgressReporter};

use super::ShowCache;

/// Suffix of files that are still being written
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Outcome of a successful download
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Final location of the audio file
    pub path: PathBuf,
    /// Bytes written
    pub bytes_downloaded: u64,
}

/// Path used while a download is in flight
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Download a show's audio into the cache.
///
/// The body is streamed to `<target>.partial` and renamed into place only
/// once fully written, so the cache never contains a truncated file under
/// its final name. On any failure, including cancellation, the partial file
/// is removed.
pub async fn download_show<C: HttpClient>(
    client: &C,
    cache: &ShowCache,
    show: &Show,
    reporter: &SharedProgressReporter,
    cancel: &CancellationToken,
) -> Result<DownloadResult, DownloadError> {
    let output_path = cache.show_path(show).ok_or(DownloadError::MissingUrl {
        show_number: show.show_number,
    })?;

    if let Some(parent) = output_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
    }

    let partial = partial_path(&output_path);
    let result = stream_to_file(client, show, &partial, reporter, cancel).await;

    let bytes_downloaded = match result {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::rename(&partial, &output_path).await {
        let _ = tokio::fs::remove_file(&partial).await;
        return Err(DownloadError::FileWriteFailed {
            path: output_path,
            source: e,
        });
    }

    info!(
        "Downloaded show {} ({} bytes) to {}",
        show.show_number,
        bytes_downloaded,
        output_path.display()
    );

    reporter.report(ProgressEvent::DownloadCompleted {
        show_number: show.show_number,
        bytes_downloaded,
    });

    Ok(DownloadResult {
        path: output_path,
        bytes_downloaded,
    })
}

async fn stream_to_file<C: HttpClient>(
    client: &C,
    show: &Show,
    output_path: &Path,
    reporter: &SharedProgressReporter,
    cancel: &CancellationToken,
) -> Result<u64, DownloadError> {
    let url = show.mp3_url.as_str();

    if cancel.is_cancelled() {
        return Err(DownloadError::Cancelled {
            url: url.to_string(),
        });
    }

    debug!("Requesting {}", url);
    let response = client
        .get_stream(url)
        .await
        .map_err(|e| DownloadError::HttpFailed {
            url: url.to_string(),
            source: e,
        })?;

    if response.status >= 400 {
        return Err(DownloadError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    reporter.report(ProgressEvent::DownloadStarting {
        show_number: show.show_number,
        content_length: response.content_length,
    });

    let mut file =
        File::create(output_path)
            .await
            .map_err(|e| DownloadError::FileCreateFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.body;

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(DownloadError::Cancelled { url: url.to_string() });
            }
            next = stream.next() => match next {
                Some(chunk) => chunk,
                None => break,
            },
        };

        let chunk = chunk.map_err(|e| DownloadError::StreamFailed {
            url: url.to_string(),
            source: e,
        })?;

        file.write_all(&chunk)
            .await
            .map_err(|e| DownloadError::FileWriteFailed {
                path: output_path.to_path_buf(),
                source: e,
            })?;

        bytes_downloaded += chunk.len() as u64;

        reporter.report(ProgressEvent::DownloadProgress {
            show_number: show.show_number,
            bytes_downloaded,
            total_bytes: response.content_length,
        });
    }

    file.flush()
        .await
        .map_err(|e| DownloadError::FileWriteFailed {
            path: output_path.to_path_buf(),
            source: e,
        })?;

    Ok(bytes_downloaded)
}


#[cfg(test)]
mod tests {
    use super::testing::MockAudioServer;
    use super::*;
    use crate::progress::NoopReporter;
    use tempfile::tempdir;

    const URL: &str = "https://media.example.com/shows/1850.mp3";

    fn make_show(url: &str) -> Show {
        Show {
            id: 1,
            show_number: 1850,
            show_title: "Test Show".to_string(),
            description: None,
            date_published: None,
            mp3_url: url.to_string(),
            show_details: None,
        }
    }

    #[tokio::test]
    async fn download_writes_file_at_cache_path() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let client = MockAudioServer::with(URL, b"test audio content");

        let result = download_show(
            &client,
            &cache,
            &make_show(URL),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.bytes_downloaded, 18);
        assert_eq!(result.path, dir.path().join("media.example.com-shows-1850.mp3"));
        assert_eq!(std::fs::read(&result.path).unwrap(), b"test audio content");
        assert!(!partial_path(&result.path).exists());
    }

    #[tokio::test]
    async fn download_fails_on_http_error() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let client = MockAudioServer::default();

        let result = download_show(
            &client,
            &cache,
            &make_show(URL),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await;

        match result.unwrap_err() {
            DownloadError::HttpStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("Expected HttpStatus error, got {other:?}"),
        }
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn broken_stream_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let mut client = MockAudioServer::with(URL, b"first chunk");
        client.broken.push(URL.to_string());

        let show = make_show(URL);
        let result = download_show(
            &client,
            &cache,
            &show,
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DownloadError::StreamFailed { .. })));
        let path = cache.show_path(&show).unwrap();
        assert!(!path.exists());
        assert!(!partial_path(&path).exists());
    }

    #[tokio::test]
    async fn cancelled_download_leaves_nothing_behind() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());
        let client = MockAudioServer::with(URL, b"audio");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let show = make_show(URL);
        let result =
            download_show(&client, &cache, &show, &NoopReporter::shared(), &cancel).await;

        assert!(matches!(result, Err(DownloadError::Cancelled { .. })));
        assert!(!cache.is_downloaded(&show));
    }

    #[tokio::test]
    async fn missing_url_is_rejected() {
        let dir = tempdir().unwrap();
        let cache = ShowCache::new(dir.path());

        let result = download_show(
            &MockAudioServer::default(),
            &cache,
            &make_show(""),
            &NoopReporter::shared(),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(
            result,
            Err(DownloadError::MissingUrl { show_number: 1850 })
        ));
    }
}
