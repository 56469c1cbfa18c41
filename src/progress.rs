// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use crate::playback::PlaybackState;

/// Observable changes emitted by the client core.
///
/// A front end renders from these; every event means "something visible
/// changed, re-render".
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// The displayed show list changed
    ShowsChanged { count: usize },

    /// A playlist download is about to fetch its next show ("Downloading X of Y")
    PlaylistDownloadProgress {
        show_number: i32,
        /// 1-based position among the shows that need downloading
        current: usize,
        total: usize,
    },

    /// A single audio download is starting
    DownloadStarting {
        show_number: i32,
        /// Expected content length in bytes, if known
        content_length: Option<u64>,
    },

    /// Download progress update
    DownloadProgress {
        show_number: i32,
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },

    /// A download completed successfully
    DownloadCompleted {
        show_number: i32,
        bytes_downloaded: u64,
    },

    /// A download failed
    DownloadFailed { show_number: i32, error: String },

    /// Playlist download finished (successfully or not)
    PlaylistDownloadCompleted {
        downloaded_count: usize,
        skipped_count: usize,
        failed_count: usize,
    },

    /// The playback engine changed state or its status message
    PlaybackStateChanged {
        state: PlaybackState,
        message: String,
    },

    /// Periodic playback position sample
    PlaybackProgress { percentage: f64, position: String },

    /// Playlist playback moved on to another show
    PlaylistAdvanced {
        show_number: i32,
        index: usize,
        count: usize,
    },

    /// Playlist playback ran out of shows; the front end should return to the listing
    NavigateHome,
}

/// Trait for reporting observable changes.
///
/// Implementations can use this to display progress bars, log messages,
/// or collect events for assertions.
pub trait ProgressReporter: Send + Sync {
    /// Report an event
    fn report(&self, event: ProgressEvent);
}

/// A shared reference to a progress reporter
pub type SharedProgressReporter = Arc<dyn ProgressReporter>;

/// A no-op progress reporter that silently ignores all events.
/// Useful for tests or quiet mode.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _event: ProgressEvent) {
        // Intentionally empty
    }
}

impl NoopReporter {
    /// Create a new NoopReporter wrapped in an Arc
    pub fn shared() -> SharedProgressReporter {
        Arc::new(Self)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Reporter that records every event for later inspection
    #[derive(Default)]
    pub struct RecordingReporter {
        events: Mutex<Vec<ProgressEvent>>,
    }

    impl RecordingReporter {
        pub fn shared() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn events(&self) -> Vec<ProgressEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    impl ProgressReporter for RecordingReporter {
        fn report(&self, event: ProgressEvent) {
            self.events.lock().unwrap().push(event);
        }
    }
}
