// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub mod config;
pub mod connectivity;
pub mod episode;
pub mod error;
pub mod http;
pub mod model;
pub mod offline;
pub mod pager;
pub mod playback;
pub mod progress;
pub mod session;
pub mod source;
pub mod store;

// Re-export main types for convenience
pub use config::Config;
pub use connectivity::{ConnectivityProbe, HttpProbe, OnlineStatus, StaticProbe};
pub use episode::{DownloadResult, ShowCache, download_show};
pub use error::{AudioError, DownloadError, PersistenceError, PlaybackError, SourceError};
pub use http::{HttpClient, HttpResponse, ReqwestClient};
pub use model::{PlayList, Show, ShowDetails};
pub use offline::{PlaylistDownloadResult, download_playlist};
pub use pager::FeedPager;
pub use playback::{
    AudioBackend, PlaybackEngine, PlaybackState, Player, PlayerHandle, PlaylistCursor, TrackEnded,
};
pub use progress::{NoopReporter, ProgressEvent, ProgressReporter, SharedProgressReporter};
pub use session::{PlaylistDraft, Session};
pub use source::{ApiClient, CachingSource, EpisodeSource};
pub use store::PlaylistStore;
