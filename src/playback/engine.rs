// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DEFAULT_SAMPLE_PERIOD;
use crate::episode::{ShowCache, download_show};
use crate::error::PlaybackError;
use crate::http::HttpClient;
use crate::model::Show;
use crate::progress::{NoopReporter, ProgressEvent, SharedProgressReporter};
use crate::session::Session;
use crate::source::EpisodeSource;

use super::position::PositionSample;
use super::{AudioBackend, Player, PlayerHandle};

/// Seconds skipped by one seek step
const SEEK_STEP: f64 = 10.0;

const MESSAGE_NO_INPUT: &str = "Please enter a URL to an MP3 file";
const MESSAGE_DOWNLOADING: &str = "Downloading...";
const MESSAGE_ERROR: &str = "An error occurred. Please try again later.";
const MESSAGE_PLAYING: &str = "Playing";
const MESSAGE_PAUSED: &str = "Paused";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Where playlist playback currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistCursor {
    /// 1-based position of the playing show
    pub index: usize,
    pub count: usize,
}

/// What happened after a track played to its end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackEnded {
    /// Single show playback finished
    Stopped,
    /// The next playlist show is playing
    Advanced {
        show_number: i32,
        index: usize,
        count: usize,
    },
    /// The last playlist show finished; the front end should go home
    PlaylistFinished,
}

#[derive(Debug)]
enum EngineEvent {
    TrackEnded { generation: u64 },
}

/// Resources of one playing track. Dropping it silences the player and
/// ends the background tasks.
struct ActivePlayback {
    player: Arc<dyn Player>,
    /// Cancelled before anything else on teardown; the sampler checks it
    /// under the sample lock
    halt: CancellationToken,
    sampler: JoinHandle<()>,
    watcher: JoinHandle<()>,
}

impl Drop for ActivePlayback {
    fn drop(&mut self) {
        self.halt.cancel();
        self.sampler.abort();
        self.watcher.abort();
        self.player.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Plays shows one at a time, downloading them into the cache first.
///
/// Natural end of a track arrives as an event tagged with the generation of
/// the player that produced it; the front end waits for it with
/// [`track_ended`](Self::track_ended) and hands it back through
/// [`on_track_ended`](Self::on_track_ended). Events of players that were
/// already torn down are dropped.
pub struct PlaybackEngine<C, S, A> {
    client: C,
    source: S,
    backend: A,
    cache: ShowCache,
    reporter: SharedProgressReporter,
    sample_period: Duration,

    state: PlaybackState,
    message: String,
    current: Option<Show>,
    active: Option<ActivePlayback>,
    sample: Arc<Mutex<PositionSample>>,
    playlist: Option<PlaylistCursor>,

    generation: u64,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    downloads: CancellationToken,
}

impl<C, S, A> PlaybackEngine<C, S, A>
where
    C: HttpClient,
    S: EpisodeSource,
    A: AudioBackend,
{
    pub fn new(client: C, source: S, backend: A, cache: ShowCache) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            client,
            source,
            backend,
            cache,
            reporter: NoopReporter::shared(),
            sample_period: DEFAULT_SAMPLE_PERIOD,
            state: PlaybackState::Stopped,
            message: String::new(),
            current: None,
            active: None,
            sample: Arc::new(Mutex::new(PositionSample::default())),
            playlist: None,
            generation: 0,
            events_tx,
            events_rx,
            downloads: CancellationToken::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: SharedProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_sample_period(mut self, period: Duration) -> Self {
        self.sample_period = period.max(Duration::from_millis(1));
        self
    }

    /// Abort show downloads started by this engine once `token` is cancelled
    pub fn with_download_cancel(mut self, token: CancellationToken) -> Self {
        self.downloads = token;
        self
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// User-facing status line
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn current_show(&self) -> Option<&Show> {
        self.current.as_ref()
    }

    pub fn percentage(&self) -> f64 {
        lock(&self.sample).percentage
    }

    /// `"mm:ss / mm:ss"`, empty while stopped
    pub fn position_text(&self) -> String {
        lock(&self.sample).position.clone()
    }

    /// Position within the playlist, `None` outside playlist playback
    pub fn playlist_cursor(&self) -> Option<PlaylistCursor> {
        self.playlist
    }

    /// Fetch a show with its details and make it the current one.
    ///
    /// Anything still playing is torn down first.
    pub async fn load_show(&mut self, show_number: i32) -> Result<&Show, PlaybackError> {
        self.leave();
        match self.source.get_show_with_details(show_number).await {
            Ok(show) => Ok(&*self.current.insert(show)),
            Err(e) => {
                warn!("Could not load show {}: {}", show_number, e);
                Err(e.into())
            }
        }
    }

    /// Play `show`, or resume if paused.
    pub async fn play(&mut self, show: &Show) -> Result<(), PlaybackError> {
        if self.state == PlaybackState::Stopped {
            self.current = Some(show.clone());
        }
        self.play_current().await
    }

    /// Play the current show. No-op while playing; resumes in place while paused.
    pub async fn play_current(&mut self) -> Result<(), PlaybackError> {
        match self.state {
            PlaybackState::Playing => return Ok(()),
            PlaybackState::Paused if self.active.is_some() => {
                self.resume();
                return Ok(());
            }
            _ => {}
        }

        let show = self.current.clone().ok_or(PlaybackError::NothingLoaded)?;
        self.start(&show).await
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        if let Some(active) = &self.active {
            active.player.pause();
        }
        self.set_state(PlaybackState::Paused);
    }

    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        if let Some(active) = &self.active {
            active.player.play();
            self.set_state(PlaybackState::Playing);
        }
    }

    /// Stop playback and leave playlist mode. Only acts while playing.
    pub fn stop(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.playlist = None;
        self.teardown();
        self.set_state(PlaybackState::Stopped);
    }

    /// Skip ahead; stops instead when that would reach the end of the track
    pub fn seek_forward(&mut self) {
        let Some(player) = self.playing_player() else {
            return;
        };

        let target = player.current_position() + SEEK_STEP;
        let duration = player.duration();
        if duration > 0.0 && target >= duration {
            self.stop();
        } else if let Err(e) = player.seek(target) {
            warn!("Seek forward failed: {}", e);
        }
    }

    /// Skip back, not before the start of the track
    pub fn seek_backward(&mut self) {
        let Some(player) = self.playing_player() else {
            return;
        };

        let target = (player.current_position() - SEEK_STEP).max(0.0);
        if let Err(e) = player.seek(target) {
            warn!("Seek backward failed: {}", e);
        }
    }

    /// Navigate away: tear everything down and forget the playlist
    pub fn leave(&mut self) {
        self.playlist = None;
        self.teardown();
        if self.state != PlaybackState::Stopped {
            self.set_state(PlaybackState::Stopped);
        }
    }

    /// Start playing the selected playlist from its first show.
    ///
    /// Returns `Ok(false)` without doing anything when no playlist is
    /// selected or it is empty.
    pub async fn play_playlist(&mut self, session: &Session) -> Result<bool, PlaybackError> {
        let Some((first, count)) = session
            .selected_playlist()
            .and_then(|p| p.shows.first().map(|s| (s.show_number, p.shows.len())))
        else {
            return Ok(false);
        };

        self.leave();
        let show = match self.source.get_show_with_details(first).await {
            Ok(show) => show,
            Err(e) => return Err(self.fail(e.into())),
        };

        info!("Playing playlist of {} shows", count);
        self.playlist = Some(PlaylistCursor { index: 1, count });
        self.current = Some(show.clone());
        if let Err(e) = self.start(&show).await {
            self.playlist = None;
            return Err(e);
        }
        Ok(true)
    }

    /// Wait until the current track plays to its end.
    ///
    /// Pends forever while nothing is playing. Cancel safe.
    pub async fn track_ended(&mut self) {
        loop {
            let Some(EngineEvent::TrackEnded { generation }) = self.events_rx.recv().await else {
                return std::future::pending().await;
            };
            if generation == self.generation && self.active.is_some() {
                return;
            }
            debug!("Ignoring end of torn down track (generation {})", generation);
        }
    }

    /// Handle the natural end of the current track.
    ///
    /// In playlist mode the show after the current one in the selected
    /// playlist is fetched and played. When there is none, playlist mode
    /// ends and the front end is asked to navigate home.
    pub async fn on_track_ended(&mut self, session: &Session) -> Result<TrackEnded, PlaybackError> {
        self.teardown();
        self.set_state(PlaybackState::Stopped);

        if self.playlist.is_none() {
            return Ok(TrackEnded::Stopped);
        }

        let next = match (&self.current, session.selected_playlist()) {
            (Some(current), Some(playlist)) => playlist.show_after(current).map(|next| {
                let index = playlist.position_of(next).map_or(0, |i| i + 1);
                (next.show_number, index, playlist.shows.len())
            }),
            _ => None,
        };

        let Some((show_number, index, count)) = next else {
            info!("Playlist finished");
            self.playlist = None;
            self.reporter.report(ProgressEvent::NavigateHome);
            return Ok(TrackEnded::PlaylistFinished);
        };

        let show = match self.source.get_show_with_details(show_number).await {
            Ok(show) => show,
            Err(e) => {
                self.playlist = None;
                return Err(self.fail(e.into()));
            }
        };

        debug!("Advancing playlist to show {} ({} of {})", show_number, index, count);
        self.playlist = Some(PlaylistCursor { index, count });
        self.current = Some(show.clone());
        self.reporter.report(ProgressEvent::PlaylistAdvanced {
            show_number,
            index,
            count,
        });

        if let Err(e) = self.start(&show).await {
            self.playlist = None;
            return Err(e);
        }
        Ok(TrackEnded::Advanced {
            show_number,
            index,
            count,
        })
    }

    fn playing_player(&self) -> Option<Arc<dyn Player>> {
        if self.state != PlaybackState::Playing {
            return None;
        }
        self.active.as_ref().map(|active| active.player.clone())
    }

    async fn start(&mut self, show: &Show) -> Result<(), PlaybackError> {
        let Some(path) = self.cache.show_path(show).filter(|_| show.is_playable()) else {
            self.set_message(MESSAGE_NO_INPUT);
            return Err(PlaybackError::MissingInput {
                show_number: show.show_number,
            });
        };

        if !path.is_file() {
            self.set_message(MESSAGE_DOWNLOADING);
            let downloaded = download_show(
                &self.client,
                &self.cache,
                show,
                &self.reporter,
                &self.downloads,
            )
            .await;
            if let Err(e) = downloaded {
                return Err(self.fail(e.into()));
            }
        }

        match self.open_player(&path).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn open_player(&mut self, path: &Path) -> Result<(), PlaybackError> {
        self.teardown();

        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| PlaybackError::OpenFailed {
                path: path.to_path_buf(),
                source: e,
            })?
            .into_std()
            .await;
        let PlayerHandle { player, ended } = self.backend.create_player(file)?;

        self.generation += 1;
        let generation = self.generation;
        let halt = CancellationToken::new();
        let events = self.events_tx.clone();
        let watcher = tokio::spawn(async move {
            if ended.await.is_ok() {
                let _ = events.send(EngineEvent::TrackEnded { generation });
            }
        });
        let sampler = tokio::spawn(sample_position(
            player.clone(),
            self.sample.clone(),
            self.reporter.clone(),
            self.sample_period,
            halt.clone(),
        ));

        player.play();
        self.active = Some(ActivePlayback {
            player,
            halt,
            sampler,
            watcher,
        });

        info!("Playing {}", path.display());
        self.set_state(PlaybackState::Playing);
        Ok(())
    }

    fn teardown(&mut self) {
        self.active = None;
    }

    fn fail(&mut self, err: PlaybackError) -> PlaybackError {
        error!("Playback failed: {}", err);
        self.teardown();
        self.set_state(PlaybackState::Stopped);
        self.set_message(MESSAGE_ERROR);
        err
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.message = match state {
            PlaybackState::Playing => MESSAGE_PLAYING.to_string(),
            PlaybackState::Paused => MESSAGE_PAUSED.to_string(),
            PlaybackState::Stopped => {
                *lock(&self.sample) = PositionSample::default();
                String::new()
            }
        };
        self.report_state();
    }

    fn set_message(&mut self, message: &str) {
        self.message = message.to_string();
        self.report_state();
    }

    fn report_state(&self) {
        self.reporter.report(ProgressEvent::PlaybackStateChanged {
            state: self.state,
            message: self.message.clone(),
        });
    }
}

async fn sample_position(
    player: Arc<dyn Player>,
    sample: Arc<Mutex<PositionSample>>,
    reporter: SharedProgressReporter,
    period: Duration,
    halt: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = halt.cancelled() => return,
            _ = ticker.tick() => {}
        }
        let current = PositionSample::of(player.as_ref());

        // Teardown cancels before it resets the sample, so a reading taken
        // across a teardown is dropped here
        let mut slot = lock(&sample);
        if halt.is_cancelled() {
            return;
        }
        reporter.report(ProgressEvent::PlaybackProgress {
            percentage: current.percentage,
            position: current.position.clone(),
        });
        *slot = current;
    }
}
