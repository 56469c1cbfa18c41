// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::AudioError;

/// A single loaded audio stream.
///
/// Positions and durations are in seconds. A duration of 0 means unknown.
pub trait Player: Send + Sync {
    fn play(&self);
    fn pause(&self);
    /// Stop output for good. Calling it again has no effect.
    fn stop(&self);
    fn seek(&self, seconds: f64) -> Result<(), AudioError>;
    fn current_position(&self) -> f64;
    fn duration(&self) -> f64;
}

/// A freshly created player and its end-of-track signal
pub struct PlayerHandle {
    pub player: Arc<dyn Player>,
    /// Resolves once when the track plays to its natural end
    pub ended: oneshot::Receiver<()>,
}

/// Creates players for local audio files
pub trait AudioBackend: Send + Sync {
    /// Load `file` paused; playback starts on [`Player::play`]
    fn create_player(&self, file: File) -> Result<PlayerHandle, AudioError>;
}

impl<T: AudioBackend + ?Sized> AudioBackend for Arc<T> {
    fn create_player(&self, file: File) -> Result<PlayerHandle, AudioError> {
        (**self).create_player(file)
    }
}
