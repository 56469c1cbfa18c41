// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, mpsc};
use std::time::Duration;

use rodio::mixer::Mixer;
use rodio::{Decoder, OutputStreamBuilder, Sink, Source};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::AudioError;

use super::{AudioBackend, Player, PlayerHandle};

/// Audio output on the default device.
///
/// The output stream cannot leave the thread that opened it, so it lives on
/// a dedicated thread for as long as the backend exists; players only talk
/// to its mixer.
pub struct RodioBackend {
    mixer: Mixer,
    _keep_alive: mpsc::Sender<()>,
}

impl RodioBackend {
    pub fn open_default() -> Result<Self, AudioError> {
        let (ready_tx, ready_rx) = mpsc::channel();
        let (keep_alive, closed) = mpsc::channel::<()>();

        std::thread::Builder::new()
            .name("podlist-audio".to_string())
            .spawn(move || match OutputStreamBuilder::open_default_stream() {
                Ok(mut stream) => {
                    stream.log_on_drop(false);
                    let _ = ready_tx.send(Ok(stream.mixer().clone()));
                    // Returns once the backend is dropped
                    let _ = closed.recv();
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| AudioError::Device(e.to_string()))?;

        let mixer = ready_rx
            .recv()
            .map_err(|_| AudioError::Device("audio thread exited".to_string()))?
            .map_err(AudioError::Device)?;

        Ok(Self {
            mixer,
            _keep_alive: keep_alive,
        })
    }
}

impl AudioBackend for RodioBackend {
    fn create_player(&self, file: File) -> Result<PlayerHandle, AudioError> {
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| AudioError::Decode(e.to_string()))?;
        let duration = decoder
            .total_duration()
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();

        let sink = Arc::new(Sink::connect_new(&self.mixer));
        sink.pause();
        sink.append(decoder);

        let (ended_tx, ended) = oneshot::channel();
        let waiter = sink.clone();
        std::thread::Builder::new()
            .name("podlist-track-end".to_string())
            .spawn(move || {
                waiter.sleep_until_end();
                // Nobody listens any more if the track was torn down
                let _ = ended_tx.send(());
            })
            .map_err(|e| AudioError::Device(e.to_string()))?;

        debug!("Created player, duration {:.1}s", duration);
        Ok(PlayerHandle {
            player: Arc::new(RodioPlayer { sink, duration }),
            ended,
        })
    }
}

struct RodioPlayer {
    sink: Arc<Sink>,
    duration: f64,
}

impl Player for RodioPlayer {
    fn play(&self) {
        self.sink.play();
    }

    fn pause(&self) {
        self.sink.pause();
    }

    fn stop(&self) {
        self.sink.stop();
    }

    fn seek(&self, seconds: f64) -> Result<(), AudioError> {
        self.sink
            .try_seek(Duration::from_secs_f64(seconds.max(0.0)))
            .map_err(|e| AudioError::Seek(e.to_string()))
    }

    fn current_position(&self) -> f64 {
        self.sink.get_pos().as_secs_f64()
    }

    fn duration(&self) -> f64 {
        self.duration
    }
}
