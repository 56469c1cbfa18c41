// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod engine;
mod player;
mod position;
#[cfg(feature = "audio")]
mod rodio_backend;

pub use engine::{PlaybackEngine, PlaybackState, PlaylistCursor, TrackEnded};
pub use player::{AudioBackend, Player, PlayerHandle};
pub use position::{PositionSample, format_position, percentage};
#[cfg(feature = "audio")]
pub use rodio_backend::RodioBackend;
