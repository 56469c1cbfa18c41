// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::Player;

/// Latest sampled playback position
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionSample {
    pub percentage: f64,
    pub position: String,
}

impl PositionSample {
    pub fn of(player: &dyn Player) -> Self {
        let position = player.current_position();
        let duration = player.duration();
        Self {
            percentage: percentage(position, duration),
            position: format_position(position, duration),
        }
    }
}

/// Share of the track already played, 0 to 100. Unknown duration gives 0.
pub fn percentage(position: f64, duration: f64) -> f64 {
    if duration > 0.0 {
        (position * 100.0 / duration).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// `"mm:ss / mm:ss"`, minutes not wrapping at the hour
pub fn format_position(position: f64, duration: f64) -> String {
    format!("{} / {}", format_time(position), format_time(duration))
}

fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    format!("{:02}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_minutes_and_seconds() {
        assert_eq!(format_position(65.9, 600.0), "01:05 / 10:00");
        assert_eq!(format_position(0.0, 0.0), "00:00 / 00:00");
    }

    #[test]
    fn minutes_do_not_wrap_at_the_hour() {
        assert_eq!(format_position(3725.0, 4500.0), "62:05 / 75:00");
    }

    #[test]
    fn percentage_of_track() {
        assert_eq!(percentage(30.0, 120.0), 25.0);
        assert_eq!(percentage(5.0, 0.0), 0.0);
        assert_eq!(percentage(130.0, 120.0), 100.0);
    }

    #[test]
    fn nonsense_positions_format_as_zero() {
        assert_eq!(format_position(f64::NAN, -3.0), "00:00 / 00:00");
    }
}
