// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Show;

/// A named, ordered collection of shows.
///
/// Order is meaningful: it is both the display order and the playback order.
/// `Clone` produces an independent deep copy, which the playlist editor works
/// on until the edit is submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayList {
    pub id: Uuid,
    pub name: String,
    pub date_created: DateTime<Utc>,
    #[serde(default)]
    pub shows: Vec<Show>,
}

impl PlayList {
    /// Create an empty playlist with a fresh identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            date_created: Utc::now(),
            shows: Vec::new(),
        }
    }

    /// Position of a show, matched by `Show::id`
    pub fn position_of(&self, show: &Show) -> Option<usize> {
        self.shows.iter().position(|s| s.id == show.id)
    }

    pub fn contains_show(&self, show: &Show) -> bool {
        self.position_of(show).is_some()
    }

    /// The show following `current`, or `None` when `current` is the last
    /// one or not part of this playlist
    pub fn show_after(&self, current: &Show) -> Option<&Show> {
        self.position_of(current)
            .and_then(|index| self.shows.get(index + 1))
    }

    /// Swap a show with its predecessor. Returns false if it is already first
    /// or not present.
    pub fn move_show_up(&mut self, show: &Show) -> bool {
        match self.position_of(show) {
            Some(index) if index > 0 => {
                self.shows.swap(index, index - 1);
                true
            }
            _ => false,
        }
    }

    /// Swap a show with its successor. Returns false if it is already last
    /// or not present.
    pub fn move_show_down(&mut self, show: &Show) -> bool {
        match self.position_of(show) {
            Some(index) if index + 1 < self.shows.len() => {
                self.shows.swap(index, index + 1);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(id: i64, number: i32) -> Show {
        Show {
            id,
            show_number: number,
            show_title: format!("Show {number}"),
            description: None,
            date_published: None,
            mp3_url: format!("https://example.com/{number}.mp3"),
            show_details: None,
        }
    }

    fn playlist() -> PlayList {
        let mut list = PlayList::new("Favourites");
        list.shows = vec![show(1, 3), show(2, 2), show(3, 1)];
        list
    }

    #[test]
    fn new_playlists_get_distinct_ids() {
        let a = PlayList::new("a");
        let b = PlayList::new("a");
        assert_ne!(a.id, b.id);
        assert!(a.shows.is_empty());
    }

    #[test]
    fn contains_matches_on_id_not_number() {
        let list = playlist();
        let mut impostor = show(99, 3);
        assert!(!list.contains_show(&impostor));

        impostor.id = 2;
        assert!(list.contains_show(&impostor));
    }

    #[test]
    fn show_after_walks_in_order() {
        let list = playlist();
        assert_eq!(list.show_after(&show(1, 3)).unwrap().id, 2);
        assert_eq!(list.show_after(&show(2, 2)).unwrap().id, 3);
        assert!(list.show_after(&show(3, 1)).is_none());
        assert!(list.show_after(&show(42, 42)).is_none());
    }

    #[test]
    fn clone_is_independent() {
        let original = playlist();
        let mut copy = original.clone();
        copy.name = "Renamed".to_string();
        copy.shows.pop();

        assert_eq!(original.name, "Favourites");
        assert_eq!(original.shows.len(), 3);
    }

    #[test]
    fn move_up_and_down() {
        let mut list = playlist();

        assert!(list.move_show_up(&show(2, 2)));
        assert_eq!(list.shows[0].id, 2);
        assert!(!list.move_show_up(&show(2, 2)));

        assert!(list.move_show_down(&show(2, 2)));
        assert_eq!(list.shows[1].id, 2);
        assert!(!list.move_show_down(&show(3, 1)));
        assert!(!list.move_show_down(&show(42, 42)));
    }

    #[test]
    fn serializes_camel_case() {
        let list = playlist();
        let json = serde_json::to_value(&list).unwrap();
        assert!(json.get("dateCreated").is_some());
        assert_eq!(json["shows"][0]["showNumber"], 3);
    }
}
