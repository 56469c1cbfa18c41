// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single podcast episode as served by the episode API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    /// Opaque identity; playlists match shows on this field
    pub id: i64,
    /// Public episode number, also used for ordering and paging
    pub show_number: i32,
    #[serde(default)]
    pub show_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_published: Option<DateTime<Utc>>,
    /// Remote audio location; empty when the show is not playable
    #[serde(default)]
    pub mp3_url: String,
    /// Populated only by detail lookups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_details: Option<ShowDetails>,
}

impl Show {
    /// Whether this show points at an audio file at all
    pub fn is_playable(&self) -> bool {
        !self.mp3_url.trim().is_empty()
    }

    /// Copy of this show without the detail payload, as stored in playlists
    pub fn without_details(&self) -> Show {
        Show {
            show_details: None,
            ..self.clone()
        }
    }
}

/// Extra information fetched on demand for a single show
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowDetails {
    #[serde(default)]
    pub guests: Vec<Guest>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<AudioFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    #[serde(default)]
    pub text: String,
    pub url: String,
}

/// The audio file descriptor attached to show details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    /// Duration as published by the API, e.g. "01:02:03"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
}
