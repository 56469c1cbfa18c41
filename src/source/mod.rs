// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod api;
mod cached;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SourceError;
use crate::model::Show;

pub use api::ApiClient;
pub use cached::CachingSource;

/// Where shows come from.
///
/// Implementations return shows in display order (newest first).
#[async_trait]
pub trait EpisodeSource: Send + Sync {
    /// Every known show number of the podcast
    async fn get_show_numbers(&self) -> Result<Vec<i32>, SourceError>;

    /// The shows with the given numbers
    async fn get_shows_by_numbers(&self, numbers: &[i32]) -> Result<Vec<Show>, SourceError>;

    /// Up to `limit` shows matching `query`, skipping the first `offset` matches
    async fn get_filtered_shows(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, SourceError>;

    /// A single show with its details populated. Safe to call repeatedly.
    async fn get_show_with_details(&self, show_number: i32) -> Result<Show, SourceError>;
}

#[async_trait]
impl<T: EpisodeSource + ?Sized> EpisodeSource for Arc<T> {
    async fn get_show_numbers(&self) -> Result<Vec<i32>, SourceError> {
        (**self).get_show_numbers().await
    }

    async fn get_shows_by_numbers(&self, numbers: &[i32]) -> Result<Vec<Show>, SourceError> {
        (**self).get_shows_by_numbers(numbers).await
    }

    async fn get_filtered_shows(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, SourceError> {
        (**self).get_filtered_shows(query, offset, limit).await
    }

    async fn get_show_with_details(&self, show_number: i32) -> Result<Show, SourceError> {
        (**self).get_show_with_details(show_number).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;
    use crate::model::ShowDetails;

    /// In-memory catalog that behaves like the episode API
    #[derive(Default)]
    pub struct FakeSource {
        /// Shows in display order (newest first)
        pub shows: Vec<Show>,
        pub fail_details: bool,
        pub calls: Mutex<Vec<String>>,
    }

    impl FakeSource {
        /// A catalog holding the given show numbers, each with id `number * 10`
        pub fn with_numbers(numbers: &[i32]) -> Self {
            let mut shows: Vec<Show> = numbers.iter().map(|&n| make_show(n)).collect();
            shows.sort_by(|a, b| b.show_number.cmp(&a.show_number));
            Self {
                shows,
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    pub fn make_show(number: i32) -> Show {
        Show {
            id: i64::from(number) * 10,
            show_number: number,
            show_title: format!("Show {number}"),
            description: None,
            date_published: None,
            mp3_url: format!("https://media.example.com/shows/{number}.mp3"),
            show_details: None,
        }
    }

    #[async_trait]
    impl EpisodeSource for FakeSource {
        async fn get_show_numbers(&self) -> Result<Vec<i32>, SourceError> {
            self.record("numbers".to_string());
            Ok(self.shows.iter().map(|s| s.show_number).collect())
        }

        async fn get_shows_by_numbers(&self, numbers: &[i32]) -> Result<Vec<Show>, SourceError> {
            self.record(format!("by_numbers {numbers:?}"));
            Ok(self
                .shows
                .iter()
                .filter(|s| numbers.contains(&s.show_number))
                .cloned()
                .collect())
        }

        async fn get_filtered_shows(
            &self,
            query: &str,
            offset: usize,
            limit: usize,
        ) -> Result<Vec<Show>, SourceError> {
            self.record(format!("filtered {query} {offset} {limit}"));
            let query = query.to_lowercase();
            Ok(self
                .shows
                .iter()
                .filter(|s| s.show_title.to_lowercase().contains(&query))
                .skip(offset)
                .take(limit)
                .cloned()
                .collect())
        }

        async fn get_show_with_details(&self, show_number: i32) -> Result<Show, SourceError> {
            self.record(format!("details {show_number}"));
            if self.fail_details {
                return Err(SourceError::HttpStatus {
                    url: format!("details/{show_number}"),
                    status: 500,
                });
            }
            self.shows
                .iter()
                .find(|s| s.show_number == show_number)
                .map(|s| Show {
                    show_details: Some(ShowDetails::default()),
                    ..s.clone()
                })
                .ok_or(SourceError::HttpStatus {
                    url: format!("details/{show_number}"),
                    status: 404,
                })
        }
    }
}
