// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::SourceError;
use crate::http::{BytesResponse, HttpClient};
use crate::model::Show;

use super::EpisodeSource;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GetByShowNumbersRequest<'a> {
    show_name: &'a str,
    indexes: &'a [i32],
}

/// Episode source backed by the podcast's JSON API
#[derive(Clone)]
pub struct ApiClient<C> {
    client: C,
    base_url: Url,
    show_name: String,
}

impl<C: HttpClient> ApiClient<C> {
    pub fn new(client: C, base_url: &str, show_name: &str) -> Result<Self, SourceError> {
        let base_url =
            Url::parse(base_url).map_err(|_| SourceError::InvalidBaseUrl(base_url.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(SourceError::InvalidBaseUrl(base_url.to_string()));
        }

        Ok(Self {
            client,
            base_url,
            show_name: show_name.to_string(),
        })
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, SourceError> {
        debug!("GET {}", url);
        let response = self
            .client
            .get_bytes(url)
            .await
            .map_err(|e| SourceError::RequestFailed {
                url: url.to_string(),
                source: e,
            })?;
        decode(url, response)
    }
}

fn decode<T: DeserializeOwned>(url: &str, response: BytesResponse) -> Result<T, SourceError> {
    if !response.is_success() {
        return Err(SourceError::HttpStatus {
            url: url.to_string(),
            status: response.status,
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| SourceError::InvalidJson {
        url: url.to_string(),
        source: e,
    })
}

#[async_trait]
impl<C: HttpClient> EpisodeSource for ApiClient<C> {
    async fn get_show_numbers(&self) -> Result<Vec<i32>, SourceError> {
        let url = self.endpoint(&["shownumbers", &self.show_name]);
        self.get_json(&url).await
    }

    async fn get_shows_by_numbers(&self, numbers: &[i32]) -> Result<Vec<Show>, SourceError> {
        let url = self.endpoint(&["getbyshownumbers"]);
        let request = GetByShowNumbersRequest {
            show_name: &self.show_name,
            indexes: numbers,
        };
        let body = serde_json::to_vec(&request).map_err(|e| SourceError::EncodeFailed {
            url: url.clone(),
            source: e,
        })?;

        debug!("POST {} ({} show numbers)", url, numbers.len());
        let response =
            self.client
                .post_json(&url, body)
                .await
                .map_err(|e| SourceError::RequestFailed {
                    url: url.clone(),
                    source: e,
                })?;
        decode(&url, response)
    }

    async fn get_filtered_shows(
        &self,
        query: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Show>, SourceError> {
        let offset = offset.to_string();
        let limit = limit.to_string();
        let url = self.endpoint(&["filteredshows", &self.show_name, query, &offset, &limit]);
        self.get_json(&url).await
    }

    async fn get_show_with_details(&self, show_number: i32) -> Result<Show, SourceError> {
        let number = show_number.to_string();
        let url = self.endpoint(&["showwithdetails", &self.show_name, &number]);
        self.get_json(&url).await
    }
}
