// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use crate::http::HttpClient;

/// Answers "can we reach the internet right now?"
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_internet_reachable(&self) -> bool;
}

/// Probe that considers the network reachable when a known URL answers
/// with anything other than a server error
pub struct HttpProbe<C> {
    client: C,
    url: String,
}

impl<C: HttpClient> HttpProbe<C> {
    pub fn new(client: C, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl<C: HttpClient> ConnectivityProbe for HttpProbe<C> {
    async fn is_internet_reachable(&self) -> bool {
        match self.client.get_stream(&self.url).await {
            Ok(response) => response.status < 500,
            Err(e) => {
                debug!("Connectivity probe to {} failed: {}", self.url, e);
                false
            }
        }
    }
}

/// Probe with a fixed answer, for offline-only setups and tests
#[derive(Debug, Clone, Copy)]
pub struct StaticProbe(pub bool);

#[async_trait]
impl ConnectivityProbe for StaticProbe {
    async fn is_internet_reachable(&self) -> bool {
        self.0
    }
}

/// Last known connectivity, shared between the session and the source layer.
///
/// Reads never block; `refresh` is the only operation that touches the network.
#[derive(Debug, Clone)]
pub struct OnlineStatus(Arc<AtomicBool>);

impl OnlineStatus {
    pub fn new(online: bool) -> Self {
        Self(Arc::new(AtomicBool::new(online)))
    }

    pub fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn set(&self, online: bool) {
        self.0.store(online, Ordering::SeqCst);
    }

    /// Ask the probe and remember the answer
    pub async fn refresh<P: ConnectivityProbe + ?Sized>(&self, probe: &P) -> bool {
        let online = probe.is_internet_reachable().await;
        let previous = self.0.swap(online, Ordering::SeqCst);
        if previous != online {
            debug!("Connectivity changed: online = {}", online);
        }
        online
    }
}

impl Default for OnlineStatus {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{ByteStream, BytesResponse, HttpResponse};
    use bytes::Bytes;

    struct StatusClient(u16);

    #[async_trait]
    impl HttpClient for StatusClient {
        async fn get_bytes(&self, _url: &str) -> Result<BytesResponse, reqwest::Error> {
            Ok(BytesResponse {
                status: self.0,
                body: Bytes::new(),
            })
        }

        async fn post_json(
            &self,
            _url: &str,
            _body: Vec<u8>,
        ) -> Result<BytesResponse, reqwest::Error> {
            self.get_bytes("").await
        }

        async fn get_stream(&self, _url: &str) -> Result<HttpResponse, reqwest::Error> {
            let body: ByteStream =
                Box::pin(futures::stream::empty::<Result<Bytes, std::io::Error>>());
            Ok(HttpResponse {
                status: self.0,
                content_length: None,
                body,
            })
        }
    }

    #[tokio::test]
    async fn http_probe_reads_status() {
        assert!(
            HttpProbe::new(StatusClient(200), "https://example.com")
                .is_internet_reachable()
                .await
        );
        assert!(
            HttpProbe::new(StatusClient(404), "https://example.com")
                .is_internet_reachable()
                .await
        );
        assert!(
            !HttpProbe::new(StatusClient(503), "https://example.com")
                .is_internet_reachable()
                .await
        );
    }

    #[tokio::test]
    async fn refresh_updates_shared_flag() {
        let status = OnlineStatus::default();
        let shared = status.clone();

        assert!(!status.refresh(&StaticProbe(false)).await);
        assert!(!shared.is_online());

        assert!(status.refresh(&StaticProbe(true)).await);
        assert!(shared.is_online());
    }
}
