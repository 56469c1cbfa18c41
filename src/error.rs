// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when talking to the remote episode source
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Request to {url} failed: {source}")]
    RequestFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to parse response from {url}: {source}")]
    InvalidJson {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode request for {url}: {source}")]
    EncodeFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Show {0} is not available offline")]
    NotCached(i32),

    #[error("Not connected and nothing cached for {0}")]
    Offline(String),
}

/// Errors that can occur while downloading show audio into the local cache
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Show {show_number} has no audio URL")]
    MissingUrl { show_number: i32 },

    #[error("HTTP request failed for {url}: {source}")]
    HttpFailed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP error {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Failed to create file {path}: {source}")]
    FileCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to file {path}: {source}")]
    FileWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stream error while downloading {url}: {source}")]
    StreamFailed {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to fetch details for show {show_number}: {source}")]
    Details {
        show_number: i32,
        #[source]
        source: SourceError,
    },

    #[error("Download of {url} was cancelled")]
    Cancelled { url: String },

    #[error("Not connected to the internet")]
    Offline,
}

/// Errors that can occur when reading or writing the playlist file
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Failed to read playlist file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write playlist file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse playlist JSON in {path}: {source}")]
    JsonParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize playlists: {0}")]
    JsonSerializeFailed(#[from] serde_json::Error),
}

/// Errors raised by the audio output layer
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output device available: {0}")]
    Device(String),

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Seek failed: {0}")]
    Seek(String),
}

/// Errors that can occur when starting playback
#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Show {show_number} has no audio URL")]
    MissingInput { show_number: i32 },

    #[error("No show loaded")]
    NothingLoaded,

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Episode source error: {0}")]
    Source(#[from] SourceError),

    #[error("Failed to open audio file {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),
}
