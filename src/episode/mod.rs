// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

mod cache;
mod download;

pub use cache::{ShowCache, cache_file_name};
pub use download::{DownloadResult, PARTIAL_SUFFIX, download_show, partial_path};

#[cfg(test)]
pub(crate) use download::testing;
