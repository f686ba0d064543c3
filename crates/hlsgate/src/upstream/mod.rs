//! Collaborators talking to YouTube.
//!
//! Everything above this module only sees the two traits, so tests and
//! alternative backends can swap the network out.

mod downloader;
mod video_info;

pub use downloader::HttpAssetDownloader;
pub use video_info::{parse_query, VideoInfoProvider};

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;

use crate::{util::range::ByteRange, HlsGateResult, VideoId};

/// One adaptive format as reported upstream, e.g. `itag`, `type`, `index`, `url`, `s`.
pub type FormatRecord = HashMap<String, String>;

#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetches the adaptive formats of a video, one record per format.
    async fn fetch_formats(&self, video_id: &VideoId) -> HlsGateResult<Vec<FormatRecord>>;
}

#[async_trait]
pub trait AssetDownloader: Send + Sync {
    /// Downloads a whole document and decodes it as UTF-8.
    async fn download_text(&self, url: &str) -> HlsGateResult<String>;

    /// Downloads exactly the bytes covered by `range`.
    async fn download_range(&self, url: &str, range: ByteRange) -> HlsGateResult<Bytes>;
}
