use std::collections::HashMap;

use async_trait::async_trait;

use super::{FormatRecord, MetadataProvider};
use crate::{util::http::HttpClient, HlsGateError, HlsGateResult, VideoId};

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Reads adaptive formats from the `get_video_info` endpoint.
pub struct VideoInfoProvider {
    client: HttpClient,
    base_url: String,
}

impl VideoInfoProvider {
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: HttpClient, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn video_info_url(&self, video_id: &str) -> String {
        format!(
            "{}/get_video_info?video_id={video_id}&asv=3&el=detailpage&ps=default&hl=en_US",
            self.base_url
        )
    }
}

/// Decodes `key=value&key=value` pairs.
///
/// Values are percent-decoded but `+` is kept as is, the `type` field relies on it.
/// Pairs that do not split into exactly a key and a value are skipped.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let parts: Vec<&str> = pair.split('=').collect();
        match parts.as_slice() {
            [key, value] => match urlencoding::decode(value) {
                Ok(value) => {
                    result.insert(key.to_string(), value.into_owned());
                }
                Err(_) => log::warn!("Failed to decode URL parameter: {pair}"),
            },
            _ => log::warn!("Failed to parse URL parameter: {pair}"),
        }
    }
    result
}

#[async_trait]
impl MetadataProvider for VideoInfoProvider {
    async fn fetch_formats(&self, video_id: &VideoId) -> HlsGateResult<Vec<FormatRecord>> {
        log::info!("Fetching video info for {video_id}");

        let response = self.client.get(self.video_info_url(video_id)).send().await?;
        if !response.status().is_success() {
            return Err(HlsGateError::HttpError(response.status()));
        }
        let body = response.text().await?;
        if body.is_empty() {
            return Err(HlsGateError::InvalidResponse(
                "Empty video info response".to_string(),
            ));
        }

        let info = parse_query(&body);
        if info.get("errorcode").map(String::as_str) == Some("2") {
            return Err(HlsGateError::InvalidRequest(video_id.to_string()));
        }

        let adaptive_formats = info.get("adaptive_fmts").ok_or_else(|| {
            HlsGateError::InvalidResponse(format!("No adaptive formats for {video_id}"))
        })?;

        let formats: Vec<FormatRecord> = adaptive_formats.split(',').map(parse_query).collect();
        log::debug!("Video {video_id} has {} adaptive formats", formats.len());

        Ok(formats)
    }
}
