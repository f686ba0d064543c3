use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::RANGE, Response};

use super::AssetDownloader;
use crate::{util::http::HttpClient, util::range::ByteRange, HlsGateError, HlsGateResult};

pub struct HttpAssetDownloader {
    client: HttpClient,
}

impl HttpAssetDownloader {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

async fn ensure_success(response: Response) -> HlsGateResult<Response> {
    if !response.status().is_success() {
        let status = response.status();
        if let Ok(body) = response.text().await {
            log::warn!("Error body: {body}");
        }
        return Err(HlsGateError::HttpError(status));
    }

    Ok(response)
}

#[async_trait]
impl AssetDownloader for HttpAssetDownloader {
    async fn download_text(&self, url: &str) -> HlsGateResult<String> {
        log::debug!("Downloading {url}");
        let response = ensure_success(self.client.get(url).send().await?).await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(HlsGateError::InvalidResponse(format!("Empty body from {url}")));
        }

        String::from_utf8(bytes.to_vec())
            .map_err(|_| HlsGateError::InvalidResponse(format!("Non UTF-8 body from {url}")))
    }

    async fn download_range(&self, url: &str, range: ByteRange) -> HlsGateResult<Bytes> {
        let header = range.to_http_range();
        log::debug!("Downloading {url} with range {header}");

        let response = self.client.get(url).header(RANGE, header).send().await?;
        let response = ensure_success(response).await?;

        Ok(response.bytes().await?)
    }
}
