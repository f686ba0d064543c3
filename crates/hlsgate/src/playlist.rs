use std::{cmp::Reverse, fmt::Write, sync::Arc};

use hlsgate_sidx::SegmentIndex;

use crate::{
    stream::{StreamDescriptor, StreamResolver},
    upstream::AssetDownloader,
    FormatId, HlsGateError, HlsGateResult, VideoId,
};

const PLAYLIST_SUFFIX: &str = ".m3u8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistRequest {
    /// `/{video_id}.m3u8`
    Master { video_id: VideoId },
    /// `/{video_id}/{itag}.m3u8`
    Media { video_id: VideoId, itag: FormatId },
}

impl PlaylistRequest {
    /// Routes a request path. `None` means the path addresses no playlist.
    pub fn from_path(path: &str) -> Option<Self> {
        let parts: Vec<&str> = path.split('/').collect();
        match parts.as_slice() {
            [_, playlist] => {
                let video_id = non_empty(playlist.strip_suffix(PLAYLIST_SUFFIX)?)?;
                Some(Self::Master { video_id })
            }
            [_, video_id, playlist] => {
                let itag = non_empty(playlist.strip_suffix(PLAYLIST_SUFFIX)?)?;
                let video_id = non_empty(video_id)?;
                Some(Self::Media { video_id, itag })
            }
            _ => None,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

pub struct PlaylistBuilder {
    resolver: StreamResolver,
    downloader: Arc<dyn AssetDownloader>,
}

impl PlaylistBuilder {
    pub fn new(resolver: StreamResolver, downloader: Arc<dyn AssetDownloader>) -> Self {
        Self {
            resolver,
            downloader,
        }
    }

    pub async fn build(&self, request: &PlaylistRequest) -> HlsGateResult<String> {
        match request {
            PlaylistRequest::Master { video_id } => self.master_playlist(video_id).await,
            PlaylistRequest::Media { video_id, itag } => self.media_playlist(video_id, itag).await,
        }
    }

    /// Lists every fMP4 stream of a video. Audio streams become renditions of
    /// the `aac` group, video streams become variants referring to it.
    pub async fn master_playlist(&self, video_id: &VideoId) -> HlsGateResult<String> {
        let mut streams: Vec<StreamDescriptor> = self
            .resolver
            .resolve(video_id)
            .await?
            .into_iter()
            // HLS only supports fMP4, so webm streams are dropped
            .filter(StreamDescriptor::is_fmp4)
            .collect();
        streams.sort_by_key(|stream| (!stream.is_audio(), Reverse(stream.bitrate)));

        let mut m3u8 = String::from("#EXTM3U\n#EXT-X-VERSION:4\n\n");
        let mut entries = Vec::with_capacity(streams.len());
        for stream in streams.iter() {
            let Some(itag) = &stream.itag else {
                log::debug!("Skipped a stream of {video_id} without itag");
                continue;
            };
            let uri = format!("{video_id}/{itag}{PLAYLIST_SUFFIX}");

            let mut entry = String::new();
            if stream.is_audio() {
                _ = write!(
                    entry,
                    r#"#EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID="aac",LANGUAGE="en",NAME="English",DEFAULT=YES,AUTOSELECT=YES,URI="{uri}""#
                );
            } else {
                _ = write!(
                    entry,
                    "#EXT-X-STREAM-INF:BANDWIDTH={},CODECS=\"{}\",RESOLUTION={}x{},AUDIO=\"aac\"\n{uri}",
                    stream.bitrate.unwrap_or_default(),
                    stream.codecs.as_deref().unwrap_or_default(),
                    stream.width.unwrap_or_default(),
                    stream.height.unwrap_or_default(),
                );
            }
            entries.push(entry);
        }

        m3u8.push_str(&entries.join("\n"));
        Ok(m3u8)
    }

    /// Renders the segments of one stream as byte ranges of its URL.
    pub async fn media_playlist(&self, video_id: &VideoId, itag: &FormatId) -> HlsGateResult<String> {
        let matches: Vec<StreamDescriptor> = self
            .resolver
            .resolve(video_id)
            .await?
            .into_iter()
            .filter(|stream| stream.itag.as_ref() == Some(itag))
            .collect();

        let [stream] = matches.as_slice() else {
            return Err(HlsGateError::FormatNotFound {
                itag: itag.clone(),
                found: matches.len(),
            });
        };

        let url = stream
            .url
            .as_deref()
            .ok_or_else(|| HlsGateError::InvalidResponse(format!("Stream {itag} has no url")))?;
        let index = stream
            .index_range
            .ok_or_else(|| HlsGateError::MissingSegmentIndex(itag.clone()))?;
        let index_range = index
            .as_range()
            .ok_or_else(|| HlsGateError::MissingSegmentIndex(itag.clone()))?;

        let data = self.downloader.download_range(url, index).await?;
        let sidx = SegmentIndex::parse(&data, index_range)?;
        log::info!(
            "Stream {itag} of {video_id} has {} segments",
            sidx.segments.len()
        );

        Ok(sidx.to_m3u8(url))
    }
}
