use std::{
    any::Any,
    collections::HashMap,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};

use super::{SignatureState, StreamDescriptor};
use crate::{
    signature::SignatureDecryptor,
    upstream::{FormatRecord, MetadataProvider},
    FormatId, HlsGateError, HlsGateResult, VideoId,
};

/// Stream URLs carry signed parameters which expire after about six hours.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(4 * 60 * 60);

type Resolution = Result<Arc<Vec<StreamDescriptor>>, Arc<HlsGateError>>;
type PendingResolution = Shared<BoxFuture<'static, Resolution>>;

enum CacheSlot {
    Resolved {
        streams: HashMap<FormatId, StreamDescriptor>,
        resolved_at: Instant,
    },
    /// Shared by every request arriving while the video resolves. There is no
    /// deadline on it yet, a stalled upstream call stalls all of them.
    Pending(PendingResolution),
}

type StreamCache = Arc<Mutex<HashMap<VideoId, CacheSlot>>>;

/// Resolves and caches the stream descriptors of videos.
pub struct StreamResolver {
    provider: Arc<dyn MetadataProvider>,
    decryptor: Arc<SignatureDecryptor>,
    ttl: Option<Duration>,
    cache: StreamCache,
}

impl StreamResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>, decryptor: Arc<SignatureDecryptor>) -> Self {
        Self {
            provider,
            decryptor,
            ttl: Some(DEFAULT_CACHE_TTL),
            cache: Default::default(),
        }
    }

    /// How long resolved streams are served from cache. `None` keeps them forever.
    pub fn ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Returns every deliverable stream of a video.
    pub async fn resolve(&self, video_id: &VideoId) -> HlsGateResult<Vec<StreamDescriptor>> {
        let pending = {
            let mut cache = lock(&self.cache);
            match cache.get(video_id) {
                Some(CacheSlot::Resolved {
                    streams,
                    resolved_at,
                }) if self.is_fresh(*resolved_at) => {
                    log::debug!("Serving {} cached streams of {video_id}", streams.len());
                    return Ok(streams.values().cloned().collect());
                }
                Some(CacheSlot::Pending(pending)) => pending.clone(),
                _ => {
                    let pending = self.start_resolution(video_id);
                    cache.insert(video_id.clone(), CacheSlot::Pending(pending.clone()));
                    pending
                }
            }
        };

        let streams = pending.await?;
        Ok(streams.as_ref().clone())
    }

    fn is_fresh(&self, resolved_at: Instant) -> bool {
        self.ttl.map_or(true, |ttl| resolved_at.elapsed() < ttl)
    }

    fn start_resolution(&self, video_id: &VideoId) -> PendingResolution {
        let provider = self.provider.clone();
        let decryptor = self.decryptor.clone();
        let cache = self.cache.clone();
        let video_id = video_id.clone();

        async move {
            // a panic has to settle the slot too, a poisoned shared future never resolves
            let result = AssertUnwindSafe(fetch_streams(provider.as_ref(), &decryptor, &video_id))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(HlsGateError::ResolutionPanicked(panic_message(&*panic)))
                });
            settle(&cache, video_id, &result);
            result.map(Arc::new).map_err(Arc::new)
        }
        .boxed()
        .shared()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn lock(cache: &StreamCache) -> std::sync::MutexGuard<'_, HashMap<VideoId, CacheSlot>> {
    cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Replaces the pending slot with the outcome. Failures are not cached.
fn settle(cache: &StreamCache, video_id: VideoId, result: &HlsGateResult<Vec<StreamDescriptor>>) {
    let mut cache = lock(cache);
    match result {
        Ok(streams) => {
            let streams = streams
                .iter()
                .filter_map(|stream| Some((stream.itag.clone()?, stream.clone())))
                .collect();
            cache.insert(
                video_id,
                CacheSlot::Resolved {
                    streams,
                    resolved_at: Instant::now(),
                },
            );
        }
        Err(error) => {
            log::warn!("Failed to resolve streams of {video_id}: {error}");
            cache.remove(&video_id);
        }
    }
}

async fn fetch_streams(
    provider: &dyn MetadataProvider,
    decryptor: &SignatureDecryptor,
    video_id: &VideoId,
) -> HlsGateResult<Vec<StreamDescriptor>> {
    let records = provider.fetch_formats(video_id).await?;

    let streams = futures::future::try_join_all(
        records
            .iter()
            .map(|record| resolve_stream(record, decryptor, video_id)),
    )
    .await?;

    let streams: Vec<StreamDescriptor> = streams.into_iter().flatten().collect();
    log::info!("Resolved {} streams of {video_id}", streams.len());
    Ok(streams)
}

/// Builds the descriptor of one format and signs its URL.
async fn resolve_stream(
    record: &FormatRecord,
    decryptor: &SignatureDecryptor,
    video_id: &VideoId,
) -> HlsGateResult<Option<StreamDescriptor>> {
    let mut descriptor = StreamDescriptor::from_record(record);
    let Some(url) = descriptor.url.take() else {
        log::warn!("Dropped itag {:?} of {video_id}: no url", descriptor.itag);
        return Ok(None);
    };

    let url = match SignatureState::from_record(record) {
        SignatureState::Plain(signature) => format!("{url}&signature={signature}"),
        SignatureState::Encrypted(signature) => {
            let signature = decryptor.decrypt(&signature, video_id).await?;
            format!("{url}&sig={signature}")
        }
        SignatureState::None => url,
    };

    descriptor.url = Some(url);
    Ok(Some(descriptor))
}
