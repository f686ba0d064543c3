use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use hlsgate::{
    signature::SignatureDecryptor, stream::StreamResolver, upstream::FormatRecord, HlsGateError,
};

use crate::{
    common::{record, StaticDownloader, StaticProvider, PLAYER, VIDEO_ID},
    AssertWrapper,
};

fn formats() -> Vec<FormatRecord> {
    vec![
        record(&[
            ("itag", "137"),
            ("type", r#"video/mp4;+codecs="avc1.640028""#),
            ("url", "https://r1.googlevideo.com/videoplayback?itag=137"),
            ("s", "0123456789"),
        ]),
        record(&[
            ("itag", "140"),
            ("type", r#"audio/mp4;+codecs="mp4a.40.2""#),
            ("url", "https://r1.googlevideo.com/videoplayback?itag=140"),
            ("signature", "PLAIN"),
        ]),
        record(&[
            ("itag", "278"),
            ("type", r#"video/webm;+codecs="vp9""#),
            ("url", "https://r1.googlevideo.com/videoplayback?itag=278"),
        ]),
    ]
}

fn resolver(provider: Arc<StaticProvider>, downloader: Arc<StaticDownloader>) -> StreamResolver {
    StreamResolver::new(provider, Arc::new(SignatureDecryptor::new(downloader)))
}

fn url_of(streams: &[hlsgate::stream::StreamDescriptor], itag: &str) -> String {
    streams
        .iter()
        .find(|stream| stream.itag.as_deref() == Some(itag))
        .and_then(|stream| stream.url.clone())
        .unwrap()
}

#[tokio::test]
async fn test_resolve_signs_urls() {
    let provider = Arc::new(StaticProvider::new(formats()));
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = resolver(provider, downloader);

    let streams = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    assert_eq!(streams.len(), 3);
    assert_eq!(
        url_of(&streams, "137"),
        "https://r1.googlevideo.com/videoplayback?itag=137&sig=06543217"
    );
    assert_eq!(
        url_of(&streams, "140"),
        "https://r1.googlevideo.com/videoplayback?itag=140&signature=PLAIN"
    );
    assert_eq!(
        url_of(&streams, "278"),
        "https://r1.googlevideo.com/videoplayback?itag=278"
    );
}

#[tokio::test]
async fn test_resolve_is_cached() {
    let provider = Arc::new(StaticProvider::new(formats()));
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = resolver(provider.clone(), downloader.clone());

    let first = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    let second = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();

    assert_eq!(provider.calls(), 1);
    // watch page and player, once
    assert_eq!(downloader.calls(), 2);
    assert_eq!(first.len(), second.len());
    assert_eq!(url_of(&first, "137"), url_of(&second, "137"));
}

#[tokio::test]
async fn test_concurrent_resolutions_share_one_fetch() {
    let provider = Arc::new(StaticProvider {
        delay: Duration::from_millis(100),
        ..StaticProvider::new(formats())
    });
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = Arc::new(resolver(provider.clone(), downloader));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(&VIDEO_ID.to_string()).await })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().assert_success().len(), 3);
    }

    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_failure_is_shared_and_not_cached() {
    let provider = Arc::new(StaticProvider {
        delay: Duration::from_millis(100),
        ..StaticProvider::new(formats())
    });
    provider.failures.store(1, Ordering::SeqCst);
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = Arc::new(resolver(provider.clone(), downloader));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(&VIDEO_ID.to_string()).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().assert_error();
    }
    assert_eq!(provider.calls(), 1);

    resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_expired_entries_are_resolved_again() {
    let provider = Arc::new(StaticProvider::new(formats()));
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = resolver(provider.clone(), downloader.clone()).ttl(Some(Duration::ZERO));

    resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();

    assert_eq!(provider.calls(), 2);
    // the decryption program does not expire
    assert_eq!(downloader.calls(), 2);
}

#[tokio::test]
async fn test_unusable_records() {
    let provider = Arc::new(StaticProvider::new(vec![
        record(&[("itag", "18"), ("type", "video/mp4")]),
        record(&[
            ("type", "video/mp4"),
            ("url", "https://r1.googlevideo.com/videoplayback?unknown"),
        ]),
        record(&[
            ("itag", "22"),
            ("url", "https://r1.googlevideo.com/videoplayback?itag=22"),
        ]),
    ]));
    let downloader = Arc::new(StaticDownloader::default());
    let resolver = resolver(provider.clone(), downloader);

    // records without url are dropped
    let streams = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    assert_eq!(streams.len(), 2);

    // records without itag are returned once but never cached
    let cached = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].itag.as_deref(), Some("22"));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_signature_failure_fails_resolution() {
    let provider = Arc::new(StaticProvider::new(formats()));
    let downloader = Arc::new(StaticDownloader::youtube("var broken;"));
    let resolver = resolver(provider.clone(), downloader.clone());

    let result = resolver.resolve(&VIDEO_ID.to_string()).await;
    assert!(matches!(result, Err(HlsGateError::Shared(error)) if matches!(*error, HlsGateError::Extraction(_))));

    // the resolution is retried, the extraction failure is not
    resolver.resolve(&VIDEO_ID.to_string()).await.assert_error();
    assert_eq!(provider.calls(), 2);
    assert_eq!(downloader.calls(), 2);
}

#[tokio::test]
async fn test_videos_are_independent() {
    let provider = Arc::new(StaticProvider::new(vec![record(&[
        ("itag", "22"),
        ("url", "https://r1.googlevideo.com/videoplayback?itag=22"),
    ])]));
    let resolver = resolver(provider.clone(), Arc::new(StaticDownloader::default()));

    resolver.resolve(&"a".to_string()).await.assert_success();
    resolver.resolve(&"b".to_string()).await.assert_success();
    resolver.resolve(&"a".to_string()).await.assert_success();

    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_panicking_resolution_is_not_cached() {
    let provider = Arc::new(StaticProvider::new(formats()));
    provider.panics.store(1, Ordering::SeqCst);
    let downloader = Arc::new(StaticDownloader::youtube(PLAYER));
    let resolver = resolver(provider.clone(), downloader);

    let result = resolver.resolve(&VIDEO_ID.to_string()).await;
    assert!(matches!(result, Err(HlsGateError::Shared(error)) if matches!(*error, HlsGateError::ResolutionPanicked(_))));

    let streams = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
    assert_eq!(streams.len(), 3);
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn test_overflowing_index_range_is_ignored() {
    let provider = Arc::new(StaticProvider::new(vec![record(&[
        ("itag", "137"),
        ("type", "video/mp4"),
        ("index", "0-18446744073709551615"),
        ("url", "https://r1.googlevideo.com/videoplayback?itag=137"),
    ])]));
    let resolver = resolver(provider.clone(), Arc::new(StaticDownloader::default()));

    for _ in 0..2 {
        let streams = resolver.resolve(&VIDEO_ID.to_string()).await.assert_success();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].index_range, None);
    }
    assert_eq!(provider.calls(), 1);
}
