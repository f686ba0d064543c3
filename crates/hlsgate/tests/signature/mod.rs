use std::sync::Arc;

use hlsgate::{
    signature::{ExtractError, SignatureDecryptor},
    upstream::{AssetDownloader, HttpAssetDownloader},
    HlsGateError, HttpClient,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{
    common::{mock_text, watch_page, PLAYER, PLAYER_PATH, VIDEO_ID},
    AssertWrapper,
};

fn decryptor(server: &MockServer) -> anyhow::Result<SignatureDecryptor> {
    let downloader: Arc<dyn AssetDownloader> =
        Arc::new(HttpAssetDownloader::new(HttpClient::youtube()?));
    Ok(SignatureDecryptor::with_base_url(downloader, server.uri()))
}

#[tokio::test]
async fn test_concurrent_decrypts_extract_once() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", watch_page(), 1).await;
    mock_text(&server, PLAYER_PATH, PLAYER, 1).await;

    let decryptor = Arc::new(decryptor(&server)?);
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let decryptor = decryptor.clone();
            tokio::spawn(async move {
                decryptor
                    .decrypt("0123456789", &VIDEO_ID.to_string())
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert_eq!(task.await?.assert_success(), "06543217");
    }

    // served from the cached program
    let signature = decryptor.decrypt("abcdefghij", &VIDEO_ID.to_string()).await?;
    assert_eq!(signature, "agfedcbh");

    Ok(())
}

#[tokio::test]
async fn test_extraction_failure_is_cached() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", watch_page(), 1).await;
    mock_text(&server, PLAYER_PATH, "var nothing = 'to see here';", 1).await;

    let decryptor = decryptor(&server)?;
    for _ in 0..3 {
        let result = decryptor.decrypt("0123456789", &VIDEO_ID.to_string()).await;
        assert!(matches!(
            result,
            Err(HlsGateError::Extraction(ExtractError::DecryptionFunctionNotFound))
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_player_is_cached() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", "<html>no player here</html>", 1).await;

    let decryptor = decryptor(&server)?;
    for _ in 0..2 {
        let result = decryptor.program(&VIDEO_ID.to_string()).await;
        assert_eq!(result, Err(ExtractError::PlayerNotFound));
    }

    Ok(())
}

#[tokio::test]
async fn test_download_failure_is_retried() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/watch"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;

    let decryptor = decryptor(&server)?;
    let first = decryptor.program(&VIDEO_ID.to_string()).await;
    assert!(matches!(first, Err(ExtractError::Upstream(_))));

    mock_text(&server, "/watch", watch_page(), 1).await;
    mock_text(&server, PLAYER_PATH, PLAYER, 1).await;

    let signature = decryptor.decrypt("0123456789", &VIDEO_ID.to_string()).await?;
    assert_eq!(signature, "06543217");

    Ok(())
}

#[tokio::test]
async fn test_programs_are_per_video() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", watch_page(), 2).await;
    mock_text(&server, PLAYER_PATH, PLAYER, 2).await;

    let decryptor = decryptor(&server)?;
    decryptor.program(&"first".to_string()).await.assert_success();
    decryptor.program(&"second".to_string()).await.assert_success();
    decryptor.program(&"first".to_string()).await.assert_success();

    Ok(())
}

#[tokio::test]
async fn test_concurrent_decrypts_share_extraction_failure() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", watch_page(), 1).await;
    mock_text(&server, PLAYER_PATH, "var nothing = 'to see here';", 1).await;

    let decryptor = Arc::new(decryptor(&server)?);
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let decryptor = decryptor.clone();
            tokio::spawn(async move {
                decryptor
                    .decrypt("0123456789", &VIDEO_ID.to_string())
                    .await
            })
        })
        .collect();

    for task in tasks {
        assert!(matches!(
            task.await?,
            Err(HlsGateError::Extraction(ExtractError::DecryptionFunctionNotFound))
        ));
    }

    Ok(())
}

#[tokio::test]
async fn test_missing_helper_object_is_cached() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mock_text(&server, "/watch", watch_page(), 1).await;
    // the function still calls `Xy`, but nothing declares it
    mock_text(&server, PLAYER_PATH, PLAYER.replace("var Xy=", "var Ab="), 1).await;

    let decryptor = decryptor(&server)?;
    for _ in 0..3 {
        let result = decryptor.program(&VIDEO_ID.to_string()).await;
        assert_eq!(
            result,
            Err(ExtractError::HelperObjectNotParsable("Xy".to_string()))
        );
    }

    Ok(())
}
