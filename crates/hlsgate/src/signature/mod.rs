//! Signature decryption for streams whose URL carries an encrypted `s` parameter.
//!
//! The routine is extracted once per video from the player script and cached
//! as program text. Concurrent requests for the same video wait on the same
//! extraction instead of starting their own.

mod extract;
mod runtime;

pub use extract::{extract_program, ExtractError};
pub use runtime::run_program;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::OnceCell;

use crate::{upstream::AssetDownloader, HlsGateError, HlsGateResult, VideoId};

/// Name the extracted routine is exported under.
pub const DECRYPT_FUNCTION_NAME: &str = "decryptSignature";

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

type ProgramOutcome = Result<Arc<str>, ExtractError>;
type ProgramCell = Arc<OnceCell<ProgramOutcome>>;

pub struct SignatureDecryptor {
    downloader: Arc<dyn AssetDownloader>,
    base_url: String,
    programs: Mutex<HashMap<VideoId, ProgramCell>>,
}

impl SignatureDecryptor {
    pub fn new(downloader: Arc<dyn AssetDownloader>) -> Self {
        Self::with_base_url(downloader, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(downloader: Arc<dyn AssetDownloader>, base_url: impl Into<String>) -> Self {
        Self {
            downloader,
            base_url: base_url.into(),
            programs: Mutex::new(HashMap::new()),
        }
    }

    /// Decrypts `signature` with the routine of the player serving `video_id`.
    pub async fn decrypt(&self, signature: &str, video_id: &VideoId) -> HlsGateResult<String> {
        let program = self.program(video_id).await?;

        let signature = signature.to_string();
        tokio::task::spawn_blocking(move || run_program(&program, &signature))
            .await
            .map_err(|error| HlsGateError::DecryptionFailed(error.to_string()))?
    }

    /// Returns the cached program of a video, extracting it on first use.
    ///
    /// Extraction failures stay cached. Download failures are shared with the
    /// requests already waiting, and retried by the next one.
    pub async fn program(&self, video_id: &VideoId) -> Result<Arc<str>, ExtractError> {
        let cell = self.cell(video_id);

        // TODO: no deadline applies here, a player download that never finishes
        // keeps every waiter of this video pending. Bound it once requests carry a timeout.
        cell.get_or_init(|| self.extract(video_id)).await.clone()
    }

    fn cell(&self, video_id: &VideoId) -> ProgramCell {
        let mut programs = self
            .programs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        match programs.get(video_id) {
            Some(cell) if !matches!(cell.get(), Some(Err(error)) if error.is_transient()) => {
                cell.clone()
            }
            _ => {
                let cell = ProgramCell::default();
                programs.insert(video_id.clone(), cell.clone());
                cell
            }
        }
    }

    async fn extract(&self, video_id: &VideoId) -> ProgramOutcome {
        log::info!("Extracting signature program for {video_id}");

        let watch_url = format!(
            "{}/watch?v={video_id}&gl=US&hl=en&has_verified=1&bpctr=9999999999",
            self.base_url
        );
        let page = self
            .downloader
            .download_text(&watch_url)
            .await
            .map_err(|error| ExtractError::Upstream(error.to_string()))?;

        let player_path = extract::extract_player_path(&page)?;
        let player_url = format!("{}{player_path}", self.base_url);
        log::debug!("Player script of {video_id}: {player_url}");

        let player = self
            .downloader
            .download_text(&player_url)
            .await
            .map_err(|error| ExtractError::Upstream(error.to_string()))?;

        match extract_program(&player) {
            Ok(program) => Ok(Arc::from(program)),
            Err(error) => {
                log::warn!("Signature program extraction for {video_id} failed: {error}");
                Err(error)
            }
        }
    }
}
