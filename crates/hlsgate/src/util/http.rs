use std::{ops::Deref, sync::Arc, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Client, ClientBuilder, IntoUrl,
};
use reqwest_cookie_store::{CookieStore, CookieStoreMutex};

use crate::HlsGateResult;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A shared HTTP client with a persistent cookie jar.
///
/// Cloning is cheap, all clones share the connection pool and cookies.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    cookies_store: Arc<CookieStoreMutex>,
}

impl HttpClient {
    pub fn new(builder: ClientBuilder) -> HlsGateResult<Self> {
        let cookies_store = Arc::new(CookieStoreMutex::new(CookieStore::default()));
        let client = builder.cookie_provider(cookies_store.clone()).build()?;

        Ok(Self {
            client,
            cookies_store,
        })
    }

    /// Client used against YouTube: english pages and a bounded connect time.
    pub fn youtube() -> HlsGateResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));

        Self::new(
            Client::builder()
                .default_headers(headers)
                .connect_timeout(CONNECT_TIMEOUT),
        )
    }

    pub fn add_cookies(&self, cookies: Vec<String>, url: impl IntoUrl) -> HlsGateResult<()> {
        let url = url.into_url()?;
        let mut lock = self
            .cookies_store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for cookie in cookies {
            if let Err(error) = lock.parse(&cookie, &url) {
                log::warn!("Ignored invalid cookie {cookie}: {error}");
            }
        }
        Ok(())
    }
}

impl Deref for HttpClient {
    type Target = Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}
