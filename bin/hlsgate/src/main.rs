mod config;

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use clap::Parser;
use config::Config;
use hlsgate::{
    playlist::PlaylistBuilder,
    server::{HlsServer, DEFAULT_MAX_REQUEST_SIZE},
    signature::SignatureDecryptor,
    stream::{StreamResolver, DEFAULT_CACHE_TTL},
    upstream::{AssetDownloader, HttpAssetDownloader, VideoInfoProvider},
    HttpClient,
};

const DEFAULT_PORT: u16 = 1337;
const COOKIE_URL: &str = "https://www.youtube.com";

/// Serve YouTube videos as HLS playlists.
///
/// Open http://localhost:1337/{video_id}.m3u8 in any HLS player.
#[derive(Parser, Debug)]
#[clap(version, about)]
struct HlsGateArgs {
    /// Address to listen on. Defaults to 127.0.0.1
    #[clap(long, env = "HLSGATE_ADDRESS")]
    address: Option<IpAddr>,

    /// Port to listen on. Defaults to 1337
    #[clap(short, long, env = "HLSGATE_PORT")]
    port: Option<u16>,

    /// Largest request head accepted, in bytes. Defaults to 1000
    #[clap(long, env = "HLSGATE_MAX_REQUEST_SIZE")]
    max_request_size: Option<usize>,

    /// Seconds resolved streams are served from cache. 0 never expires them.
    /// Defaults to 4 hours
    #[clap(long, env = "HLSGATE_CACHE_TTL")]
    cache_ttl: Option<u64>,

    /// Cookies sent to YouTube
    ///
    /// In the `Cookie` header format. eg. "CONSENT=YES+1; PREF=hl=en"
    #[clap(long, env = "HLSGATE_COOKIES")]
    cookies: Option<String>,

    /// TOML config file
    #[clap(short, long, env = "HLSGATE_CONFIG")]
    config: Option<PathBuf>,
}

impl HlsGateArgs {
    fn merge(self, config: Config) -> Settings {
        let ttl = self
            .cache_ttl
            .or(config.cache_ttl)
            .map_or(Some(DEFAULT_CACHE_TTL), |seconds| {
                (seconds > 0).then(|| Duration::from_secs(seconds))
            });

        Settings {
            address: SocketAddr::new(
                self.address
                    .or(config.address)
                    .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
                self.port.or(config.port).unwrap_or(DEFAULT_PORT),
            ),
            max_request_size: self
                .max_request_size
                .or(config.max_request_size)
                .unwrap_or(DEFAULT_MAX_REQUEST_SIZE),
            ttl,
            cookies: self
                .cookies
                .or(config.cookies)
                .map(|cookies| {
                    cookies
                        .split(';')
                        .map(str::trim)
                        .filter(|cookie| !cookie.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

struct Settings {
    address: SocketAddr,
    max_request_size: usize,
    ttl: Option<Duration>,
    cookies: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .try_from_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = HlsGateArgs::parse();
    let config = match &args.config {
        Some(file) => Config::load(file)?,
        None => Config::default(),
    };
    let settings = args.merge(config);

    let client = HttpClient::youtube()?;
    if !settings.cookies.is_empty() {
        client.add_cookies(settings.cookies, COOKIE_URL)?;
    }

    let downloader: Arc<dyn AssetDownloader> = Arc::new(HttpAssetDownloader::new(client.clone()));
    let provider = Arc::new(VideoInfoProvider::new(client));
    let decryptor = Arc::new(SignatureDecryptor::new(downloader.clone()));
    let resolver = StreamResolver::new(provider, decryptor).ttl(settings.ttl);

    let server = HlsServer::new(PlaylistBuilder::new(resolver, downloader))
        .max_request_size(settings.max_request_size)
        .bind(settings.address)
        .await?;
    log::info!(
        "Try http://{}/4Ip1H-a42so.m3u8 in an HLS player",
        server.local_addr()?
    );

    tokio::select! {
        result = server.serve() => result?,
        _ = tokio::signal::ctrl_c() => log::info!("Shutting down"),
    }

    Ok(())
}
