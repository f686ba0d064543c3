//! A deliberately small HTTP/1.1 front: one `GET` per connection, no bodies,
//! no keep-alive.

mod request;
mod response;

pub use request::HttpRequest;
pub use response::*;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream, ToSocketAddrs},
};

use crate::{
    playlist::{PlaylistBuilder, PlaylistRequest},
    HlsGateResult,
};

/// Bytes required before a request is parsed at all.
pub const MIN_REQUEST_SIZE: usize = 10;
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 1000;
/// How long a client may take to send its request head.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(2);

pub struct HlsServer {
    playlists: PlaylistBuilder,
    max_request_size: usize,
    read_timeout: Duration,
}

impl HlsServer {
    pub fn new(playlists: PlaylistBuilder) -> Self {
        Self {
            playlists,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    pub fn max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size.max(MIN_REQUEST_SIZE);
        self
    }

    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub async fn bind(self, addr: impl ToSocketAddrs) -> HlsGateResult<BoundServer> {
        let listener = TcpListener::bind(addr).await?;
        Ok(BoundServer {
            server: Arc::new(self),
            listener,
        })
    }

    /// Answers one raw request.
    pub async fn respond(&self, raw: &str) -> HttpResponse {
        let Some(request) = HttpRequest::parse(raw) else {
            log::debug!("Rejected malformed request line");
            return HttpResponse::bad_request();
        };
        let Some(route) = PlaylistRequest::from_path(&request.path) else {
            log::debug!("No playlist at {}", request.path);
            return HttpResponse::not_found();
        };

        match self.playlists.build(&route).await {
            Ok(playlist) => HttpResponse::playlist(playlist),
            Err(error) => {
                log::error!("Failed to serve {}: {error}", request.path);
                HttpResponse::internal_error()
            }
        }
    }

    async fn handle_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let raw = match self.read_request(&mut stream).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("{peer} closed the connection before sending a request");
                return;
            }
            Err(error) => {
                log::warn!("Failed to read request from {peer}: {error}");
                return;
            }
        };
        let raw = match String::from_utf8(raw) {
            Ok(raw) => raw,
            Err(_) => {
                log::warn!("Dropped non-UTF-8 request from {peer}");
                return;
            }
        };

        let response = self.respond(&raw).await;
        log::info!(
            "{peer} {} -> {}",
            raw.lines().next().unwrap_or_default(),
            response.status
        );

        if let Err(error) = stream.write_all(&response.to_bytes()).await {
            log::warn!("Failed to write response to {peer}: {error}");
            return;
        }
        _ = stream.shutdown().await;
    }

    /// Reads until the head is complete, the size limit is hit, the peer
    /// stops sending or the read timeout passes. Whatever arrived by then is
    /// the request, fewer than [`MIN_REQUEST_SIZE`] bytes is none.
    async fn read_request(&self, stream: &mut TcpStream) -> std::io::Result<Option<Vec<u8>>> {
        let mut raw = Vec::with_capacity(self.max_request_size);
        let read = tokio::time::timeout(self.read_timeout, self.read_head(stream, &mut raw)).await;
        match read {
            Ok(result) => result?,
            Err(_) => log::debug!("Request head incomplete after {:?}", self.read_timeout),
        }

        Ok((raw.len() >= MIN_REQUEST_SIZE).then_some(raw))
    }

    async fn read_head(&self, stream: &mut TcpStream, raw: &mut Vec<u8>) -> std::io::Result<()> {
        let mut buf = [0u8; 512];

        while raw.len() < self.max_request_size {
            let limit = buf.len().min(self.max_request_size - raw.len());
            let read = stream.read(&mut buf[..limit]).await?;
            if read == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..read]);

            if raw.len() >= MIN_REQUEST_SIZE && HttpRequest::is_complete(raw) {
                break;
            }
        }

        Ok(())
    }
}

pub struct BoundServer {
    server: Arc<HlsServer>,
    listener: TcpListener,
}

impl BoundServer {
    pub fn local_addr(&self) -> HlsGateResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections forever, each served on its own task.
    pub async fn serve(self) -> HlsGateResult<()> {
        log::info!("Listening on {}", self.listener.local_addr()?);

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(error) => {
                    log::warn!("Failed to accept connection: {error}");
                    continue;
                }
            };

            let server = self.server.clone();
            tokio::spawn(async move {
                server.handle_connection(stream, peer).await;
            });
        }
    }
}
