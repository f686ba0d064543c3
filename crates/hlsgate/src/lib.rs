//! HLS playlists for YouTube adaptive formats.
//!
//! ```text
//!  GET /{video}.m3u8          ┌──────────────┐   formats   ┌──────────────────┐
//! ───────────────────────────►│              ├────────────►│ MetadataProvider │
//!  GET /{video}/{itag}.m3u8   │  HlsServer   │             └──────────────────┘
//! ───────────────────────────►│      │       │  encrypted  ┌──────────────────┐
//!                             │ Playlist     ├────────────►│SignatureDecryptor│
//!                             │ Builder      │             └──────────────────┘
//!                             │      │       │  sidx range ┌──────────────────┐
//!                             │StreamResolver├────────────►│  AssetDownloader │
//!                             └──────────────┘             └──────────────────┘
//! ```

pub mod error;
pub mod playlist;
pub mod server;
pub mod signature;
pub mod stream;
pub mod upstream;
pub mod util;

pub use error::*;
pub use util::http::HttpClient;

/// Opaque identifier of a video.
pub type VideoId = String;
/// Identifier of one encoding of a video, the `itag`.
pub type FormatId = String;
