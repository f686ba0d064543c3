use reqwest::StatusCode;

pub const CONTENT_TYPE_HTML: &str = "text/html";
pub const CONTENT_TYPE_M3U8: &str = "application/vnd.apple.mpegurl";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
}

impl HttpResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            content_type: CONTENT_TYPE_HTML,
            body: String::new(),
        }
    }

    pub fn playlist(body: String) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: CONTENT_TYPE_M3U8,
            body,
        }
    }

    pub fn bad_request() -> Self {
        Self::empty(StatusCode::BAD_REQUEST)
    }

    pub fn not_found() -> Self {
        Self::empty(StatusCode::NOT_FOUND)
    }

    pub fn internal_error() -> Self {
        Self::empty(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Serializes the response. Every connection serves exactly one request.
    pub fn to_bytes(&self) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nConnection: close\r\nContent-Type: {}\r\nContent-Length: {}\r\n\r\n{}",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or_default(),
            self.content_type,
            self.body.len(),
            self.body
        )
        .into_bytes()
    }
}
