use std::collections::HashMap;

const HEADER_DELIMITER: &str = "\r\n\r\n";

/// A request head. Bodies are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub version: String,
    pub headers: HashMap<String, String>,
}

impl HttpRequest {
    /// Parses the head of a request. `None` if the request line is not
    /// `METHOD PATH VERSION`.
    pub fn parse(raw: &str) -> Option<Self> {
        let head = match raw.split_once(HEADER_DELIMITER) {
            Some((head, _body)) => head,
            None => raw,
        };
        let mut lines = head.split("\r\n");

        let request_line: Vec<&str> = lines.next()?.split(' ').collect();
        let [method, path, version] = request_line.as_slice() else {
            return None;
        };

        let headers = lines
            .filter_map(|line| {
                let parts: Vec<&str> = line.split(": ").collect();
                match parts.as_slice() {
                    [key, value] => Some((key.to_string(), value.to_string())),
                    _ => None,
                }
            })
            .collect();

        Some(Self {
            method: method.to_string(),
            path: path.to_string(),
            version: version.to_string(),
            headers,
        })
    }

    /// Whether `raw` holds a complete request head.
    pub(crate) fn is_complete(raw: &[u8]) -> bool {
        raw.windows(HEADER_DELIMITER.len())
            .any(|window| window == HEADER_DELIMITER.as_bytes())
    }
}
