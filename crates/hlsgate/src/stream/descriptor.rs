use crate::{upstream::FormatRecord, util::range::ByteRange, FormatId};

/// Typed view of one adaptive format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamDescriptor {
    pub url: Option<String>,
    pub itag: Option<FormatId>,
    pub mime_type: Option<String>,
    pub codecs: Option<String>,

    pub index_range: Option<ByteRange>,
    pub init_range: Option<ByteRange>,

    pub bitrate: Option<u32>,
    pub fps: Option<u8>,

    pub width: Option<u16>,
    pub height: Option<u16>,

    pub quality_label: Option<String>,

    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u8>,
}

/// How the access signature of a format has to be applied to its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureState {
    Plain(String),
    Encrypted(String),
    None,
}

impl StreamDescriptor {
    /// Converts a raw record. The URL is taken verbatim, without any signature.
    pub fn from_record(record: &FormatRecord) -> Self {
        let (mime_type, codecs) = match record.get("type") {
            Some(r#type) => parse_type(r#type),
            None => (None, None),
        };

        let (width, height) = record
            .get("size")
            .and_then(|size| size.split_once('x'))
            .map(|(width, height)| (width.parse().ok(), height.parse().ok()))
            .unwrap_or_default();

        Self {
            url: record.get("url").cloned(),
            itag: record.get("itag").cloned(),
            mime_type,
            codecs,
            index_range: parse_range(record, "index"),
            init_range: parse_range(record, "init"),
            bitrate: parse_number(record, "bitrate"),
            fps: parse_number(record, "fps"),
            width,
            height,
            quality_label: record.get("quality_label").cloned(),
            audio_sample_rate: parse_number(record, "audio_sample_rate"),
            audio_channels: parse_number(record, "audio_channels"),
        }
    }

    pub fn is_fmp4(&self) -> bool {
        self.mime_type
            .as_deref()
            .is_some_and(|mime_type| mime_type.contains("mp4"))
    }

    pub fn is_audio(&self) -> bool {
        self.audio_channels.is_some()
    }
}

impl SignatureState {
    pub fn from_record(record: &FormatRecord) -> Self {
        if let Some(signature) = record.get("signature") {
            Self::Plain(signature.clone())
        } else if let Some(signature) = record.get("s") {
            Self::Encrypted(signature.clone())
        } else {
            Self::None
        }
    }
}

/// `video/mp4;+codecs="avc1.4d401f"` -> (`video/mp4`, `avc1.4d401f`)
fn parse_type(r#type: &str) -> (Option<String>, Option<String>) {
    match r#type.split_once(";+codecs=") {
        Some((mime_type, codecs)) => {
            let codecs = codecs
                .strip_prefix('"')
                .and_then(|codecs| codecs.strip_suffix('"'))
                .unwrap_or(codecs);
            (Some(mime_type.to_string()), Some(codecs.to_string()))
        }
        None => (Some(r#type.to_string()), None),
    }
}

fn parse_range(record: &FormatRecord, key: &str) -> Option<ByteRange> {
    let value = record.get(key)?;
    match value.parse() {
        Ok(range) => Some(range),
        Err(error) => {
            log::warn!("Ignored {key} of itag {:?}: {error}", record.get("itag"));
            None
        }
    }
}

fn parse_number<T: std::str::FromStr>(record: &FormatRecord, key: &str) -> Option<T> {
    record.get(key).and_then(|value| value.parse().ok())
}
