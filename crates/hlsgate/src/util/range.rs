use std::{ops::Range, str::FromStr};

use crate::HlsGateError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub offset: u64,
    pub length: Option<u64>,
}

impl ByteRange {
    pub fn new(offset: u64, length: Option<u64>) -> Self {
        Self { offset, length }
    }

    pub fn to_http_range(&self) -> String {
        if let Some(length) = self.length {
            let last = self.offset.saturating_add(length.saturating_sub(1));
            format!("bytes={}-{last}", self.offset)
        } else {
            format!("bytes={}-", self.offset)
        }
    }

    /// The covered bytes as a half-open range. Open-ended ranges have no end.
    pub fn as_range(&self) -> Option<Range<u64>> {
        let length = self.length?;
        Some(self.offset..self.offset.checked_add(length)?)
    }
}

/// Parses the inclusive `start-end` notation used by adaptive formats.
///
/// 0-500 means 501 bytes, so length = end - start + 1.
impl FromStr for ByteRange {
    type Err = HlsGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || HlsGateError::InvalidResponse(format!("Invalid byte range: {s}"));

        let (start, end) = s.split_once('-').ok_or_else(invalid)?;
        let first_byte_pos = start.parse::<u64>().map_err(|_| invalid())?;
        let last_byte_pos = match end {
            "" => None,
            end => Some(end.parse::<u64>().map_err(|_| invalid())?),
        };

        let length = match last_byte_pos {
            Some(last_byte_pos) if last_byte_pos < first_byte_pos => return Err(invalid()),
            // the exclusive end has to fit as well
            Some(last_byte_pos) => {
                last_byte_pos.checked_add(1).ok_or_else(invalid)?;
                Some(last_byte_pos - first_byte_pos + 1)
            }
            None => None,
        };

        Ok(Self {
            offset: first_byte_pos,
            length,
        })
    }
}
