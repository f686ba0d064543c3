mod error;
mod playlist;

pub use error::*;

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Seek, SeekFrom};
use std::ops::Range;

/// One reference in a segment index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub referenced_size: u64,
    /// Duration in timescale units.
    pub subsegment_duration: u64,
}

impl Segment {
    pub fn new(referenced_size: u64, subsegment_duration: u64) -> Self {
        Self {
            referenced_size,
            subsegment_duration,
        }
    }
}

/// A decoded `sidx` box.
///
/// ```text
/// aligned(8) class SegmentIndexBox extends FullBox('sidx', version, 0) {
///     unsigned int(32) reference_ID;
///     unsigned int(32) timescale;
///     if (version == 0) {
///         unsigned int(32) earliest_presentation_time;
///     } else {
///         unsigned int(64) earliest_presentation_time;
///     }
///     unsigned int(32) first_offset;
///     unsigned int(16) reserved = 0;
///     unsigned int(16) reference_count;
///     for (i = 1; i <= reference_count; i++) {
///         unsigned int(32) referenced_size;
///         unsigned int(32) subsegment_duration;
///         unsigned int(32) sap;
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentIndex {
    pub version: u8,
    pub flags: u32,
    pub reference_id: u32,
    pub timescale: u32,
    pub earliest_presentation_time: u64,
    pub first_offset: u32,
    /// Absolute position of the box inside the media resource.
    pub index_range: Range<u64>,
    pub segments: Vec<Segment>,
}

impl SegmentIndex {
    /// Decodes the box from `data`, which must be exactly the bytes covered by `index_range`.
    pub fn parse(data: &[u8], index_range: Range<u64>) -> SidxResult<Self> {
        let expected = index_range.end.saturating_sub(index_range.start);
        if data.len() as u64 != expected {
            return Err(SidxError::NoData {
                expected,
                actual: data.len() as u64,
            });
        }

        let mut sidx = Cursor::new(data);

        // box size, followed by the box type
        sidx.seek(SeekFrom::Current(4))?;
        let mut box_type = [0u8; 4];
        std::io::Read::read_exact(&mut sidx, &mut box_type)?;
        if &box_type != b"sidx" {
            return Err(SidxError::InvalidBoxType(box_type));
        }

        let version = sidx.read_u8()?;
        let flags = sidx.read_u24::<BigEndian>()?;
        let reference_id = sidx.read_u32::<BigEndian>()?;
        let timescale = sidx.read_u32::<BigEndian>()?;
        if timescale == 0 {
            return Err(SidxError::ZeroTimescale);
        }
        let earliest_presentation_time = if version == 0 {
            sidx.read_u32::<BigEndian>()? as u64
        } else {
            sidx.read_u64::<BigEndian>()?
        };
        let first_offset = sidx.read_u32::<BigEndian>()?;

        sidx.seek(SeekFrom::Current(2))?; // reserved

        let reference_count = sidx.read_u16::<BigEndian>()?;
        let mut segments = Vec::with_capacity(reference_count as usize);
        for _ in 0..reference_count {
            let referenced_size = sidx.read_u32::<BigEndian>()? as u64;
            let subsegment_duration = sidx.read_u32::<BigEndian>()? as u64;
            sidx.read_u32::<BigEndian>()?; // SAP information
            segments.push(Segment::new(referenced_size, subsegment_duration));
        }

        // Seeking past the end does not fail, so the final position has to be checked here.
        let consumed = sidx.position();
        if consumed != expected {
            return Err(SidxError::Misaligned { consumed, expected });
        }

        log::debug!(
            "Decoded segment index with {} references, timescale {timescale}",
            segments.len()
        );

        Ok(Self {
            version,
            flags,
            reference_id,
            timescale,
            earliest_presentation_time,
            first_offset,
            index_range,
            segments,
        })
    }

    /// Duration of a segment in seconds.
    pub fn duration_of(&self, segment: &Segment) -> f64 {
        segment.subsegment_duration as f64 / self.timescale as f64
    }
}
