use std::fmt::Write;

use crate::SegmentIndex;

const DEFAULT_TARGET_DURATION: u64 = 5;

impl SegmentIndex {
    /// Longest segment duration rounded up to whole seconds.
    pub fn target_duration(&self) -> u64 {
        self.segments
            .iter()
            .map(|segment| self.duration_of(segment))
            .reduce(f64::max)
            .map(|max| max.ceil() as u64)
            .unwrap_or(DEFAULT_TARGET_DURATION)
    }

    /// Renders a VOD media playlist addressing every segment as a byte range of `path`.
    ///
    /// The initialization map covers everything up to the end of the index box,
    /// and the first segment starts right after it.
    pub fn to_m3u8(&self, path: &str) -> String {
        // absolute file offset: the map spans from byte 0 through the index box
        let mut offset = self.index_range.end;

        let mut m3u8 = String::new();
        m3u8.push_str("#EXTM3U\n");
        _ = writeln!(m3u8, "#EXT-X-TARGETDURATION:{}", self.target_duration());
        m3u8.push_str("#EXT-X-VERSION:7\n");
        m3u8.push_str("#EXT-X-MEDIA-SEQUENCE:0\n");
        m3u8.push_str("#EXT-X-PLAYLIST-TYPE:VOD\n");
        m3u8.push_str("#EXT-X-INDEPENDENT-SEGMENTS\n");
        _ = writeln!(m3u8, "#EXT-X-MAP:URI=\"{path}\",BYTERANGE=\"{offset}@0\"");

        for segment in self.segments.iter() {
            _ = writeln!(m3u8, "#EXTINF:{:.5},", self.duration_of(segment));
            _ = writeln!(
                m3u8,
                "#EXT-X-BYTERANGE:{}@{offset}",
                segment.referenced_size
            );
            _ = writeln!(m3u8, "{path}");

            offset = offset.saturating_add(segment.referenced_size);
        }

        m3u8.push_str("#EXT-X-ENDLIST");
        m3u8
    }
}
