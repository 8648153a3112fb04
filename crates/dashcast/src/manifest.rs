// Movie manifest data model. Parsing the manifest text is left to a ManifestParser.

use std::time::Duration;

use rawhttp::ByteRange;
use serde::{Deserialize, Serialize};

use crate::SessionError;

/// Index of the header segment within every track.
pub const HEADER_SEGMENT: usize = 0;

/// Byte range of one segment inside its track file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub offset: u64,
    pub length: u64,
}

impl Segment {
    pub fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// One past the last byte, or `None` if that does not fit in a `u64`.
    pub fn checked_end(&self) -> Option<u64> {
        self.offset.checked_add(self.length)
    }

    /// Last byte of the segment (inclusive). Saturates at `u64::MAX - 1` for a
    /// segment running past the end of the address space; validation rejects those.
    pub fn end(&self) -> u64 {
        self.checked_end().unwrap_or(u64::MAX).saturating_sub(1)
    }

    pub fn byte_range(&self) -> ByteRange {
        ByteRange::Inclusive {
            start: self.offset,
            end: self.end(),
        }
    }
}

/// One quality rendition of the movie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub filename: String,
    pub content_type: String,
    /// Nominal bitrate in bits per second.
    pub avg_bandwidth: u64,
    pub segment_duration: Duration,
    pub segments: Vec<Segment>,
}

impl Track {
    pub fn header(&self) -> Option<&Segment> {
        self.segments.get(HEADER_SEGMENT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub tracks: Vec<Track>,
}

impl Manifest {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self { tracks }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    /// Track 0, the lowest quality. Its segment list drives the session.
    pub fn baseline(&self) -> Option<&Track> {
        self.tracks.first()
    }

    /// Checks what track selection relies on: ratings in ascending order and an
    /// identical segment layout (count and duration) across tracks.
    pub fn validate(&self) -> Result<(), SessionError> {
        let baseline = self
            .baseline()
            .ok_or_else(|| SessionError::invalid_manifest("manifest has no tracks"))?;

        for (index, track) in self.tracks.iter().enumerate() {
            if track.segments.is_empty() {
                return Err(SessionError::invalid_manifest(format!(
                    "track {index} ({}) has no segments",
                    track.filename
                )));
            }
            if let Some(position) = track.segments.iter().position(|s| s.length == 0) {
                return Err(SessionError::invalid_manifest(format!(
                    "segment {position} of track {index} is empty"
                )));
            }
            if let Some(position) = track.segments.iter().position(|s| s.checked_end().is_none()) {
                return Err(SessionError::invalid_manifest(format!(
                    "segment {position} of track {index} runs past the largest addressable offset"
                )));
            }
            if track.segments.len() != baseline.segments.len() {
                return Err(SessionError::invalid_manifest(format!(
                    "track {index} has {} segments, track 0 has {}",
                    track.segments.len(),
                    baseline.segments.len()
                )));
            }
            if track.segment_duration != baseline.segment_duration {
                return Err(SessionError::invalid_manifest(format!(
                    "track {index} segment duration {:?} differs from track 0 ({:?})",
                    track.segment_duration, baseline.segment_duration
                )));
            }
        }

        if let Some(pair) = self
            .tracks
            .windows(2)
            .position(|pair| pair[1].avg_bandwidth < pair[0].avg_bandwidth)
        {
            return Err(SessionError::invalid_manifest(format!(
                "tracks are not sorted by bandwidth: track {} ({} bps) precedes track {} ({} bps)",
                pair,
                self.tracks[pair].avg_bandwidth,
                pair + 1,
                self.tracks[pair + 1].avg_bandwidth
            )));
        }

        Ok(())
    }
}

/// Turns manifest text into the data model.
pub trait ManifestParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<Manifest, SessionError>;
}

impl<F> ManifestParser for F
where
    F: Fn(&str) -> Result<Manifest, SessionError> + Send + Sync,
{
    fn parse(&self, text: &str) -> Result<Manifest, SessionError> {
        self(text)
    }
}
