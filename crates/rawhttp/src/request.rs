use crate::HttpError;
use crate::config::HttpVersion;

/// Portion of a resource requested with a `Range` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// Whole resource, no `Range` header.
    Full,
    /// From `start` to the end of the resource.
    From(u64),
    /// `start..=end`.
    Inclusive { start: u64, end: u64 },
}

impl ByteRange {
    pub fn validate(&self) -> Result<(), HttpError> {
        match *self {
            ByteRange::Inclusive { start, end } if end < start => {
                Err(HttpError::InvalidRange { start, end })
            }
            _ => Ok(()),
        }
    }

    /// Value of the `Range` header, if one is needed.
    pub fn header_value(&self) -> Option<String> {
        match *self {
            ByteRange::Full => None,
            ByteRange::From(start) => Some(format!("bytes={start}-")),
            ByteRange::Inclusive { start, end } => Some(format!("bytes={start}-{end}")),
        }
    }

    /// Number of bytes the range covers when it is bounded.
    pub fn byte_count(&self) -> Option<u64> {
        match *self {
            ByteRange::Inclusive { start, end } => Some(end.saturating_sub(start) + 1),
            _ => None,
        }
    }
}

/// Serializes the request head. Only the request line and an optional `Range`
/// header are sent; no `Host` or other headers.
pub fn build_request(path: &str, version: HttpVersion, range: ByteRange) -> Vec<u8> {
    let mut request = format!("GET {} {}\r\n", path, version.as_str());
    if let Some(value) = range.header_value() {
        request.push_str("Range: ");
        request.push_str(&value);
        request.push_str("\r\n");
    }
    request.push_str("\r\n");
    request.into_bytes()
}
