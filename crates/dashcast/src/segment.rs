use bytes::Bytes;

/// One item of the playback queue.
///
/// An empty payload is the end-of-stream marker and must not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentContent {
    pub content_type: String,
    pub payload: Bytes,
}

impl SegmentContent {
    pub fn new(content_type: impl Into<String>, payload: Bytes) -> Self {
        Self {
            content_type: content_type.into(),
            payload,
        }
    }

    pub fn end_of_stream(content_type: impl Into<String>) -> Self {
        Self::new(content_type, Bytes::new())
    }

    pub fn is_end_of_stream(&self) -> bool {
        self.payload.is_empty()
    }
}
