use rawhttp::HttpError;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("HTTP error: {source}")]
    Http {
        #[from]
        source: HttpError,
    },

    #[error("configuration error: {reason}")]
    InvalidConfig { reason: String },

    #[error("invalid manifest: {reason}")]
    InvalidManifest { reason: String },

    #[error("manifest is not valid UTF-8: {source}")]
    ManifestDecode {
        #[from]
        source: std::string::FromUtf8Error,
    },

    #[error("manifest parse error: {reason}")]
    ManifestParse { reason: String },

    #[error("failed to fetch segment {segment} of track {track}: {source}")]
    SegmentFetch {
        track: usize,
        segment: usize,
        #[source]
        source: HttpError,
    },

    #[error("segment {segment} of track {track}: expected {expected} bytes, received {received}")]
    UnexpectedLength {
        track: usize,
        segment: usize,
        expected: u64,
        received: u64,
    },

    #[error("playback consumer dropped the queue")]
    ConsumerGone,

    #[error("session cancelled")]
    Cancelled,

    #[error("scheduler task failed: {reason}")]
    TaskFailed { reason: String },
}

impl SessionError {
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn invalid_manifest(reason: impl Into<String>) -> Self {
        Self::InvalidManifest {
            reason: reason.into(),
        }
    }

    pub fn manifest_parse(reason: impl Into<String>) -> Self {
        Self::ManifestParse {
            reason: reason.into(),
        }
    }

    pub fn segment_fetch(track: usize, segment: usize, source: HttpError) -> Self {
        Self::SegmentFetch {
            track,
            segment,
            source,
        }
    }

    /// The underlying HTTP error, if the session failed on the wire.
    pub fn http_error(&self) -> Option<&HttpError> {
        match self {
            Self::Http { source } | Self::SegmentFetch { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Whether the failure came from the network or the server rather than from
    /// configuration, manifest content or the session owner.
    pub fn is_transport_failure(&self) -> bool {
        match self {
            Self::Http { .. } | Self::SegmentFetch { .. } | Self::UnexpectedLength { .. } => true,
            Self::InvalidConfig { .. }
            | Self::InvalidManifest { .. }
            | Self::ManifestDecode { .. }
            | Self::ManifestParse { .. }
            | Self::ConsumerGone
            | Self::Cancelled
            | Self::TaskFailed { .. } => false,
        }
    }
}
