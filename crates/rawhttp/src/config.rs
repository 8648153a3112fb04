use std::time::Duration;

/// HTTP version written on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVersion::Http10 => "HTTP/1.0",
            HttpVersion::Http11 => "HTTP/1.1",
        }
    }
}

/// Configurable options for the raw socket clients
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Version used on the request line.
    /// `None` lets each strategy pick its own: 1.0 for transient, 1.1 for persistent.
    pub version: Option<HttpVersion>,

    /// Connection timeout (time to establish the TCP connection)
    pub connect_timeout: Duration,

    /// Read timeout, applied to every read of the response head and body
    pub read_timeout: Duration,

    /// Write timeout (maximum time for sending the request)
    pub write_timeout: Duration,

    /// Upper bound on the size of the status line plus header block
    pub max_header_bytes: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            version: None,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(10),
            max_header_bytes: 16 * 1024,
        }
    }
}

impl HttpClientConfig {
    pub fn with_version(mut self, version: HttpVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_max_header_bytes(mut self, limit: usize) -> Self {
        self.max_header_bytes = limit;
        self
    }

    pub(crate) fn version_or(&self, fallback: HttpVersion) -> HttpVersion {
        self.version.unwrap_or(fallback)
    }
}
