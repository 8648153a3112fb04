use rawhttp::HttpClientConfig;
use url::Url;

use crate::SessionError;

pub const MANIFEST_FILENAME: &str = "manifest.txt";

/// Which socket strategy the session drives its downloads through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionMode {
    /// One connection to the media server, kept for the whole session (HTTP/1.1).
    #[default]
    Persistent,
    /// A new connection for every request (HTTP/1.0).
    Transient,
}

/// Configurable options for a playback session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Media server base URL, e.g. `http://localhost:9999`
    pub base_url: String,

    /// Movie identifier; the manifest lives at `<base_url>/<movie>/manifest.txt`
    pub movie: String,

    /// Number of segments the playback queue holds before pushes block
    pub queue_capacity: usize,

    pub connection_mode: ConnectionMode,

    /// Socket-level options handed to the HTTP client
    pub http: HttpClientConfig,

    /// Check track ordering and segment layout when the manifest is loaded.
    /// Track selection assumes both; disabling this leaves them to the caller.
    pub validate_manifest: bool,
}

impl SessionConfig {
    pub fn new(base_url: impl Into<String>, movie: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            movie: movie.into(),
            queue_capacity: 10,
            connection_mode: ConnectionMode::default(),
            http: HttpClientConfig::default(),
            validate_manifest: true,
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_connection_mode(mut self, mode: ConnectionMode) -> Self {
        self.connection_mode = mode;
        self
    }

    pub fn with_http_config(mut self, http: HttpClientConfig) -> Self {
        self.http = http;
        self
    }

    pub fn with_manifest_validation(mut self, enabled: bool) -> Self {
        self.validate_manifest = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            SessionError::invalid_config(format!("invalid base URL `{}`: {e}", self.base_url))
        })?;
        if url.scheme() != "http" {
            return Err(SessionError::invalid_config(format!(
                "base URL `{}` must use http",
                self.base_url
            )));
        }

        if self.movie.trim().is_empty() {
            return Err(SessionError::invalid_config("movie identifier is empty"));
        }
        if self.movie.chars().any(char::is_whitespace) {
            return Err(SessionError::invalid_config(format!(
                "movie identifier `{}` contains whitespace",
                self.movie
            )));
        }

        if self.queue_capacity == 0 {
            return Err(SessionError::invalid_config(
                "queue capacity must be at least 1",
            ));
        }
        Ok(())
    }

    fn movie_base(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.movie.trim_matches('/')
        )
    }

    pub fn manifest_url(&self) -> String {
        format!("{}/{}", self.movie_base(), MANIFEST_FILENAME)
    }

    pub fn track_url(&self, filename: &str) -> String {
        format!("{}/{}", self.movie_base(), filename)
    }
}
