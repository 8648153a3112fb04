use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, trace};

use crate::client::{HttpClient, exchange, open_connection};
use crate::config::{HttpClientConfig, HttpVersion};
use crate::origin::Target;
use crate::request::{ByteRange, build_request};
use crate::HttpError;

/// Opens a fresh connection for every request and closes it once the
/// response has been read. Speaks HTTP/1.0 unless configured otherwise.
#[derive(Debug, Clone, Default)]
pub struct TransientClient {
    config: HttpClientConfig,
}

impl TransientClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self { config }
    }

    pub fn version(&self) -> HttpVersion {
        self.config.version_or(HttpVersion::Http10)
    }
}

#[async_trait]
impl HttpClient for TransientClient {
    #[instrument(skip(self), level = "debug")]
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<Bytes, HttpError> {
        let target = Target::parse(url)?;
        range.validate()?;

        let peer = target.origin.authority();
        let mut stream = open_connection(&target.origin, &self.config).await?;
        let request = build_request(&target.path, self.version(), range);
        let (body, _) = exchange(&mut stream, &request, &self.config, &peer).await?;

        // The server may already have closed its side.
        if let Err(e) = stream.shutdown().await {
            trace!(error = %e, "Failed to shut down connection");
        }

        debug!(bytes = body.len(), "Transient request complete");
        Ok(body)
    }
}
