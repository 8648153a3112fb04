use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::client::{BodyFraming, HttpClient, exchange, open_connection};
use crate::config::{HttpClientConfig, HttpVersion};
use crate::origin::{Origin, Target};
use crate::request::{ByteRange, build_request};
use crate::HttpError;

/// Keeps a single connection to one origin open across requests.
///
/// The origin is fixed by the URL given to [`PersistentClient::connect`]. Requests
/// for any other host or port fail with [`HttpError::ServerMismatch`] before
/// touching the socket. Any transport error closes the connection for good;
/// there is no reconnect. Speaks HTTP/1.1 unless configured otherwise.
pub struct PersistentClient {
    origin: Origin,
    config: HttpClientConfig,
    connection: Mutex<Option<BufStream<TcpStream>>>,
}

impl PersistentClient {
    /// Binds to the origin of `url` and opens the connection.
    pub async fn connect(url: &str, config: HttpClientConfig) -> Result<Self, HttpError> {
        let target = Target::parse(url)?;
        let stream = open_connection(&target.origin, &config).await?;
        Ok(Self {
            origin: target.origin,
            config,
            connection: Mutex::new(Some(stream)),
        })
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn version(&self) -> HttpVersion {
        self.config.version_or(HttpVersion::Http11)
    }

    /// Whether the connection is still usable.
    pub async fn is_open(&self) -> bool {
        self.connection.lock().await.is_some()
    }
}

#[async_trait]
impl HttpClient for PersistentClient {
    #[instrument(skip(self), fields(origin = %self.origin), level = "debug")]
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<Bytes, HttpError> {
        let target = Target::parse(url)?;
        if target.origin != self.origin {
            return Err(HttpError::ServerMismatch {
                expected: self.origin.clone(),
                actual: target.origin,
            });
        }
        range.validate()?;

        let peer = self.origin.authority();
        let mut guard = self.connection.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| HttpError::connection_closed(&peer, "persistent connection is closed"))?;

        let request = build_request(&target.path, self.version(), range);
        match exchange(stream, &request, &self.config, &peer).await {
            Ok((body, BodyFraming::ContentLength)) => {
                debug!(bytes = body.len(), "Persistent request complete");
                Ok(body)
            }
            Ok((body, BodyFraming::ConnectionClose)) => {
                debug!(
                    bytes = body.len(),
                    "Response had no Content-Length; connection consumed"
                );
                *guard = None;
                Ok(body)
            }
            Err(e) => {
                if e.is_connection_fatal() {
                    warn!(error = %e, "Dropping persistent connection");
                    *guard = None;
                }
                Err(e)
            }
        }
    }

    async fn close(&self) -> Result<(), HttpError> {
        let stream = self.connection.lock().await.take();
        if let Some(mut stream) = stream {
            debug!(origin = %self.origin, "Closing persistent connection");
            stream.shutdown().await?;
        }
        Ok(())
    }
}
