// HTTP client interface and the connection plumbing shared by both strategies.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::config::HttpClientConfig;
use crate::origin::Origin;
use crate::request::ByteRange;
use crate::wire::{self, timed};
use crate::HttpError;

/// GET and byte-range GET over a raw socket.
///
/// Implemented by [`TransientClient`](crate::TransientClient), which opens a
/// connection per request, and [`PersistentClient`](crate::PersistentClient),
/// which keeps one connection to a fixed origin.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetches `range` of the resource at `url`.
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<Bytes, HttpError>;

    /// Fetches the whole resource.
    async fn get(&self, url: &str) -> Result<Bytes, HttpError> {
        self.fetch(url, ByteRange::Full).await
    }

    /// Fetches from `start` to the end of the resource.
    async fn get_range_from(&self, url: &str, start: u64) -> Result<Bytes, HttpError> {
        self.fetch(url, ByteRange::From(start)).await
    }

    /// Fetches the inclusive byte range `start..=end`.
    async fn get_range(&self, url: &str, start: u64, end: u64) -> Result<Bytes, HttpError> {
        self.fetch(url, ByteRange::Inclusive { start, end }).await
    }

    /// Releases any connection held by the client.
    async fn close(&self) -> Result<(), HttpError> {
        Ok(())
    }
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<Bytes, HttpError> {
        (**self).fetch(url, range).await
    }

    async fn close(&self) -> Result<(), HttpError> {
        (**self).close().await
    }
}

/// How the end of a response body was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyFraming {
    ContentLength,
    /// No `Content-Length`; the body ran until the peer closed the stream.
    ConnectionClose,
}

pub(crate) async fn open_connection(
    origin: &Origin,
    config: &HttpClientConfig,
) -> Result<BufStream<TcpStream>, HttpError> {
    let authority = origin.authority();
    let stream = match tokio::time::timeout(
        config.connect_timeout,
        TcpStream::connect(authority.as_str()),
    )
    .await
    {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return Err(HttpError::connection_failure(authority, e)),
        Err(_) => return Err(HttpError::timeout("connect", config.connect_timeout)),
    };

    if let Err(e) = stream.set_nodelay(true) {
        trace!(error = %e, "Failed to set TCP_NODELAY");
    }
    debug!(peer = %authority, "Connection established");
    Ok(BufStream::new(stream))
}

/// Writes one request and reads its response off `stream`.
pub(crate) async fn exchange<S>(
    stream: &mut BufStream<S>,
    request: &[u8],
    config: &HttpClientConfig,
    peer: &str,
) -> Result<(Bytes, BodyFraming), HttpError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    timed("write", config.write_timeout, peer, async {
        stream.write_all(request).await?;
        stream.flush().await
    })
    .await?;

    let head = wire::read_head(stream, config.max_header_bytes, config.read_timeout, peer).await?;
    trace!(status = head.status.code, content_length = ?head.content_length, "Response head received");

    match head.content_length {
        Some(length) => {
            let body = wire::read_exact_body(stream, length, config.read_timeout, peer).await?;
            Ok((body, BodyFraming::ContentLength))
        }
        None => {
            let body = wire::read_to_close(stream, config.read_timeout, peer).await?;
            Ok((body, BodyFraming::ConnectionClose))
        }
    }
}
