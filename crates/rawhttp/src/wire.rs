// Response-side wire helpers shared by both client strategies.

use std::future::Future;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt};
use tracing::trace;

use crate::HttpError;

const CONTENT_LENGTH: &str = "Content-Length";

/// Runs an I/O future under a deadline, attributing a lost connection to `peer`.
pub(crate) async fn timed<F, T>(
    operation: &'static str,
    duration: Duration,
    peer: &str,
    fut: F,
) -> Result<T, HttpError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result.map_err(|e| HttpError::from_io(peer, e)),
        Err(_) => Err(HttpError::timeout(operation, duration)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub code: u16,
    /// Full status line as received, without the line terminator.
    pub text: String,
}

impl StatusLine {
    /// 2xx class check on the numeric code.
    pub fn is_success(&self) -> bool {
        self.code / 100 == 2
    }
}

/// Parses `HTTP/x.y <code> [reason]`.
pub fn parse_status_line(line: &str) -> Result<StatusLine, HttpError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        return Err(HttpError::malformed_response(format!(
            "invalid status line `{line}`"
        )));
    }

    let code = parts
        .next()
        .filter(|code| code.len() == 3 && code.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| {
            HttpError::malformed_response(format!("invalid status code in `{line}`"))
        })?;

    Ok(StatusLine {
        code,
        text: line.to_string(),
    })
}

/// Splits a `Name: value` header line. Lines without a colon yield `None`.
pub fn parse_header(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    Some((name.trim(), value.trim()))
}

/// Status line plus the only header the clients care about.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusLine,
    pub content_length: Option<u64>,
}

/// Reads one CRLF (or bare LF) terminated line, charging its size to `budget`.
///
/// Returns `Ok(None)` on a clean EOF before any byte of the line.
pub(crate) async fn read_line<R>(
    reader: &mut R,
    budget: &mut usize,
    read_timeout: Duration,
    peer: &str,
) -> Result<Option<String>, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    if *budget == 0 {
        return Err(HttpError::malformed_response("response head too large"));
    }

    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(*budget as u64);
    let read = timed("read", read_timeout, peer, limited.read_until(b'\n', &mut line)).await?;
    if read == 0 {
        return Ok(None);
    }
    *budget -= read;

    if line.last() != Some(&b'\n') {
        return match *budget {
            0 => Err(HttpError::malformed_response("response head too large")),
            _ => Err(HttpError::connection_closed(
                peer,
                "connection closed in the middle of the response head",
            )),
        };
    }

    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }

    String::from_utf8(line)
        .map(Some)
        .map_err(|_| HttpError::malformed_response("response head is not valid UTF-8"))
}

/// Reads the status line and the header block.
///
/// A non-2xx status fails immediately with [`HttpError::ProtocolStatusError`],
/// leaving the rest of the response unread.
pub(crate) async fn read_head<R>(
    reader: &mut R,
    max_header_bytes: usize,
    read_timeout: Duration,
    peer: &str,
) -> Result<ResponseHead, HttpError>
where
    R: AsyncBufRead + Unpin,
{
    let mut budget = max_header_bytes;

    let status_line = read_line(reader, &mut budget, read_timeout, peer)
        .await?
        .ok_or_else(|| HttpError::connection_closed(peer, "connection closed before status line"))?;
    let status = parse_status_line(&status_line)?;
    if !status.is_success() {
        return Err(HttpError::ProtocolStatusError {
            code: status.code,
            status_text: status.text,
        });
    }

    let mut content_length = None;
    loop {
        let line = read_line(reader, &mut budget, read_timeout, peer)
            .await?
            .ok_or_else(|| HttpError::connection_closed(peer, "connection closed inside headers"))?;
        if line.is_empty() {
            break;
        }

        match parse_header(&line) {
            Some((name, value)) if name.eq_ignore_ascii_case(CONTENT_LENGTH) => {
                let length = value.parse::<u64>().map_err(|_| {
                    HttpError::malformed_response(format!("invalid Content-Length `{value}`"))
                })?;
                content_length = Some(length);
            }
            Some(_) => {}
            None => trace!(line = %line, "Ignoring header line without colon"),
        }
    }

    Ok(ResponseHead {
        status,
        content_length,
    })
}

/// Reads exactly `expected` bytes, never more, even if the stream has extra
/// data buffered behind the body.
pub(crate) async fn read_exact_body<R>(
    reader: &mut R,
    expected: u64,
    read_timeout: Duration,
    peer: &str,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin,
{
    let capacity = usize::try_from(expected.min(4 * 1024 * 1024)).unwrap_or(0);
    let mut body = BytesMut::with_capacity(capacity);
    let mut limited = (&mut *reader).take(expected);

    loop {
        let read = timed("read", read_timeout, peer, limited.read_buf(&mut body)).await?;
        if read == 0 {
            break;
        }
    }

    let received = body.len() as u64;
    if received != expected {
        return Err(HttpError::TruncatedRead { expected, received });
    }
    Ok(body.freeze())
}

/// Reads until the peer closes the stream.
pub(crate) async fn read_to_close<R>(
    reader: &mut R,
    read_timeout: Duration,
    peer: &str,
) -> Result<Bytes, HttpError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let read = timed("read", read_timeout, peer, reader.read_buf(&mut body)).await?;
        if read == 0 {
            break;
        }
    }
    Ok(body.freeze())
}
