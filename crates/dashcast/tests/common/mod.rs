#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use dashcast::{Manifest, Segment, SessionError, Track};
use rawhttp::{ByteRange, HttpClient, HttpError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Initialize tracing for tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub const BASE_URL: &str = "http://media.test";
pub const MOVIE: &str = "movie";

pub fn content_type(track: usize) -> String {
    format!("video/q{track}")
}

pub fn filename(track: usize) -> String {
    format!("q{track}.mp4")
}

/// Track file whose every byte encodes its track and segment, so a payload
/// identifies where it came from.
pub fn track_file(track: usize, segments: usize, segment_len: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(segments * segment_len);
    for segment in 0..segments {
        let tag = (track * 16 + segment) as u8;
        data.extend(std::iter::repeat_n(tag, segment_len));
    }
    data
}

/// (track, segment) a payload produced by [`track_file`] came from.
pub fn identify(payload: &[u8]) -> (usize, usize) {
    let tag = payload[0] as usize;
    (tag / 16, tag % 16)
}

/// A ladder of tracks sharing one segment layout.
pub fn ladder(ratings: &[u64], segments: usize, segment_len: usize, duration: Duration) -> Manifest {
    let tracks = ratings
        .iter()
        .enumerate()
        .map(|(index, &avg_bandwidth)| Track {
            filename: filename(index),
            content_type: content_type(index),
            avg_bandwidth,
            segment_duration: duration,
            segments: (0..segments)
                .map(|s| Segment::new((s * segment_len) as u64, segment_len as u64))
                .collect(),
        })
        .collect();
    Manifest::new(tracks)
}

pub fn track_files(tracks: usize, segments: usize, segment_len: usize) -> HashMap<String, Vec<u8>> {
    (0..tracks)
        .map(|track| (filename(track), track_file(track, segments, segment_len)))
        .collect()
}

/// In-memory media server with simulated latency.
#[derive(Default)]
pub struct MockClient {
    files: HashMap<String, Bytes>,
    latency: Duration,
    /// Per-call latencies (1-based call order); later calls use `latency`.
    call_latencies: Vec<Duration>,
    fail_on_call: Option<usize>,
    short_on_call: Option<usize>,
    calls: Mutex<Vec<(String, ByteRange)>>,
    call_count: AtomicUsize,
    closed: AtomicBool,
}

impl MockClient {
    /// Serves `files` (keyed by file name) under `BASE_URL/MOVIE/`.
    pub fn new(files: HashMap<String, Vec<u8>>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|(name, data)| (format!("{BASE_URL}/{MOVIE}/{name}"), Bytes::from(data)))
                .collect(),
            ..Self::default()
        }
    }

    /// Every request takes `latency` to complete.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// The first requests take these latencies, in order.
    pub fn with_call_latencies(mut self, latencies: impl IntoIterator<Item = Duration>) -> Self {
        self.call_latencies = latencies.into_iter().collect();
        self
    }

    /// The `n`th request (1-based) fails with a refused connection.
    pub fn fail_on_call(mut self, n: usize) -> Self {
        self.fail_on_call = Some(n);
        self
    }

    /// The `n`th request (1-based) returns one byte less than asked for.
    pub fn short_on_call(mut self, n: usize) -> Self {
        self.short_on_call = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<(String, ByteRange)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch(&self, url: &str, range: ByteRange) -> Result<Bytes, HttpError> {
        let call = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.calls.lock().unwrap().push((url.to_string(), range));

        let latency = self
            .call_latencies
            .get(call - 1)
            .copied()
            .unwrap_or(self.latency);
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(HttpError::connection_failure(
                "media.test:80",
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ));
        }

        let data = self.files.get(url).ok_or(HttpError::ProtocolStatusError {
            code: 404,
            status_text: "Not Found".to_string(),
        })?;
        let last = data.len() as u64 - 1;
        let (start, end) = match range {
            ByteRange::Full => (0, last),
            ByteRange::From(start) => (start, last),
            ByteRange::Inclusive { start, end } => (start, end.min(last)),
        };
        let mut body = data.slice(start as usize..=end as usize);
        if self.short_on_call == Some(call) {
            body.truncate(body.len() - 1);
        }
        Ok(body)
    }

    async fn close(&self) -> Result<(), HttpError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Parser for the line format used by the test server:
/// `<file> <content-type> <bps> <duration-ms> <offset>:<length>[,<offset>:<length>...]`
pub fn parse_test_manifest(text: &str) -> Result<Manifest, SessionError> {
    let mut tracks = Vec::new();
    for line in text.lines().filter(|line| !line.trim().is_empty()) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [file, content_type, bps, duration_ms, segments] = fields[..] else {
            return Err(SessionError::manifest_parse(format!("bad line `{line}`")));
        };
        let number = |value: &str| {
            value
                .parse::<u64>()
                .map_err(|e| SessionError::manifest_parse(format!("`{value}`: {e}")))
        };
        let segments = segments
            .split(',')
            .map(|pair| {
                let (offset, length) = pair
                    .split_once(':')
                    .ok_or_else(|| SessionError::manifest_parse(format!("bad segment `{pair}`")))?;
                Ok(Segment::new(number(offset)?, number(length)?))
            })
            .collect::<Result<Vec<_>, SessionError>>()?;
        tracks.push(Track {
            filename: file.to_string(),
            content_type: content_type.to_string(),
            avg_bandwidth: number(bps)?,
            segment_duration: Duration::from_millis(number(duration_ms)?),
            segments,
        });
    }
    Ok(Manifest::new(tracks))
}

/// Renders `manifest` in the format [`parse_test_manifest`] reads.
pub fn render_manifest(manifest: &Manifest) -> String {
    manifest
        .tracks()
        .iter()
        .map(|track| {
            let segments = track
                .segments
                .iter()
                .map(|s| format!("{}:{}", s.offset, s.length))
                .collect::<Vec<_>>()
                .join(",");
            format!(
                "{} {} {} {} {}\n",
                track.filename,
                track.content_type,
                track.avg_bandwidth,
                track.segment_duration.as_millis(),
                segments
            )
        })
        .collect()
}

#[derive(Default)]
pub struct ServerLog {
    pub connections: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

impl ServerLog {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// HTTP media server over loopback serving `files` by request path, honouring
/// `Range: bytes=a-b`. Unknown paths get a 404.
pub async fn serve_files(files: HashMap<String, Vec<u8>>) -> (SocketAddr, Arc<ServerLog>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log = Arc::new(ServerLog::default());
    let files = Arc::new(files);

    let server_log = Arc::clone(&log);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            server_log.connections.fetch_add(1, Ordering::SeqCst);
            let log = Arc::clone(&server_log);
            let files = Arc::clone(&files);

            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                loop {
                    let mut head = String::new();
                    loop {
                        let mut line = String::new();
                        match socket.read_line(&mut line).await {
                            Ok(0) | Err(_) => return,
                            Ok(_) => {}
                        }
                        if line == "\r\n" {
                            break;
                        }
                        head.push_str(&line);
                    }
                    log.requests.lock().unwrap().push(head.clone());

                    let reply = answer(&head, &files);
                    if socket.get_mut().write_all(&reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    (addr, log)
}

fn answer(head: &str, files: &HashMap<String, Vec<u8>>) -> Vec<u8> {
    let path = head.split_whitespace().nth(1).unwrap_or("/");
    let Some(data) = files.get(path) else {
        return response("404 Not Found", b"not found");
    };
    let range = head
        .lines()
        .find_map(|line| line.strip_prefix("Range: bytes="))
        .and_then(|value| value.trim().split_once('-'))
        .and_then(|(start, end)| Some((start.parse::<usize>().ok()?, end.parse::<usize>().ok()?)));
    match range {
        Some((start, end)) => response("206 Partial Content", &data[start..=end.min(data.len() - 1)]),
        None => response("200 OK", data),
    }
}

fn response(status: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nServer: test\r\nContent-Length: {}\r\n\r\n",
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}
