#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

/// Initialize tracing for tests
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// What the test server sends back for one request.
pub struct Reply {
    pub bytes: Vec<u8>,
    /// Close the connection after writing.
    pub close: bool,
}

impl Reply {
    pub fn keep_alive(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            close: false,
        }
    }

    pub fn closing(bytes: Vec<u8>) -> Self {
        Self { bytes, close: true }
    }
}

#[derive(Default)]
pub struct Recorded {
    pub connections: AtomicUsize,
    pub requests: Mutex<Vec<String>>,
}

impl Recorded {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

/// Serves every accepted connection until the peer hangs up, answering each
/// request head with `respond`.
pub async fn serve<F>(respond: F) -> (SocketAddr, Arc<Recorded>)
where
    F: Fn(&str) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let recorded = Arc::new(Recorded::default());
    let respond = Arc::new(respond);

    let server_recorded = Arc::clone(&recorded);
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            server_recorded.connections.fetch_add(1, Ordering::SeqCst);
            let recorded = Arc::clone(&server_recorded);
            let respond = Arc::clone(&respond);

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
                    recorded.requests.lock().unwrap().push(head.clone());

                    let reply = respond(&head);
                    if socket.get_mut().write_all(&reply.bytes).await.is_err() {
                        return;
                    }
                    if reply.close {
                        let _ = socket.get_mut().shutdown().await;
                        return;
                    }
                }
            });
        }
    });

    (addr, recorded)
}

/// Accepts one connection per `head`, reads the request, writes `head` and then
/// resets the connection instead of closing it cleanly.
pub async fn serve_then_reset(head: Vec<u8>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            let head = head.clone();
            tokio::spawn(async move {
                let mut socket = BufReader::new(socket);
                loop {
                    let mut line = String::new();
                    match socket.read_line(&mut line).await {
                        Ok(0) | Err(_) => return,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {}
                    }
                }
                let mut socket = socket.into_inner();
                if socket.write_all(&head).await.is_err() {
                    return;
                }
                let _ = socket.flush().await;
                // Zero linger turns the drop into an RST.
                #[allow(deprecated)]
                let _ = socket.set_linger(Some(Duration::ZERO));
                drop(socket);
            });
        }
    });

    addr
}

/// Deterministic resource content.
pub fn resource(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Parses `Range: bytes=a-[b]` out of a recorded request head.
pub fn requested_range(head: &str, total: usize) -> Option<(usize, usize)> {
    let value = head
        .lines()
        .find_map(|line| line.strip_prefix("Range: bytes="))?;
    let (start, end) = value.trim().split_once('-')?;
    let start: usize = start.parse().ok()?;
    let end = match end {
        "" => total - 1,
        end => end.parse::<usize>().ok()?.min(total - 1),
    };
    Some((start, end))
}

pub fn response(status: &str, content_length: Option<usize>, body: &[u8]) -> Vec<u8> {
    let mut out = format!("HTTP/1.1 {status}\r\nServer: test\r\n");
    if let Some(length) = content_length {
        out.push_str(&format!("Content-Length: {length}\r\n"));
    }
    out.push_str("\r\n");
    let mut out = out.into_bytes();
    out.extend_from_slice(body);
    out
}

/// Answers with the requested slice of `data`, 206 for ranges and 200 otherwise.
pub fn range_reply(head: &str, data: &[u8]) -> Vec<u8> {
    match requested_range(head, data.len()) {
        Some((start, end)) => {
            let body = &data[start..=end];
            response("206 Partial Content", Some(body.len()), body)
        }
        None => response("200 OK", Some(data.len()), data),
    }
}
