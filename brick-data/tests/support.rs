//! Loopback HTTP fixture shared by the behavioural tests.
//!
//! [`CannedServer`] answers every request with the same status and body and
//! records what it received, so request construction and response decoding
//! are exercised over a real socket.
#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use std::{
    future::Future,
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

/// A request line and headers captured by [`CannedServer`].
#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    /// Request target, e.g. `/v1/geocode/reverse?lat=...`.
    pub target: String,
    /// Header names (lower-cased) and values.
    pub headers: Vec<(String, String)>,
}

impl CapturedRequest {
    /// Value of header `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Decoded query parameters of the target.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let url = url::Url::parse(&format!("http://loopback{}", self.target))
            .unwrap_or_else(|err| panic!("captured target should parse: {err}"));
        url.query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect()
    }

    /// Decoded path of the target.
    pub fn path(&self) -> String {
        self.target
            .split_once('?')
            .map_or(self.target.as_str(), |(path, _)| path)
            .to_owned()
    }
}

/// Single-purpose HTTP/1.1 server bound to `127.0.0.1`.
pub struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl CannedServer {
    /// Answer every request with `status` and the JSON `body`.
    pub fn start(status: u16, body: impl Into<String>) -> Self {
        Self::start_delayed(status, body, Duration::ZERO)
    }

    /// Like [`CannedServer::start`], but hold each response for `delay`.
    pub fn start_delayed(status: u16, body: impl Into<String>, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
        listener
            .set_nonblocking(true)
            .expect("non-blocking listener");
        let address = listener.local_addr().expect("listener address");
        let requests = Arc::new(Mutex::new(Vec::new()));
        let stop = Arc::new(AtomicBool::new(false));
        let body = body.into();

        let worker = {
            let requests = Arc::clone(&requests);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                while !stop.load(Ordering::Acquire) {
                    match listener.accept() {
                        Ok((stream, _)) => {
                            if let Some(request) = serve(stream, status, &body, delay) {
                                requests
                                    .lock()
                                    .unwrap_or_else(PoisonError::into_inner)
                                    .push(request);
                            }
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(Duration::from_millis(5));
                        }
                        Err(_) => break,
                    }
                }
            })
        };

        Self {
            base_url: format!("http://{address}"),
            requests,
            stop,
            worker: Some(worker),
        }
    }

    /// Root URL of the server, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Requests served so far.
    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The only request served; panics unless exactly one arrived.
    pub fn single_request(&self) -> CapturedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().expect("one request")
    }
}

impl Drop for CannedServer {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(stream: TcpStream, status: u16, body: &str, delay: Duration) -> Option<CapturedRequest> {
    stream.set_nonblocking(false).ok()?;
    let mut reader = BufReader::new(stream.try_clone().ok()?);
    let mut line = String::new();
    reader.read_line(&mut line).ok()?;
    let target = line.split_whitespace().nth(1)?.to_owned();

    let mut headers = Vec::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).ok()? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            headers.push((name.trim().to_ascii_lowercase(), value.trim().to_owned()));
        }
    }

    if !delay.is_zero() {
        thread::sleep(delay);
    }
    let reason = if status == 200 { "OK" } else { "Canned" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let mut stream = stream;
    // The client may already have given up on a delayed response.
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
    Some(CapturedRequest { target, headers })
}

/// Drive `future` to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("build test runtime")
        .block_on(future)
}
