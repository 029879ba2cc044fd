// tests/common/mod.rs
// =============================================================================
// A tiny instrumented HTTP server for integration tests.
//
// Real enough for reqwest (status line, Content-Length, Connection: close),
// small enough to read in one sitting. Routes are registered per path with
// an optional number of leading failures, and the server keeps the books
// the tests assert on: per-path hit counts, a request-order log, and a
// high-water mark of how many requests were in flight at once.
// =============================================================================

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

struct Route {
    body: Vec<u8>,
    content_type: &'static str,
    /// Serve HTTP 500 for this many hits before succeeding.
    fail_first: usize,
    hits: usize,
}

#[derive(Default)]
struct ServerState {
    routes: Mutex<HashMap<String, Route>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    total_hits: AtomicUsize,
    request_log: Mutex<Vec<String>>,
    response_delay: Mutex<Duration>,
}

pub struct DiscServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl DiscServer {
    /// Bind to an ephemeral localhost port and start accepting.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("binding test server");
        let addr = listener.local_addr().expect("test server address");
        let state = Arc::new(ServerState::default());

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };
                let state = accept_state.clone();
                tokio::spawn(handle_connection(stream, state));
            }
        });

        DiscServer { addr, state }
    }

    /// Base URL of the server, with the trailing slash the crawler expects.
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Register a path that always succeeds.
    pub fn serve(&self, path: &str, content_type: &'static str, body: &[u8]) {
        self.add_route(path, content_type, body, 0);
    }

    /// Register an HTML page (listing pages, mostly).
    pub fn serve_html(&self, path: &str, html: &str) {
        self.add_route(path, "text/html", html.as_bytes(), 0);
    }

    /// Register a path that serves 500 for the first `n` hits, then succeeds.
    pub fn fail_n_then_serve(&self, path: &str, n: usize, content_type: &'static str, body: &[u8]) {
        self.add_route(path, content_type, body, n);
    }

    /// Register a path that never succeeds.
    pub fn always_fail(&self, path: &str) {
        self.add_route(path, "text/plain", b"", usize::MAX);
    }

    /// Delay every response by `delay`; keeps requests overlapping long
    /// enough for the in-flight gauge to mean something.
    pub fn set_response_delay(&self, delay: Duration) {
        *self.state.response_delay.lock().unwrap() = delay;
    }

    /// How many times `path` was requested (registered paths only).
    pub fn hits(&self, path: &str) -> usize {
        self.state
            .routes
            .lock()
            .unwrap()
            .get(path)
            .map(|route| route.hits)
            .unwrap_or(0)
    }

    /// Every request the server has seen, registered or not.
    pub fn total_hits(&self) -> usize {
        self.state.total_hits.load(Ordering::SeqCst)
    }

    /// The most requests that were ever in flight at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.state.max_in_flight.load(Ordering::SeqCst)
    }

    /// Request paths in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.state.request_log.lock().unwrap().clone()
    }

    fn add_route(&self, path: &str, content_type: &'static str, body: &[u8], fail_first: usize) {
        self.state.routes.lock().unwrap().insert(
            path.to_string(),
            Route {
                body: body.to_vec(),
                content_type,
                fail_first,
                hits: 0,
            },
        );
    }
}

async fn handle_connection(mut stream: TcpStream, state: Arc<ServerState>) {
    // Read until the blank line that ends the request head; the crawler
    // only sends GETs, so there is no body to worry about
    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => {
                head.extend_from_slice(&chunk[..n]);
                if head.windows(4).any(|w| w == b"\r\n\r\n") {
                    break;
                }
                if head.len() > 64 * 1024 {
                    return;
                }
            }
        }
    }

    let request_line = String::from_utf8_lossy(&head);
    let path = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or("/")
        .to_string();

    state.total_hits.fetch_add(1, Ordering::SeqCst);
    state.request_log.lock().unwrap().push(path.clone());

    let now_in_flight = state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    state.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

    let delay = *state.response_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let response = build_response(&state, &path);
    let _ = stream.write_all(&response).await;
    let _ = stream.shutdown().await;

    state.in_flight.fetch_sub(1, Ordering::SeqCst);
}

fn build_response(state: &ServerState, path: &str) -> Vec<u8> {
    let mut routes = state.routes.lock().unwrap();
    match routes.get_mut(path) {
        None => http_response(404, "text/plain", b"not found"),
        Some(route) => {
            route.hits += 1;
            if route.hits <= route.fail_first {
                http_response(500, "text/plain", b"simulated failure")
            } else {
                http_response(200, route.content_type, &route.body)
            }
        }
    }
}

fn http_response(status: u16, content_type: &str, body: &[u8]) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let mut response = format!(
        "HTTP/1.1 {status} {reason}\r\n\
         Content-Type: {content_type}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(body);
    response
}
