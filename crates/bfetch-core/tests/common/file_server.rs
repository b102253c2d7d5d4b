//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves a fixed table of routes: each path answers with a status and body,
//! or redirects to another path. Unknown paths get 404. Every request is
//! counted per path so tests can assert how many GETs were issued.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone)]
pub enum Route {
    Body { status: u16, reason: &'static str, body: Vec<u8> },
    Redirect { location: String },
}

impl Route {
    pub fn ok(body: &[u8]) -> Self {
        Route::Body {
            status: 200,
            reason: "OK",
            body: body.to_vec(),
        }
    }

    pub fn status(status: u16, reason: &'static str) -> Self {
        Route::Body {
            status,
            reason,
            body: Vec::new(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        Route::Redirect {
            location: location.to_string(),
        }
    }
}

pub struct FileServer {
    base_url: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl FileServer {
    /// Base URL with a trailing slash, e.g. "http://127.0.0.1:12345/".
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Number of requests seen for `path` (leading slash optional).
    pub fn hits(&self, path: &str) -> usize {
        let key = format!("/{}", path.trim_start_matches('/'));
        self.hits.lock().unwrap().get(&key).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.lock().unwrap().values().sum()
    }
}

/// Starts a server in a background thread. Route keys are paths such as
/// "/pkg/a.txt". The server runs until the process exits.
pub fn start(routes: Vec<(&str, Route)>) -> FileServer {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let routes: Arc<HashMap<String, Route>> = Arc::new(
        routes
            .into_iter()
            .map(|(p, r)| (format!("/{}", p.trim_start_matches('/')), r))
            .collect(),
    );
    let hits = Arc::new(Mutex::new(HashMap::new()));
    let server_hits = Arc::clone(&hits);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let routes = Arc::clone(&routes);
            let hits = Arc::clone(&server_hits);
            thread::spawn(move || handle(stream, &routes, &hits));
        }
    });
    FileServer {
        base_url: format!("http://127.0.0.1:{}/", port),
        hits,
    }
}

fn handle(
    mut stream: TcpStream,
    routes: &HashMap<String, Route>,
    hits: &Mutex<HashMap<String, usize>>,
) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) | Err(_) => return,
        Ok(n) => n,
    };
    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let mut request_line = request.lines().next().unwrap_or("").split_whitespace();
    let method = request_line.next().unwrap_or("");
    let path = request_line.next().unwrap_or("/").to_string();
    *hits.lock().unwrap().entry(path.clone()).or_insert(0) += 1;

    if !method.eq_ignore_ascii_case("GET") {
        let _ = stream.write_all(
            b"HTTP/1.1 405 Method Not Allowed\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        return;
    }
    match routes.get(&path) {
        Some(Route::Body { status, reason, body }) => {
            let head = format!(
                "HTTP/1.1 {} {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                status,
                reason,
                body.len()
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(body);
        }
        Some(Route::Redirect { location }) => {
            let head = format!(
                "HTTP/1.1 302 Found\r\nLocation: {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                location
            );
            let _ = stream.write_all(head.as_bytes());
        }
        None => {
            let _ = stream.write_all(
                b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            );
        }
    }
}
