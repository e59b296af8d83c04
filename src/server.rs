//! HTTP JSON shell for the presentation surface.
//!
//! Connections are handled one at a time on the current task, so each
//! control event runs to completion before the next request is read. Each
//! request must arrive within the read timeout or it is answered with 408.
//!
//! Endpoints:
//!   GET    /api/health
//!   POST   /api/sessions
//!   GET    /api/sessions/{id}
//!   GET    /api/sessions/{id}/choices
//!   POST   /api/sessions/{id}/controls   {"control": "...", "value": ...}
//!   DELETE /api/sessions/{id}
//!   GET    /api/manifest
//!
//! `OPTIONS` on any of these answers a CORS preflight with 204.

use crate::logging::{log, log_request, obj, v_str, Domain, Level};
use crate::session::SessionRegistry;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const MAX_BODY_BYTES: usize = 64 * 1024;
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
const ALLOW_METHODS: &str = "GET, POST, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type";

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn no_content() -> Self {
        Self {
            status: 204,
            body: Value::Null,
        }
    }

    fn error(status: u16, msg: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": msg.into() }),
        }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            204 => "No Content",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            408 => "Request Timeout",
            413 => "Payload Too Large",
            _ => "Internal Server Error",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ControlBody {
    control: String,
    value: Value,
}

fn is_known_route(parts: &[&str]) -> bool {
    match parts {
        ["api", "health"] | ["api", "sessions"] | ["api", "manifest"] => true,
        ["api", "sessions", id] | ["api", "sessions", id, "choices" | "controls"] => {
            id.parse::<u64>().is_ok()
        }
        _ => false,
    }
}

pub struct App {
    sessions: SessionRegistry,
    read_timeout: Duration,
}

impl App {
    pub fn new(sessions: SessionRegistry) -> Self {
        Self {
            sessions,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Deadline for reading one request, and for writing its response.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Route one request. Pure with respect to sockets, so it can be
    /// exercised directly.
    pub fn handle(&mut self, method: &str, path: &str, body: &[u8]) -> Response {
        let path = path.split('?').next().unwrap_or(path);
        let parts: Vec<&str> = path.trim_matches('/').split('/').collect();

        if method == "OPTIONS" {
            return if is_known_route(&parts) {
                Response::no_content()
            } else {
                Response::error(404, "not found")
            };
        }
        match (method, parts.as_slice()) {
            ("GET", ["api", "health"]) => Response::ok(json!({
                "status": "ok",
                "rows": self.sessions.dataset().len(),
                "sessions": self.sessions.len(),
            })),
            ("POST", ["api", "sessions"]) => {
                let session = self.sessions.open();
                Response::ok(json!({
                    "session": session.id(),
                    "selection": session.selection(),
                    "choices": session.choices(),
                    "outputs": session.render(),
                }))
            }
            (_, ["api", "sessions", id, rest @ ..]) => {
                let Ok(id) = id.parse::<u64>() else {
                    return Response::error(404, "unknown session");
                };
                self.session_route(method, id, rest, body)
            }
            ("GET", ["api", "manifest"]) => Response::ok(json!(self.sessions.dataset().manifest())),
            _ => Response::error(404, "not found"),
        }
    }

    fn session_route(&mut self, method: &str, id: u64, rest: &[&str], body: &[u8]) -> Response {
        if method == "DELETE" && rest.is_empty() {
            return if self.sessions.close(id) {
                Response::ok(json!({ "closed": id }))
            } else {
                Response::error(404, "unknown session")
            };
        }
        let Some(session) = self.sessions.get_mut(id) else {
            return Response::error(404, "unknown session");
        };
        match (method, rest) {
            ("GET", []) => Response::ok(json!({
                "session": id,
                "selection": session.selection(),
                "outputs": session.render(),
            })),
            ("GET", ["choices"]) => Response::ok(json!({
                "factor": session.selection().color_factor,
                "choices": session.choices(),
            })),
            ("POST", ["controls"]) => {
                let parsed: ControlBody = match serde_json::from_slice(body) {
                    Ok(b) => b,
                    Err(err) => return Response::error(400, format!("bad body: {}", err)),
                };
                match session.handle(&parsed.control, &parsed.value) {
                    Ok(affected) => Response::ok(json!({
                        "session": id,
                        "affected": affected,
                        "choices": session.choices(),
                        "outputs": session.render(),
                    })),
                    Err(err) => Response::error(400, err.to_string()),
                }
            }
            (_, [] | ["choices"] | ["controls"]) => Response::error(405, "method not allowed"),
            _ => Response::error(404, "not found"),
        }
    }
}

/// Accept and serve connections sequentially until the listener fails.
pub async fn serve(listener: TcpListener, app: &mut App) -> Result<()> {
    let addr = listener.local_addr().context("listener address")?;
    log(
        Level::Info,
        Domain::Server,
        "listening",
        obj(&[("addr", v_str(&addr.to_string()))]),
    );
    loop {
        let (stream, peer) = listener.accept().await.context("accept")?;
        if let Err(err) = handle_connection(stream, app).await {
            log(
                Level::Warn,
                Domain::Server,
                "connection_error",
                obj(&[("peer", v_str(&peer.to_string())), ("msg", v_str(&format!("{:#}", err)))]),
            );
        }
    }
}

struct Request {
    method: String,
    path: String,
    /// `None` when the declared body exceeds `MAX_BODY_BYTES`.
    body: Option<Vec<u8>>,
}

async fn handle_connection(mut stream: TcpStream, app: &mut App) -> Result<()> {
    let started = Instant::now();
    let deadline = app.read_timeout;
    let (reader, mut writer) = stream.split();
    let mut reader = BufReader::new(reader);

    let (method, path, response) = match timeout(deadline, read_request(&mut reader)).await {
        Err(_) => (String::new(), String::new(), Response::error(408, "request timeout")),
        Ok(read) => match read? {
            None => return Ok(()),
            Some(Request { method, path, body: None }) => {
                (method, path, Response::error(413, "body too large"))
            }
            Some(Request { method, path, body: Some(body) }) => {
                let response = app.handle(&method, &path, &body);
                (method, path, response)
            }
        },
    };

    timeout(deadline, write_response(&mut writer, &response))
        .await
        .context("response write timed out")??;

    log_request(
        &method,
        &path,
        response.status,
        started.elapsed().as_secs_f64() * 1000.0,
    );
    Ok(())
}

async fn read_request<R>(reader: &mut BufReader<R>) -> Result<Option<Request>>
where
    R: AsyncRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }
    let mut it = request_line.split_whitespace();
    let method = it.next().unwrap_or_default().to_string();
    let path = it.next().unwrap_or("/").to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    if content_length > MAX_BODY_BYTES {
        return Ok(Some(Request { method, path, body: None }));
    }
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    Ok(Some(Request {
        method,
        path,
        body: Some(body),
    }))
}

async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let payload = if response.status == 204 {
        String::new()
    } else {
        response.body.to_string()
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: application/json\r\n\
         Access-Control-Allow-Origin: *\r\n\
         Access-Control-Allow-Methods: {}\r\n\
         Access-Control-Allow-Headers: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n",
        response.status,
        response.reason(),
        ALLOW_METHODS,
        ALLOW_HEADERS,
        payload.len()
    );
    writer.write_all(head.as_bytes()).await?;
    writer.write_all(payload.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::Canvas;
    use crate::data::{Dataset, DatasetRow, Framework};
    use std::sync::Arc;

    fn app() -> App {
        let mut a = DatasetRow::new("a", Framework::Frequentist, 0.1);
        a.outcome = Some("f0".into());
        let mut b = DatasetRow::new("b", Framework::Bayesian, 0.2);
        b.outcome = Some("duration".into());
        let ds = Arc::new(Dataset::from_rows(vec![a, b]).unwrap());
        App::new(SessionRegistry::new(ds, Canvas::default(), 4))
    }

    #[test]
    fn health_reports_rows() {
        let r = app().handle("GET", "/api/health", b"");
        assert_eq!(r.status, 200);
        assert_eq!(r.body["rows"], 2);
    }

    #[test]
    fn unknown_paths_are_404() {
        let mut app = app();
        assert_eq!(app.handle("GET", "/nope", b"").status, 404);
        assert_eq!(app.handle("GET", "/api/sessions/99", b"").status, 404);
        assert_eq!(app.handle("GET", "/api/sessions/abc", b"").status, 404);
    }

    #[test]
    fn wrong_method_is_405() {
        let mut app = app();
        let id = app.handle("POST", "/api/sessions", b"").body["session"].as_u64().unwrap();
        let r = app.handle("PUT", &format!("/api/sessions/{}/controls", id), b"");
        assert_eq!(r.status, 405);
    }

    #[test]
    fn preflight_on_known_routes_is_204() {
        let mut app = app();
        let id = app.handle("POST", "/api/sessions", b"").body["session"].as_u64().unwrap();
        for path in [
            "/api/health".to_string(),
            "/api/sessions".to_string(),
            "/api/manifest".to_string(),
            format!("/api/sessions/{}", id),
            format!("/api/sessions/{}/choices", id),
            format!("/api/sessions/{}/controls", id),
        ] {
            let r = app.handle("OPTIONS", &path, b"");
            assert_eq!(r.status, 204, "{}", path);
            assert_eq!(r.reason(), "No Content");
        }
        assert_eq!(app.handle("OPTIONS", "/api/nope", b"").status, 404);
        assert_eq!(app.handle("OPTIONS", "/api/sessions/abc/controls", b"").status, 404);
    }

    #[test]
    fn preflight_does_not_touch_sessions() {
        let mut app = app();
        app.handle("OPTIONS", "/api/sessions", b"");
        assert!(app.sessions().is_empty());
    }

    #[tokio::test]
    async fn no_content_response_has_cors_headers_and_no_body() {
        let mut out = Vec::new();
        write_response(&mut out, &Response::no_content()).await.unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(text.contains("Access-Control-Allow-Methods: GET, POST, DELETE, OPTIONS\r\n"));
        assert!(text.contains("Access-Control-Allow-Headers: Content-Type\r\n"));
        assert!(text.ends_with("Content-Length: 0\r\nConnection: close\r\n\r\n"));
    }

    #[test]
    fn bad_control_body_is_400() {
        let mut app = app();
        let id = app.handle("POST", "/api/sessions", b"").body["session"].as_u64().unwrap();
        let path = format!("/api/sessions/{}/controls", id);
        assert_eq!(app.handle("POST", &path, b"not json").status, 400);
        let r = app.handle("POST", &path, br#"{"control":"zoom","value":2}"#);
        assert_eq!(r.status, 400);
        assert!(r.body["error"].as_str().unwrap().contains("zoom"));
    }
}
