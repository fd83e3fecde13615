//! Minimal HTTP/1.1 server for the dashboard.
//!
//! One request per connection: read the request line, drain the headers,
//! answer and close. Every request recomputes its view from the shared
//! dataset. The request head is capped in size and must arrive within
//! `HEAD_TIMEOUT`.

use anyhow::{bail, Context, Result};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::dashboard::Dashboard;
use crate::logging::{self, obj, v_num, v_str, Domain};
use crate::render::{render_page, View};

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Response {
    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body }
    }

    fn json(status: u16, value: serde_json::Value) -> Self {
        Self { status, content_type: "application/json", body: value.to_string() }
    }

    fn text(status: u16, body: &str) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.to_string() }
    }

    fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }

    pub fn to_http(&self) -> String {
        format!(
            "HTTP/1.1 {} {}\r\n\
             Content-Type: {}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            self.status,
            self.reason(),
            self.content_type,
            self.body.len(),
            self.body
        )
    }
}

// =============================================================================
// Query strings
// =============================================================================

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// `+` is a space and `%XX` a byte; malformed escapes pass through.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                match (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    (Some(hi), Some(lo)) => {
                        out.push((hi << 4) | lo);
                        i += 2;
                    }
                    _ => out.push(b'%'),
                }
            }
            b => out.push(b),
        }
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

pub fn query_param(query: Option<&str>, key: &str) -> Option<String> {
    let q = query?;
    for pair in q.split('&') {
        let mut it = pair.splitn(2, '=');
        let k = it.next().unwrap_or("");
        let v = it.next().unwrap_or("");
        if percent_decode(k) == key {
            return Some(percent_decode(v));
        }
    }
    None
}

// =============================================================================
// Routing
// =============================================================================

pub fn route(dash: &Dashboard, method: &str, target: &str) -> Response {
    if method != "GET" {
        return Response::json(405, json!({"ok": false, "error": "method_not_allowed"}));
    }
    let (path, query) = match target.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (target, None),
    };

    match path {
        "/" | "/index.html" => {
            let view = View::from_param(query_param(query, "view").as_deref());
            let title = query_param(query, "video");
            Response::html(render_page(dash, view, title.as_deref()))
        }
        "/api/health" => Response::json(200, json!({"status": "ok"})),
        "/api/summary" => {
            let tiles: Vec<serde_json::Value> = dash
                .tiles()
                .iter()
                .map(|t| {
                    json!({
                        "metric": t.metric,
                        "label": t.label,
                        "value": t.value_text(),
                        "recent_median": t.recent_median,
                        "baseline_median": t.baseline_median,
                        "delta": t.delta,
                        "delta_text": t.delta_text(),
                    })
                })
                .collect();
            Response::json(
                200,
                json!({
                    "short_window_months": dash.config.short_window_months,
                    "long_window_months": dash.config.long_window_months,
                    "tiles": tiles,
                }),
            )
        }
        "/api/videos" => {
            let videos: Vec<serde_json::Value> = dash
                .dataset
                .videos
                .iter()
                .map(|v| json!({"id": v.video, "title": v.title, "published": v.published}))
                .collect();
            Response::json(200, json!({"videos": videos}))
        }
        "/api/normalized" => Response::json(200, json!(dash.normalized)),
        "/api/video" => {
            let Some(id) = query_param(query, "id").filter(|v| !v.is_empty()) else {
                return Response::json(400, json!({"ok": false, "error": "bad_request", "message": "id is required"}));
            };
            match dash.breakdown(&id) {
                Some(breakdown) => Response::json(
                    200,
                    json!({
                        "breakdown": breakdown,
                        "curve": dash.curve(&id),
                        "bands": dash.bands,
                    }),
                ),
                None => Response::json(404, json!({"ok": false, "error": "unknown_video"})),
            }
        }
        _ => Response::text(404, "Not Found"),
    }
}

// =============================================================================
// Connection handling
// =============================================================================

pub const MAX_HEAD_BYTES: u64 = 8 * 1024;
pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);

async fn read_head_lines<R>(reader: &mut R, limit: u64) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).await? == 0 {
        return Ok(None);
    }
    if !request_line.ends_with('\n') {
        bail!("request line exceeds {} bytes or is unterminated", limit);
    }
    loop {
        let mut header = String::new();
        let n = reader.read_line(&mut header).await?;
        if n == 0 {
            break;
        }
        if !header.ends_with('\n') {
            bail!("request head exceeds {} bytes or is unterminated", limit);
        }
        if header.trim().is_empty() {
            break;
        }
    }
    Ok(Some(request_line))
}

/// Read the request line and drain the headers.
///
/// `Ok(None)` for a connection closed before sending anything. A head longer
/// than `limit` bytes, or one that does not finish within `wait`, is an error.
pub async fn read_request_head<R>(reader: R, limit: u64, wait: Duration) -> Result<Option<String>>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader.take(limit));
    timeout(wait, read_head_lines(&mut reader, limit))
        .await
        .with_context(|| format!("request head not received within {:?}", wait))?
}

async fn handle_connection(mut stream: TcpStream, dash: &Dashboard) -> Result<()> {
    let started = Instant::now();
    let (reader, mut writer) = stream.split();

    let Some(request_line) = read_request_head(reader, MAX_HEAD_BYTES, HEAD_TIMEOUT).await? else {
        return Ok(());
    };

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let target = parts.next().unwrap_or("/");
    let response = route(dash, method, target);

    writer.write_all(response.to_http().as_bytes()).await?;
    writer.flush().await?;

    logging::debug(
        Domain::Server,
        "request",
        obj(&[
            ("route", v_str(target)),
            ("method", v_str(method)),
            ("status", v_num(response.status as f64)),
            ("elapsed_ms", v_num(started.elapsed().as_secs_f64() * 1000.0)),
        ]),
    );
    Ok(())
}

pub async fn serve_listener(listener: TcpListener, dash: Arc<Dashboard>) -> Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(err) => {
                logging::warn(Domain::Server, "accept_failed", obj(&[("error", v_str(&err.to_string()))]));
                continue;
            }
        };
        let dash = Arc::clone(&dash);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, &dash).await {
                logging::warn(
                    Domain::Server,
                    "connection_failed",
                    obj(&[("peer", v_str(&peer.to_string())), ("error", v_str(&err.to_string()))]),
                );
            }
        });
    }
}

pub async fn serve(dash: Arc<Dashboard>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    let local = listener.local_addr().map(|a| a.to_string()).unwrap_or_else(|_| addr.to_string());
    logging::info(
        Domain::Server,
        "listening",
        obj(&[("msg", v_str(&format!("dashboard at http://{}", local))), ("addr", v_str(&local))]),
    );
    serve_listener(listener, dash).await
}
