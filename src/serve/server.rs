// src/serve/server.rs

//! Minimal HTTP/1.1 static server over the output root.
//!
//! One request per connection (`Connection: close`), `GET` and `HEAD` only.
//! HTML pages get a reload script injected; the script listens on
//! [`RELOAD_PATH`], a `text/event-stream` fed by the [`LiveReload`] hub.

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::errors::Result;
use crate::serve::LiveReload;

/// Event-stream endpoint the injected script connects to.
pub const RELOAD_PATH: &str = "/__sitepipe/reload";

const MAX_HEADER_LINES: usize = 100;
const MAX_LINE_BYTES: u64 = 8 * 1024;

const RELOAD_SCRIPT: &str = concat!(
    "<script>(function(){",
    "var es=new EventSource('/__sitepipe/reload');",
    "es.onmessage=function(){location.reload();};",
    "})();</script>"
);

/// Running server. Dropping the handle stops it.
#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Bind `addr` and serve `root` in the background.
pub async fn spawn_server(addr: SocketAddr, root: PathBuf, hub: LiveReload) -> Result<ServerHandle> {
    let listener = TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    info!(%addr, root = ?root, "live reload server listening on http://{addr}");

    let root = Arc::new(root);
    let task = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let root = Arc::clone(&root);
                    let hub = hub.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, &root, &hub).await {
                            trace!(%peer, error = %err, "connection ended with error");
                        }
                    });
                }
                Err(err) => warn!(error = %err, "failed to accept connection"),
            }
        }
    });

    Ok(ServerHandle { addr, task })
}

async fn handle_connection(stream: TcpStream, root: &Path, hub: &LiveReload) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let mut request_line = String::new();
    match read_bounded_line(&mut reader, &mut request_line).await? {
        Some(0) => return Ok(()),
        Some(_) => {}
        None => {
            return write_response(&mut writer, "414 URI Too Long", "text/plain", b"request line too long\n", false)
                .await;
        }
    }

    // Headers carry nothing we need; drain them.
    for _ in 0..MAX_HEADER_LINES {
        let mut line = String::new();
        match read_bounded_line(&mut reader, &mut line).await? {
            Some(0) => break,
            Some(_) if line.trim().is_empty() => break,
            Some(_) => {}
            None => {
                return write_response(
                    &mut writer,
                    "431 Request Header Fields Too Large",
                    "text/plain",
                    b"header too long\n",
                    false,
                )
                .await;
            }
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default();
    let target = parts.next().unwrap_or("/");
    let path = target.split(['?', '#']).next().unwrap_or("/");
    debug!(%method, %path, "request");

    let head_only = match method {
        "GET" => false,
        "HEAD" => true,
        _ => {
            return write_response(&mut writer, "405 Method Not Allowed", "text/plain", b"method not allowed\n", false)
                .await;
        }
    };

    if path == RELOAD_PATH {
        return stream_reloads(&mut writer, hub, head_only).await;
    }

    let Some(file) = resolve(root, path).await else {
        return write_response(&mut writer, "404 Not Found", "text/plain", b"not found\n", head_only).await;
    };

    let body = match tokio::fs::read(&file).await {
        Ok(body) => body,
        Err(_) => {
            return write_response(&mut writer, "404 Not Found", "text/plain", b"not found\n", head_only).await;
        }
    };

    let content_type = content_type_for(&file);
    let body = if content_type.starts_with("text/html") {
        inject_reload_script(&body)
    } else {
        body
    };

    write_response(&mut writer, "200 OK", content_type, &body, head_only).await
}

/// Read one line of at most `MAX_LINE_BYTES`; `None` if it is longer.
async fn read_bounded_line<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    line: &mut String,
) -> std::io::Result<Option<usize>> {
    let n = (&mut *reader).take(MAX_LINE_BYTES).read_line(line).await?;
    if n as u64 == MAX_LINE_BYTES && !line.ends_with('\n') {
        return Ok(None);
    }
    Ok(Some(n))
}

async fn stream_reloads<W: AsyncWriteExt + Unpin>(writer: &mut W, hub: &LiveReload, head_only: bool) -> std::io::Result<()> {
    let mut rx = hub.subscribe();
    writer
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n",
        )
        .await?;
    if head_only {
        return writer.flush().await;
    }
    writer.write_all(b": connected\n\n").await?;
    writer.flush().await?;

    loop {
        match rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {
                writer.write_all(b"data: reload\n\n").await?;
                writer.flush().await?;
            }
            Err(RecvError::Closed) => return Ok(()),
        }
    }
}

async fn write_response<W: AsyncWriteExt + Unpin>(
    writer: &mut W,
    status: &str,
    content_type: &str,
    body: &[u8],
    head_only: bool,
) -> std::io::Result<()> {
    let header = format!(
        "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nCache-Control: no-cache\r\nConnection: close\r\n\r\n",
        body.len()
    );
    writer.write_all(header.as_bytes()).await?;
    if !head_only {
        writer.write_all(body).await?;
    }
    writer.flush().await?;
    writer.shutdown().await
}

/// Map a request path onto a file under `root`.
///
/// Any `..` segment (or anything else that is not a plain name) rejects the
/// request. Directories resolve to their `index.html`.
async fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode(request_path)?;
    let mut path = root.to_path_buf();
    for segment in decoded.split('/').filter(|s| !s.is_empty()) {
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => path.push(name),
            _ => return None,
        }
    }

    let meta = tokio::fs::metadata(&path).await.ok()?;
    if meta.is_dir() {
        path.push("index.html");
    }
    Some(path)
}

fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input.get(i + 1..i + 3)?;
            out.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Insert the reload script before the last `</body>`, or append it.
fn inject_reload_script(body: &[u8]) -> Vec<u8> {
    let Ok(text) = std::str::from_utf8(body) else {
        return body.to_vec();
    };

    match text.to_ascii_lowercase().rfind("</body>") {
        Some(idx) => {
            let mut out = String::with_capacity(text.len() + RELOAD_SCRIPT.len());
            out.push_str(&text[..idx]);
            out.push_str(RELOAD_SCRIPT);
            out.push_str(&text[idx..]);
            out.into_bytes()
        }
        None => {
            let mut out = text.to_string();
            out.push_str(RELOAD_SCRIPT);
            out.into_bytes()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        let page = b"<html><body><p>hi</p></body></html>";
        let out = String::from_utf8(inject_reload_script(page)).unwrap();
        let script_at = out.find("<script>").unwrap();
        let body_at = out.find("</body>").unwrap();
        assert!(script_at < body_at);
        assert!(out.contains(RELOAD_PATH));
    }

    #[test]
    fn script_is_appended_without_body_tag() {
        let out = String::from_utf8(inject_reload_script(b"<p>fragment</p>")).unwrap();
        assert!(out.starts_with("<p>fragment</p><script>"));
    }

    #[tokio::test]
    async fn overlong_lines_are_cut_off() {
        let long = vec![b'a'; MAX_LINE_BYTES as usize * 4];
        let mut reader = BufReader::new(&long[..]);
        let mut line = String::new();
        assert_eq!(read_bounded_line(&mut reader, &mut line).await.unwrap(), None);
        assert_eq!(line.len(), MAX_LINE_BYTES as usize);
    }

    #[tokio::test]
    async fn normal_lines_pass_through() {
        let mut reader = BufReader::new(&b"GET / HTTP/1.1\r\nHost: x\r\n"[..]);
        let mut line = String::new();
        assert_eq!(read_bounded_line(&mut reader, &mut line).await.unwrap(), Some(16));
        assert_eq!(line, "GET / HTTP/1.1\r\n");

        line.clear();
        read_bounded_line(&mut reader, &mut line).await.unwrap();
        assert_eq!(line, "Host: x\r\n");
    }

    #[test]
    fn percent_decoding() {
        assert_eq!(percent_decode("/a%20b.html").as_deref(), Some("/a b.html"));
        assert_eq!(percent_decode("/bad%2").as_deref(), None);
    }

    #[test]
    fn content_types_by_extension() {
        assert_eq!(content_type_for(Path::new("x.CSS")), "text/css; charset=utf-8");
        assert_eq!(content_type_for(Path::new("x.unknown")), "application/octet-stream");
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(resolve(dir.path(), "/../etc/passwd").await, None);
        assert_eq!(resolve(dir.path(), "/%2e%2e/etc/passwd").await, None);
    }

    #[tokio::test]
    async fn directories_resolve_to_index() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("docs")).unwrap();
        assert_eq!(
            resolve(dir.path(), "/docs/").await,
            Some(dir.path().join("docs").join("index.html"))
        );
    }
}
