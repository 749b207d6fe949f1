// src/serve/server.rs

use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use percent_encoding::percent_decode_str;
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::serve::LiveReload;

/// How long a live-reload poll is held open before returning unchanged.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(25);

const CLIENT_PATH: &str = "/__livereload.js";
const POLL_PATH: &str = "/__livereload";

const CLIENT_SCRIPT: &str = r#"(function () {
  var since = null;
  function poll() {
    var url = "/__livereload" + (since === null ? "" : "?since=" + since);
    fetch(url, { cache: "no-store" })
      .then(function (r) { return r.text(); })
      .then(function (text) {
        var generation = parseInt(text, 10);
        if (since !== null && generation > since) { location.reload(); return; }
        since = generation;
        poll();
      })
      .catch(function () { setTimeout(poll, 1000); });
  }
  poll();
})();
"#;

#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub base_dir: PathBuf,
    pub live_reload: bool,
}

#[derive(Clone)]
struct ServerState {
    options: ServerOptions,
    reload: LiveReload,
}

#[derive(Debug, Deserialize)]
struct PollParams {
    since: Option<u64>,
}

/// Build the dev server router.
pub fn router(options: ServerOptions, reload: LiveReload) -> Router {
    let state = ServerState { options, reload };
    Router::new()
        .route(POLL_PATH, get(poll_reload))
        .route(CLIENT_PATH, get(client_script))
        .fallback(serve_file)
        .with_state(state)
}

/// Bind `port` on localhost and serve in the background.
pub async fn spawn_server(
    port: u16,
    options: ServerOptions,
    reload: LiveReload,
) -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    let addr = listener.local_addr()?;
    let app = router(options.clone(), reload);

    info!(%addr, base_dir = ?options.base_dir, "dev server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("dev server exited: {e:#}");
        }
    });

    Ok(addr)
}

async fn poll_reload(State(state): State<ServerState>, Query(params): Query<PollParams>) -> String {
    let generation = match params.since {
        // First poll: report where we are without waiting.
        None => state.reload.generation(),
        Some(since) => state.reload.wait_past(since, POLL_TIMEOUT).await,
    };
    generation.to_string()
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/javascript"))],
        CLIENT_SCRIPT,
    )
}

async fn serve_file(State(state): State<ServerState>, uri: Uri) -> Response {
    let Some(path) = resolve_path(&state.options.base_dir, uri.path()).await else {
        return (StatusCode::NOT_FOUND, "not found").into_response();
    };

    let bytes = match tokio::fs::read(&path).await {
        Ok(b) => b,
        Err(_) => return (StatusCode::NOT_FOUND, "not found").into_response(),
    };
    debug!(path = ?path, bytes = bytes.len(), "serving file");

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let is_html = mime.essence_str() == "text/html";
    let body = if is_html && state.options.live_reload {
        inject_client(bytes)
    } else {
        bytes
    };

    let content_type = HeaderValue::from_str(mime.as_ref())
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
        ],
        body,
    )
        .into_response()
}

/// Map a request path onto a file under `base_dir`.
///
/// - The path is percent-decoded first.
/// - `/` and directories resolve to their `index.html`.
/// - Extension-less paths fall back to `<path>.html`.
/// - Any `..` component is refused.
pub async fn resolve_path(base_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;
    let rel = Path::new(decoded.trim_start_matches('/'));
    if rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return None;
    }

    let candidate = base_dir.join(rel);
    if is_dir(&candidate).await {
        let index = candidate.join("index.html");
        return is_file(&index).await.then_some(index);
    }
    if is_file(&candidate).await {
        return Some(candidate);
    }
    if candidate.extension().is_none() {
        let html = candidate.with_extension("html");
        return is_file(&html).await.then_some(html);
    }
    None
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_dir())
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok_and(|m| m.is_file())
}

fn inject_client(bytes: Vec<u8>) -> Vec<u8> {
    let tag = format!("<script src=\"{CLIENT_PATH}\"></script>");
    let mut html = match String::from_utf8(bytes) {
        Ok(html) => html,
        Err(e) => return e.into_bytes(),
    };
    match html.rfind("</body>") {
        Some(idx) => html.insert_str(idx, &tag),
        None => html.push_str(&tag),
    }
    html.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_index_and_pretty_urls() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "i").unwrap();
        std::fs::write(dir.path().join("about.html"), "a").unwrap();
        std::fs::create_dir(dir.path().join("blog")).unwrap();
        std::fs::write(dir.path().join("blog/index.html"), "b").unwrap();

        let base = dir.path();
        assert_eq!(resolve_path(base, "/").await, Some(base.join("index.html")));
        assert_eq!(resolve_path(base, "/about").await, Some(base.join("about.html")));
        assert_eq!(resolve_path(base, "/blog/").await, Some(base.join("blog/index.html")));
        assert_eq!(resolve_path(base, "/missing.css").await, None);
        assert_eq!(resolve_path(base, "/../etc/passwd").await, None);
    }

    #[tokio::test]
    async fn request_paths_are_percent_decoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my page.html"), "p").unwrap();

        let base = dir.path();
        assert_eq!(resolve_path(base, "/my%20page.html").await, Some(base.join("my page.html")));
        assert_eq!(resolve_path(base, "/my%20page").await, Some(base.join("my page.html")));
        assert_eq!(resolve_path(base, "/%2e%2e/etc/passwd").await, None);
    }

    #[test]
    fn client_is_injected_before_body_end() {
        let out = inject_client(b"<html><body><p>x</p></body></html>".to_vec());
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<html><body><p>x</p><script src=\"/__livereload.js\"></script></body></html>"
        );
    }
}
