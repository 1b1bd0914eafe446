//! Status page endpoint handler.
//!
//! Renders process identity, memory counters and the cached process listing
//! as a small HTML document.

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::fmt::Write as FmtWrite;
use tracing::{debug, instrument};

use crate::cache::StatusSnapshot;
use crate::identity::Identity;
use crate::state::SharedState;

pub const FAVICON_PATH: &str = "/favicon.ico";

/// Handler for every GET path.
#[instrument(skip(state))]
pub async fn status_handler(State(state): State<SharedState>, uri: Uri) -> Response {
    if uri.path() == FAVICON_PATH {
        return StatusCode::NOT_FOUND.into_response();
    }

    debug!("Processing status page request");
    let snapshot = state.cache.refresh_if_stale().await;
    let page = render_status_page(state.config.title(), &state.identity, &snapshot);

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html")],
        page,
    )
        .into_response()
}

/// Renders the status page for one snapshot.
pub fn render_status_page(title: &str, identity: &Identity, snapshot: &StatusSnapshot) -> String {
    let title = escape_html(title);
    let mem = &snapshot.memory;
    let mut out = String::with_capacity(snapshot.listing.len() + 1024);

    write!(
        out,
        r#"<!DOCTYPE html>
<html>
  <head><title>{title}</title></head>
  <body>
    <h1>{title}</h1>
    <p>{exe} compiled with {version}</p>
    <p>{pid} started at {started} as {user}<br/>
    Allocated: {alloc:.3}Mb (Sys: {sys:.3}Mb)<br/>
    Peak: {peak:.3}Mb, Data: {data:.3}Mb, Threads: {threads}</p>

    <h2>Top</h2>
    <p>Collected at {collected}</p>
    <pre>    "#,
        exe = escape_html(&identity.executable),
        version = escape_html(&snapshot.runtime_version),
        pid = identity.pid,
        started = identity.started_at,
        user = escape_html(&identity.user),
        alloc = mem.allocated_mb(),
        sys = mem.sys_mb(),
        peak = mem.peak_allocated_mb(),
        data = mem.data_mb(),
        threads = mem.threads,
        collected = snapshot.collected_at,
    )
    .ok();

    out.push_str(&escape_html(&snapshot.listing));
    out.push_str("</pre></body></html>");
    out
}

/// Escapes the characters that would otherwise be parsed as markup.
fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
