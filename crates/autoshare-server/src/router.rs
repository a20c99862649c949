//! Request routing for the file server.
//!
//! Files are served by `tower_http`'s `ServeDir` (content types, ranges,
//! conditional requests, slash redirects for directories). A middleware in
//! front of it enforces path containment and decides what a directory without
//! `index.html` turns into: a 403 or a generated listing.

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::{listing, path};

/// Read-only state shared by every request
#[derive(Debug)]
struct ServeState {
    root: PathBuf,
    directory_listing: bool,
}

/// Build the router serving `root`
pub fn build_router(root: PathBuf, directory_listing: bool) -> Router {
    let serve_dir = ServeDir::new(&root).append_index_html_on_directories(true);
    let state = Arc::new(ServeState {
        root,
        directory_listing,
    });

    Router::new()
        .fallback_service(serve_dir)
        .layer(middleware::from_fn_with_state(state, directory_guard))
        // Outside the guard so its own responses get the header too
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Containment check plus directory handling.
async fn directory_guard(
    State(state): State<Arc<ServeState>>,
    request: Request,
    next: Next,
) -> Response {
    let request_path = request.uri().path().to_string();

    let Some(fs_path) = path::resolve(&state.root, &request_path) else {
        tracing::warn!(path = %request_path, "Rejected path outside the served directory");
        return (StatusCode::NOT_FOUND, "File not found").into_response();
    };

    let is_dir = tokio::fs::metadata(&fs_path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false);

    // Files, missing paths, slash redirects and index.html go to ServeDir
    if !is_dir || !request_path.ends_with('/') {
        return next.run(request).await;
    }
    if tokio::fs::metadata(fs_path.join("index.html"))
        .await
        .is_ok_and(|m| m.is_file())
    {
        return next.run(request).await;
    }

    if !state.directory_listing {
        return (StatusCode::FORBIDDEN, "Directory listing forbidden").into_response();
    }

    match listing::read_entries(&fs_path).await {
        Ok(entries) => {
            let display_path = urlencoding::decode(&request_path)
                .map(|p| p.into_owned())
                .unwrap_or(request_path);
            Html(listing::render(&display_path, &entries)).into_response()
        }
        Err(e) => {
            tracing::warn!(path = %fs_path.display(), error = %e, "Failed to list directory");
            (StatusCode::NOT_FOUND, "No permission to list directory").into_response()
        }
    }
}
