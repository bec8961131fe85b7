use axum::{
    body::Body,
    http::{Request, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::Span;

use super::identity::SANDBOX_ID_HEADER;

pub async fn enrich_current_span_middleware(req: Request<Body>, next: Next) -> Response {
    let uri: &Uri = req.uri();

    let host = req
        .headers()
        .get("host")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("UNKNOWN");

    let current_span = Span::current();

    current_span.record("http.uri", uri.path());
    current_span.record("http.host", host);
    if let Some(query) = uri.query() {
        current_span.record("http.query", query);
    }
    if let Some(sandbox) = req
        .headers()
        .get(SANDBOX_ID_HEADER)
        .and_then(|h| h.to_str().ok())
    {
        current_span.record("sandbox_id", sandbox);
    }

    next.run(req).await
}

pub async fn strip_trailing_slash(req: Request<Body>, next: Next) -> Response {
    let path = req.uri().path();

    if path.len() > 1 && path.ends_with('/') {
        let stripped = path.trim_end_matches('/');
        let target = match req.uri().query() {
            Some(query) => format!("{stripped}?{query}"),
            None => stripped.to_string(),
        };
        return Redirect::permanent(&target).into_response();
    }

    next.run(req).await
}
