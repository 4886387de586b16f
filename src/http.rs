use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use tracing::{error, info};

use crate::document;
use crate::probe::MetricsSource;
use crate::snapshot;

pub fn build_router<S>(source: Arc<S>) -> Router
where
    S: MetricsSource + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(snapshot_handler::<S>))
        .route("/healthz", get(healthz))
        .with_state(source)
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn snapshot_handler<S>(State(source): State<Arc<S>>) -> Response
where
    S: MetricsSource + Send + Sync + 'static,
{
    let started = Instant::now();
    // A build is a synchronous pass over every metric category; keep it off
    // the async workers.
    let built = tokio::task::spawn_blocking(move || {
        snapshot::build(source.as_ref()).map(|node| document::emit(&node))
    })
    .await;

    match built {
        Ok(Ok(body)) => {
            info!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                bytes = body.len(),
                "snapshot served"
            );
            let mut response = Response::new(Body::from(body));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Ok(Err(err)) => {
            error!(error = %err, "snapshot build failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "snapshot build failed").into_response()
        }
        Err(err) => {
            error!(error = %err, "snapshot task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "snapshot build failed").into_response()
        }
    }
}
