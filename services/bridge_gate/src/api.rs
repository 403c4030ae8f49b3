//! HTTP transport. Every request, including the ones rejected before a
//! bridge runs, is answered with an encoded `JobResult` from one
//! finalize step that also logs and records metrics.

use crate::{execute, Server};
use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bridge_config::MAX_BODY_BYTES;
use bridge_core::{BridgeError, JobResult};
use metrics::{counter, histogram};
use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::{error, info};

const FALLBACK_BODY: &[u8] =
    br#"{"jobRunId":"","status":"errored","error":"failed to encode response","pending":false,"data":{}}"#;

pub fn router(server: Arc<Server>) -> Router {
    for (path, bridge) in server.routes() {
        info!(path, bridge = %bridge.opts().name, "registering bridge");
    }
    Router::new()
        .fallback(handle)
        .with_state(server)
        .layer(CatchPanicLayer::custom(panic_response))
}

async fn handle(
    State(server): State<Arc<Server>>,
    peer: Option<ConnectInfo<SocketAddr>>,
    method: Method,
    uri: Uri,
    body: Body,
) -> Response {
    let start = Instant::now();
    let path = uri.path();
    let mut result = JobResult::default();
    let code = dispatch(&server, &method, path, body, &mut result).await;

    let route = if server.lookup(path).is_some() {
        path
    } else {
        "unmatched"
    };
    let client_ip = peer.map(|ConnectInfo(addr)| addr.to_string()).unwrap_or_default();
    let latency = start.elapsed();
    info!(
        method = %method,
        code = code.as_u16(),
        path,
        client_ip = %client_ip,
        latency = ?latency,
        "bridge request"
    );
    counter!(
        "bridge_requests_total",
        "path" => route.to_string(),
        "code" => code.as_u16().to_string()
    )
    .increment(1);
    histogram!("bridge_request_duration_seconds", "path" => route.to_string())
        .record(latency.as_secs_f64());

    encode(code, &result)
}

async fn dispatch(
    server: &Server,
    method: &Method,
    path: &str,
    body: Body,
    result: &mut JobResult,
) -> StatusCode {
    if *method != Method::POST {
        result.set_errored("Invalid request");
        return StatusCode::BAD_REQUEST;
    }
    let bytes = match to_bytes(body, *MAX_BODY_BYTES).await {
        Ok(b) => b,
        Err(e) => {
            result.set_errored(e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    match serde_json::from_slice::<JobResult>(&bytes) {
        Ok(decoded) => *result = decoded,
        Err(e) => {
            result.set_errored(BridgeError::Parse(e.to_string()));
            return StatusCode::BAD_REQUEST;
        }
    }
    result.set_job_run_id();

    let Some(bridge) = server.lookup(path) else {
        result.set_errored(BridgeError::Routing);
        return StatusCode::BAD_REQUEST;
    };
    execute(bridge.as_ref(), result).await;
    if result.is_completed() {
        StatusCode::OK
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn encode(code: StatusCode, result: &JobResult) -> Response {
    let body = serde_json::to_vec(result).unwrap_or_else(|e| {
        error!(error = %e, "failed to encode response");
        FALLBACK_BODY.to_vec()
    });
    (code, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(%detail, "bridge panicked");
    let mut result = JobResult::default();
    result.set_errored(format!("bridge panicked: {detail}"));
    encode(StatusCode::INTERNAL_SERVER_ERROR, &result)
}
