//! 请求上下文中间件与操作人解析

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use fm_telemetry::new_request_ids;
use tracing::{Instrument, info_span};

use crate::utils::response::bad_request_error;

/// 操作人 ID 请求头；缺省为 0（系统）
pub const ACTOR_HEADER: &str = "x-actor-id";

/// 请求上下文中间件：注入 request_id/trace_id
pub async fn request_context(mut req: Request<Body>, next: Next) -> Response {
    let ids = new_request_ids();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    req.extensions_mut().insert(ids.clone());

    let span = info_span!(
        "request",
        request_id = %ids.request_id,
        trace_id = %ids.trace_id,
        method = %method,
        path = %path
    );

    let mut response = next.run(req).instrument(span).await;
    response.headers_mut().insert(
        "x-request-id",
        HeaderValue::from_str(&ids.request_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response.headers_mut().insert(
        "x-trace-id",
        HeaderValue::from_str(&ids.trace_id).unwrap_or_else(|_| HeaderValue::from_static("")),
    );
    response
}

/// 从请求头读取操作人 ID
pub fn actor_id(headers: &HeaderMap) -> Result<i64, Response> {
    let Some(value) = headers.get(ACTOR_HEADER) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .ok_or_else(|| bad_request_error("x-actor-id must be an integer"))
}
