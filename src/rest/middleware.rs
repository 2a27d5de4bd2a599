// SPDX-License-Identifier: MIT
//! Request-id assignment: accepts a client-supplied id, otherwise mints one,
//! binds it to the request for handlers/error bodies, and echoes it back on
//! every response.

use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use tracing::info;
use uuid::Uuid;

pub static REQUEST_ID_HEADER: Lazy<HeaderName> = Lazy::new(|| HeaderName::from_static("x-request-id"));

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&*REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));
    info!(request_id = %id, method = %req.method(), path = %req.uri().path(), "request");

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(&*REQUEST_ID_HEADER, value);
    }
    response
}
