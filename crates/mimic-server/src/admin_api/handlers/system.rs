//! System handlers: health and reset.

use crate::admin_api::types::{json_response, ok};
use crate::admin_api::AdminContext;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

/// GET /health - Health check
pub fn handle_health() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({"status": "ok"}))
}

/// POST /reset - Restore pre-defined expectations and clear scenarios and history
pub fn handle_reset(ctx: &AdminContext) -> Response<Full<Bytes>> {
    ctx.state.reset(&ctx.backup);
    ok()
}
