//! Request history handlers.

use crate::admin_api::types::{
    error_response, json_response, ok, parse_body, CountResponse, ExecutionsQuery,
};
use crate::admin_api::AdminContext;
use crate::history::RecordedRequest;
use crate::predicate::RequestPredicate;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

fn compile_query(body: &Bytes) -> Result<RequestPredicate, Response<Full<Bytes>>> {
    let query: ExecutionsQuery = if body.is_empty() {
        ExecutionsQuery::default()
    } else {
        parse_body(body, "executions query")?
    };
    RequestPredicate::compile(&query.request)
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, &e.to_string()))
}

/// PUT /executions - Recorded requests matching the query, in arrival order
pub fn handle_search(body: &Bytes, ctx: &AdminContext) -> Response<Full<Bytes>> {
    let predicate = match compile_query(body) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let found = ctx.state.history().search(|r| predicate.matches(r));
    let found: Vec<&RecordedRequest> = found.iter().map(AsRef::as_ref).collect();
    json_response(StatusCode::OK, &found)
}

/// POST /executions - Number of recorded requests matching the query
pub fn handle_count(body: &Bytes, ctx: &AdminContext) -> Response<Full<Bytes>> {
    let predicate = match compile_query(body) {
        Ok(p) => p,
        Err(response) => return response,
    };
    let count = ctx.state.history().count(|r| predicate.matches(r));
    json_response(StatusCode::OK, &CountResponse { count })
}

/// DELETE /executions - Forget every recorded request
pub fn handle_clear(ctx: &AdminContext) -> Response<Full<Bytes>> {
    ctx.state.clear_history();
    ok()
}
