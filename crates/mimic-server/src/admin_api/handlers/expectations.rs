//! Expectation management handlers.

use crate::admin_api::types::{
    error_response, json_response, not_found, ok, parse_body, CreatedResponse,
};
use crate::admin_api::AdminContext;
use crate::expectation::{Expectation, ExpectationDefinition, ExpectationId};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

/// POST /expectations - Validate and add an expectation
pub fn handle_add(body: &Bytes, ctx: &AdminContext) -> Response<Full<Bytes>> {
    let definition: ExpectationDefinition = match parse_body(body, "expectation") {
        Ok(d) => d,
        Err(response) => return response,
    };

    let expectation = match Expectation::try_from(definition) {
        Ok(e) => e,
        Err(e) => {
            warn!("Rejected expectation: {}", e);
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
    };

    let id = ctx.state.add_expectation(expectation);
    debug!(expectation_id = %id, "Expectation added");
    json_response(StatusCode::CREATED, &CreatedResponse { id })
}

/// GET /expectations - List expectations in insertion order
pub fn handle_list(ctx: &AdminContext) -> Response<Full<Bytes>> {
    let definitions: Vec<ExpectationDefinition> = ctx
        .state
        .expectations()
        .list()
        .iter()
        .map(|e| e.to_definition())
        .collect();
    json_response(StatusCode::OK, &definitions)
}

/// DELETE /expectations - Remove every expectation
pub fn handle_clear(ctx: &AdminContext) -> Response<Full<Bytes>> {
    ctx.state.clear_expectations();
    debug!("Expectations cleared");
    ok()
}

/// DELETE /expectations/:id - Remove one expectation
pub fn handle_delete(id: &str, ctx: &AdminContext) -> Response<Full<Bytes>> {
    let Ok(id) = id.parse::<ExpectationId>() else {
        return not_found();
    };
    if ctx.state.remove_expectation(id) {
        debug!(expectation_id = %id, "Expectation removed");
        ok()
    } else {
        not_found()
    }
}
