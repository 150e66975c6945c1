//! Scenario handlers.

use crate::admin_api::types::{json_response, ok, parse_body, ScenarioStateRequest};
use crate::admin_api::AdminContext;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::debug;

/// PUT /scenarios - Force a scenario into a state
pub fn handle_set(body: &Bytes, ctx: &AdminContext) -> Response<Full<Bytes>> {
    let request: ScenarioStateRequest = match parse_body(body, "scenario") {
        Ok(r) => r,
        Err(response) => return response,
    };
    debug!(
        "Scenario '{}' set to '{}'",
        request.scenario_name, request.scenario_state
    );
    ctx.state
        .set_scenario_state(request.scenario_name, request.scenario_state);
    ok()
}

/// GET /scenarios
pub fn handle_list(ctx: &AdminContext) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &ctx.state.scenarios().snapshot())
}

/// DELETE /scenarios
pub fn handle_clear(ctx: &AdminContext) -> Response<Full<Bytes>> {
    ctx.state.clear_scenarios();
    ok()
}
