//! Route dispatch logic for the admin API.

use crate::admin_api::handlers::{executions, expectations, scenarios, system};
use crate::admin_api::types::{collect_body, error_response, not_found};
use crate::admin_api::{AdminContext, ADMIN_PREFIX};
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use tracing::debug;

/// Parsed admin route, relative to the admin prefix
#[derive(Debug, PartialEq, Eq)]
enum AdminRoute<'a> {
    /// POST/GET/DELETE /expectations
    Expectations,
    /// DELETE /expectations/:id
    ExpectationById(&'a str),
    /// POST /reset
    Reset,
    /// PUT/GET/DELETE /scenarios
    Scenarios,
    /// PUT/POST/DELETE /executions
    Executions,
    /// GET /health
    Health,
}

impl<'a> AdminRoute<'a> {
    fn parse(path: &'a str) -> Option<Self> {
        let segments: Vec<&str> = path
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split('/')
            .collect();
        match segments.as_slice() {
            ["expectations"] => Some(AdminRoute::Expectations),
            ["expectations", id] if !id.is_empty() => Some(AdminRoute::ExpectationById(*id)),
            ["reset"] => Some(AdminRoute::Reset),
            ["scenarios"] => Some(AdminRoute::Scenarios),
            ["executions"] => Some(AdminRoute::Executions),
            ["health"] => Some(AdminRoute::Health),
            _ => None,
        }
    }
}

/// Whether `path` belongs to the admin API.
pub fn is_admin_path(path: &str) -> bool {
    path == ADMIN_PREFIX
        || path
            .strip_prefix(ADMIN_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Main request router
pub async fn route_request(
    req: Request<Incoming>,
    ctx: &AdminContext,
) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    debug!("Admin API: {} {}", method, path);

    let body = match collect_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e),
    };
    route_by_path(&method, &path, &body, ctx)
}

/// Route based on path
pub fn route_by_path(
    method: &Method,
    path: &str,
    body: &Bytes,
    ctx: &AdminContext,
) -> Response<Full<Bytes>> {
    let relative = path.strip_prefix(ADMIN_PREFIX).unwrap_or(path);
    let Some(route) = AdminRoute::parse(relative) else {
        return not_found();
    };

    match (route, method) {
        (AdminRoute::Expectations, &Method::POST) => expectations::handle_add(body, ctx),
        (AdminRoute::Expectations, &Method::GET) => expectations::handle_list(ctx),
        (AdminRoute::Expectations, &Method::DELETE) => expectations::handle_clear(ctx),
        (AdminRoute::ExpectationById(id), &Method::DELETE) => {
            expectations::handle_delete(id, ctx)
        }
        (AdminRoute::Reset, &Method::POST) => system::handle_reset(ctx),
        (AdminRoute::Scenarios, &Method::PUT) => scenarios::handle_set(body, ctx),
        (AdminRoute::Scenarios, &Method::GET) => scenarios::handle_list(ctx),
        (AdminRoute::Scenarios, &Method::DELETE) => scenarios::handle_clear(ctx),
        (AdminRoute::Executions, &Method::PUT) => executions::handle_search(body, ctx),
        (AdminRoute::Executions, &Method::POST) => executions::handle_count(body, ctx),
        (AdminRoute::Executions, &Method::DELETE) => executions::handle_clear(ctx),
        (AdminRoute::Health, &Method::GET) => system::handle_health(),
        _ => error_response(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed"),
    }
}
