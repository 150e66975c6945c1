//! Request/response bodies and response helpers for the admin API.

use crate::expectation::ExpectationId;
use crate::predicate::RequestConditions;
use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};

/// Error envelope shared by every admin error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Returned by `POST /expectations`
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: ExpectationId,
}

/// Returned by `POST /executions`
#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Body of `PUT /scenarios`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScenarioStateRequest {
    pub scenario_name: String,
    pub scenario_state: String,
}

/// Body of `PUT /executions` and `POST /executions`; empty matches everything
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionsQuery {
    #[serde(default)]
    pub request: RequestConditions,
}

/// Pretty-printed JSON body with `application/json` content type.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec_pretty(body).unwrap_or_else(|_| b"{}".to_vec());
    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// `{"errors": [{"code": "<status>", "message": ...}]}`
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: status.as_str().to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

pub fn not_found() -> Response<Full<Bytes>> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

pub fn ok() -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, &serde_json::json!({}))
}

/// Parse a JSON request body, mapping failures to a 400 response.
pub fn parse_body<T: serde::de::DeserializeOwned>(
    body: &Bytes,
    what: &str,
) -> Result<T, Response<Full<Bytes>>> {
    serde_json::from_slice(body).map_err(|e| {
        error_response(StatusCode::BAD_REQUEST, &format!("Invalid {what} JSON: {e}"))
    })
}

/// Read the whole request body.
pub async fn collect_body(req: Request<Incoming>) -> Result<Bytes, String> {
    use http_body_util::BodyExt;
    req.collect()
        .await
        .map(|c| c.to_bytes())
        .map_err(|e| format!("Failed to read request body: {e}"))
}
