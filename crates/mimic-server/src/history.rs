//! Request history.
//!
//! Every mock request is captured as a [`RecordedRequest`] on receipt, before
//! matching, and appended to the [`RequestHistoryStore`] in arrival order.

use crate::snapshot::{CowVec, Snapshot};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::{HeaderMap, Method, Uri};
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Immutable snapshot of an inbound request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Header names lowercased; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
    /// Body decoded as UTF-8 (lossy); empty when the request had none
    pub body: String,
    #[serde(skip)]
    pub raw_body: Bytes,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_from: Option<String>,
    /// `http` or `https`, depending on the listener that accepted the request
    #[serde(skip)]
    pub scheme: &'static str,
}

impl RecordedRequest {
    /// Minimal request with no headers and an empty body.
    pub fn new(method: &str, url: &str) -> Self {
        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (url.to_string(), None),
        };
        Self {
            method: method.to_uppercase(),
            path,
            query,
            headers: BTreeMap::new(),
            body: String::new(),
            raw_body: Bytes::new(),
            timestamp: Utc::now(),
            request_from: None,
            scheme: "http",
        }
    }

    /// Capture a request received by the server.
    pub fn from_parts(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        let mut header_map: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in headers {
            let value = String::from_utf8_lossy(value.as_bytes());
            header_map
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert_with(|| value.into_owned());
        }

        Self {
            method: method.as_str().to_string(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers: header_map,
            body: String::from_utf8_lossy(&body).into_owned(),
            raw_body: body,
            timestamp: Utc::now(),
            request_from: remote_addr.map(|addr| addr.to_string()),
            scheme: "http",
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_lowercase(), value.to_string());
        self
    }

    pub fn with_scheme(mut self, scheme: &'static str) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self.raw_body = Bytes::from(self.body.clone());
        self
    }

    /// Path plus `?query` when a query string is present.
    pub fn url(&self) -> String {
        match self.query.as_deref() {
            Some(query) if !query.is_empty() => format!("{}?{}", self.path, query),
            _ => self.path.clone(),
        }
    }

    /// Absolute URI as the client addressed it; falls back to [`url`](Self::url)
    /// when the request carried no `Host` header.
    pub fn full_uri(&self) -> String {
        match self.header("host") {
            Some(host) => format!("{}://{}{}", self.scheme, host, self.url()),
            None => self.url(),
        }
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    /// First value of query parameter `name`, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<String> {
        parse_pairs(self.query.as_deref().unwrap_or(""))
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Fields of an `application/x-www-form-urlencoded` body, in order.
    ///
    /// Any other content type yields no fields.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        let is_form = self.header("content-type").is_some_and(|ct| {
            ct.to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        });
        if is_form {
            parse_pairs(&self.body)
        } else {
            Vec::new()
        }
    }
}

fn parse_pairs(input: &str) -> Vec<(String, String)> {
    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_component(key), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Append-only log of received requests.
#[derive(Debug, Default)]
pub struct RequestHistoryStore {
    requests: CowVec<RecordedRequest>,
}

impl RequestHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, request: RecordedRequest) -> Arc<RecordedRequest> {
        let request = Arc::new(request);
        self.requests.push(Arc::clone(&request));
        request
    }

    /// All recorded requests in arrival order.
    pub fn list_all(&self) -> Snapshot<RecordedRequest> {
        self.requests.snapshot()
    }

    /// Recorded requests satisfying `predicate`, in arrival order.
    pub fn search(
        &self,
        predicate: impl Fn(&RecordedRequest) -> bool,
    ) -> Vec<Arc<RecordedRequest>> {
        self.list_all()
            .iter()
            .filter(|request| predicate(request))
            .cloned()
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&RecordedRequest) -> bool) -> usize {
        self.list_all()
            .iter()
            .filter(|request| predicate(request))
            .count()
    }

    pub fn clear(&self) {
        self.requests.clear();
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{HeaderValue, ACCEPT, CONTENT_TYPE};

    #[test]
    fn test_new_splits_path_and_query() {
        let request = RecordedRequest::new("get", "/search?q=a&page=2");
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/search");
        assert_eq!(request.query.as_deref(), Some("q=a&page=2"));
        assert_eq!(request.url(), "/search?q=a&page=2");
        assert_eq!(RecordedRequest::new("GET", "/x").url(), "/x");
    }

    #[test]
    fn test_from_parts_lowercases_and_joins_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.append(ACCEPT, HeaderValue::from_static("a/b"));
        headers.append(ACCEPT, HeaderValue::from_static("c/d"));
        let uri: Uri = "/items?id=3".parse().unwrap();

        let request = RecordedRequest::from_parts(
            &Method::PUT,
            &uri,
            &headers,
            Bytes::from_static(b"payload"),
            Some("127.0.0.1:5000".parse().unwrap()),
        );

        assert_eq!(request.method, "PUT");
        assert_eq!(request.url(), "/items?id=3");
        assert_eq!(request.header("Content-Type"), Some("text/plain"));
        assert_eq!(request.header("accept"), Some("a/b, c/d"));
        assert_eq!(request.body, "payload");
        assert_eq!(request.request_from.as_deref(), Some("127.0.0.1:5000"));
    }

    #[test]
    fn test_full_uri_uses_host_and_scheme() {
        let request =
            RecordedRequest::new("GET", "/items?id=3").with_header("Host", "mock.local:8086");
        assert_eq!(request.full_uri(), "http://mock.local:8086/items?id=3");
        assert_eq!(
            request.with_scheme("https").full_uri(),
            "https://mock.local:8086/items?id=3"
        );
        assert_eq!(RecordedRequest::new("GET", "/x").full_uri(), "/x");
    }

    #[test]
    fn test_query_param_is_decoded() {
        let request = RecordedRequest::new("GET", "/s?q=hello%20world&flag");
        assert_eq!(request.query_param("q").as_deref(), Some("hello world"));
        assert_eq!(request.query_param("flag").as_deref(), Some(""));
        assert_eq!(request.query_param("missing"), None);
    }

    #[test]
    fn test_form_fields_require_form_content_type() {
        let form = RecordedRequest::new("POST", "/")
            .with_header("Content-Type", "application/x-www-form-urlencoded; charset=utf-8")
            .with_body("name=Jo+Smith&city=Z%C3%BCrich");
        assert_eq!(
            form.form_fields(),
            vec![
                ("name".to_string(), "Jo Smith".to_string()),
                ("city".to_string(), "Zürich".to_string()),
            ]
        );

        let json = RecordedRequest::new("POST", "/")
            .with_header("Content-Type", "application/json")
            .with_body("name=Jo");
        assert!(json.form_fields().is_empty());
    }

    #[test]
    fn test_history_preserves_arrival_order() {
        let store = RequestHistoryStore::new();
        let r1 = store.record(RecordedRequest::new("GET", "/1"));
        let r2 = store.record(RecordedRequest::new("GET", "/2"));
        let r3 = store.record(RecordedRequest::new("GET", "/3"));

        let all: Vec<_> = store.list_all().iter().cloned().collect();
        assert_eq!(all, vec![r1, r2, r3]);
    }

    #[test]
    fn test_search_and_count() {
        let store = RequestHistoryStore::new();
        store.record(RecordedRequest::new("GET", "/a"));
        store.record(RecordedRequest::new("POST", "/a"));
        store.record(RecordedRequest::new("GET", "/b"));

        let gets = store.search(|r| r.method == "GET");
        assert_eq!(gets.len(), 2);
        assert_eq!(gets[0].path, "/a");
        assert_eq!(gets[1].path, "/b");
        assert_eq!(store.count(|r| r.path == "/a"), 2);
    }

    #[test]
    fn test_clear_empties_history() {
        let store = RequestHistoryStore::new();
        store.record(RecordedRequest::new("GET", "/"));
        let before = store.list_all();
        store.clear();
        assert!(store.is_empty());
        assert_eq!(before.len(), 1);
    }
}
