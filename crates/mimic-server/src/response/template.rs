//! Response templating.
//!
//! Static response bodies and header values may reference the request:
//!
//! - `${request.method}`, `${request.path}`, `${request.url}`, `${request.body}`
//! - `${request.query.<name>}` - query parameter value
//! - `${request.headers.<name>}` - header value (case-insensitive)
//! - `${url.N}` / `${body.N}` - capture group N of the expectation's
//!   `matches` condition on the url / body
//!
//! Unknown variables are replaced with the empty string.

use crate::history::RecordedRequest;
use crate::predicate::RequestPredicate;
use regex::Regex;
use std::sync::OnceLock;

static TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_template_regex() -> &'static Regex {
    TEMPLATE_REGEX.get_or_init(|| {
        Regex::new(
            r"\$\{(request\.[a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z0-9_-]+)?|(?:url|body)\.\d+)\}",
        )
        .unwrap()
    })
}

/// Values available to a template.
#[derive(Debug)]
pub struct TemplateContext<'a> {
    request: &'a RecordedRequest,
    url_captures: Vec<String>,
    body_captures: Vec<String>,
}

impl<'a> TemplateContext<'a> {
    pub fn new(request: &'a RecordedRequest, predicate: &RequestPredicate) -> Self {
        Self {
            request,
            url_captures: predicate.url_captures(request),
            body_captures: predicate.body_captures(request),
        }
    }

    /// Resolve a variable path such as `request.query.id` or `url.1`.
    pub fn get(&self, path: &str) -> Option<String> {
        let parts: Vec<&str> = path.splitn(3, '.').collect();

        match parts.as_slice() {
            ["request", "method"] => Some(self.request.method.clone()),
            ["request", "path"] => Some(self.request.path.clone()),
            ["request", "url"] => Some(self.request.url()),
            ["request", "body"] => Some(self.request.body.clone()),
            ["request", "query", name] => self.request.query_param(name),
            ["request", "headers", name] => self.request.header(name).map(str::to_string),
            ["url", index] => capture(&self.url_captures, index),
            ["body", index] => capture(&self.body_captures, index),
            _ => None,
        }
    }
}

fn capture(captures: &[String], index: &str) -> Option<String> {
    index
        .parse::<usize>()
        .ok()
        .and_then(|i| captures.get(i).cloned())
}

/// Substitute every template variable in `template`.
pub fn process_template(template: &str, context: &TemplateContext<'_>) -> String {
    if !has_template_variables(template) {
        return template.to_string();
    }
    get_template_regex()
        .replace_all(template, |caps: &regex::Captures| {
            context.get(&caps[1]).unwrap_or_default()
        })
        .to_string()
}

pub fn has_template_variables(s: &str) -> bool {
    get_template_regex().is_match(s)
}
