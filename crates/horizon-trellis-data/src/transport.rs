//! The transport request contract.
//!
//! Collections never talk to a network stack directly; they describe what
//! to fetch with a [`TransportRequest`] and hand it to a [`Transport`]
//! implementation along with a completion callback. Tests plug in fake
//! transports that complete synchronously or on demand.
//!
//! URL templates carry `{name}` placeholders resolved from the request's
//! parameter map at fetch time; a placeholder with no matching parameter
//! is a configuration error.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DataError, Result};

/// HTTP request methods.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// HTTP GET method.
    #[default]
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// How the response body should be interpreted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseFormat {
    /// Raw HTML fragment.
    Html,
    /// XML document.
    Xml,
    /// JSON document.
    #[default]
    Json,
}

/// A description of what to fetch: URL template, method, parameters.
#[derive(Clone, Debug, Default)]
pub struct TransportRequest {
    method: HttpMethod,
    url_template: String,
    params: HashMap<String, String>,
    format: ResponseFormat,
    synchronous: bool,
}

impl TransportRequest {
    /// A GET request for `url_template`.
    pub fn get(url_template: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url_template)
    }

    /// A request with an explicit method.
    pub fn new(method: HttpMethod, url_template: impl Into<String>) -> Self {
        Self {
            method,
            url_template: url_template.into(),
            params: HashMap::new(),
            format: ResponseFormat::default(),
            synchronous: false,
        }
    }

    /// Bind a template parameter.
    pub fn param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.params.insert(name.into(), value.to_string());
        self
    }

    /// Override the expected response format.
    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Ask the transport to complete before `fetch` returns.
    pub fn synchronous(mut self) -> Self {
        self.synchronous = true;
        self
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub fn response_format(&self) -> ResponseFormat {
        self.format
    }

    pub fn is_synchronous(&self) -> bool {
        self.synchronous
    }

    /// Resolve `{name}` placeholders and validate the result as a URL.
    pub fn resolve_url(&self) -> Result<Url> {
        let mut resolved = String::with_capacity(self.url_template.len());
        let mut rest = self.url_template.as_str();

        while let Some(open) = rest.find('{') {
            resolved.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                resolved.push_str(&rest[open..]);
                rest = "";
                break;
            };
            let name = &after[..close];
            match self.params.get(name) {
                Some(value) => resolved.push_str(value),
                None => {
                    return Err(DataError::UnresolvedPlaceholder {
                        name: name.to_string(),
                        template: self.url_template.clone(),
                    });
                }
            }
            rest = &after[close + 1..];
        }
        resolved.push_str(rest);

        Url::parse(&resolved).map_err(|e| DataError::InvalidUrl {
            url: resolved,
            reason: e.to_string(),
        })
    }
}

/// Cooperative cancellation flag shared between a collection and its
/// transport.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Transports poll this between steps.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Completion callback; invoked exactly once per fetch.
pub type FetchCallback = Box<dyn FnOnce(Result<serde_json::Value>) + Send>;

/// Fetches a request and delivers the decoded payload to a callback.
///
/// Implementations must never panic across the callback boundary; all
/// failures are delivered as `Err` to `done`. A completion arriving after
/// the caller moved on is fine, collections discard stale completions
/// themselves.
pub trait Transport: Send + Sync {
    /// Start fetching `request`. `cancel` may be polled cooperatively.
    fn fetch(&self, request: TransportRequest, cancel: CancelToken, done: FetchCallback);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_simple_template() {
        let request = TransportRequest::get("https://api.example.com/notes/{id}")
            .param("id", 42);
        let url = request.resolve_url().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/notes/42");
    }

    #[test]
    fn test_resolve_multiple_placeholders() {
        let request = TransportRequest::get("https://{host}/v1/{resource}?page={page}")
            .param("host", "api.example.com")
            .param("resource", "items")
            .param("page", 3);
        let url = request.resolve_url().unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/items?page=3");
    }

    #[test]
    fn test_unresolved_placeholder_is_error() {
        let request = TransportRequest::get("https://api.example.com/notes/{id}");
        assert!(matches!(
            request.resolve_url().unwrap_err(),
            DataError::UnresolvedPlaceholder { name, .. } if name == "id"
        ));
    }

    #[test]
    fn test_invalid_url_is_error() {
        let request = TransportRequest::get("not a url at all");
        assert!(matches!(
            request.resolve_url().unwrap_err(),
            DataError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn test_cancel_token() {
        let token = CancelToken::new();
        let shared = token.clone();
        assert!(!shared.is_cancelled());
        token.cancel();
        assert!(shared.is_cancelled());
    }
}
