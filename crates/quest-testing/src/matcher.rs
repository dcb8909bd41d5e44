use crate::server::RecordedRequest;
use http::Method;
use serde_json::Value;

/// Matcher for HTTP requests.
///
/// Every criterion set must hold; an empty matcher matches anything.
/// Header names are case-insensitive, header values are compared exactly.
///
/// ```rust,ignore
/// RequestMatcher::new()
///     .method(Method::GET)
///     .path("/rest/v1/users")
///     .query_param("email", "eq.ada@example.com")
///     .header("apikey", "anon-key");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestMatcher {
    pub(crate) method: Option<Method>,
    pub(crate) path: Option<String>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body_json: Option<Value>,
    pub(crate) body_string: Option<String>,
}

impl RequestMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Require a decoded query parameter with this exact value
    pub fn query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// # Panics
    ///
    /// Panics if `body` cannot be serialized.
    pub fn body_json(mut self, body: impl serde::Serialize) -> Self {
        self.body_json =
            Some(serde_json::to_value(body).expect("Failed to serialize body matcher"));
        self
    }

    pub fn body_string(mut self, body: impl Into<String>) -> Self {
        self.body_string = Some(body.into());
        self
    }

    pub fn matches(&self, req: &RecordedRequest) -> bool {
        if self.method.as_ref().is_some_and(|m| *m != req.method) {
            return false;
        }

        if self.path.as_ref().is_some_and(|p| p != &req.path) {
            return false;
        }

        let query_ok = self.query.iter().all(|(k, v)| {
            req.query
                .iter()
                .any(|(actual_k, actual_v)| actual_k == k && actual_v == v)
        });
        if !query_ok {
            return false;
        }

        let headers_ok = self
            .headers
            .iter()
            .all(|(k, v)| req.headers.get(k.as_str()).is_some_and(|actual| actual == v.as_str()));
        if !headers_ok {
            return false;
        }

        if let Some(expected) = &self.body_json {
            match serde_json::from_slice::<Value>(&req.body) {
                Ok(actual) if &actual == expected => {}
                _ => return false,
            }
        }

        if let Some(expected) = &self.body_string {
            if std::str::from_utf8(&req.body).ok() != Some(expected.as_str()) {
                return false;
            }
        }

        true
    }
}
