use super::matcher::RequestMatcher;
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};

/// A matcher, the response it produces, and how often it should fire
#[derive(Debug, Clone)]
pub struct Expectation {
    pub(crate) matcher: RequestMatcher,
    pub(crate) response: MockResponse,
    pub(crate) times: Times,
    pub(crate) call_count: usize,
}

impl Expectation {
    pub fn new(matcher: RequestMatcher) -> Self {
        Self {
            matcher,
            response: MockResponse::default(),
            times: Times::Once,
            call_count: 0,
        }
    }

    pub fn respond_with(mut self, response: MockResponse) -> Self {
        self.response = response;
        self
    }

    pub fn times(mut self, times: Times) -> Self {
        self.times = times;
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count
    }

    /// Describe the mismatch between expected and actual calls, if any
    pub(crate) fn unmet(&self) -> Option<String> {
        let n = self.call_count;
        let ok = match self.times {
            Times::Once => n == 1,
            Times::Exactly(expected) => n == expected,
            Times::AtLeast(min) => n >= min,
            Times::AtMost(max) => n <= max,
            Times::Any => true,
        };
        (!ok).then(|| format!("{:?} expected {:?} calls, got {}", self.matcher, self.times, n))
    }
}

/// How many times an expectation should be matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Times {
    Once,
    Exactly(usize),
    AtLeast(usize),
    AtMost(usize),
    Any,
}

/// A canned response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
}

impl Default for MockResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }
}

impl MockResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// # Panics
    ///
    /// Panics on an invalid header name or value.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        let name = HeaderName::from_bytes(key.as_bytes()).expect("invalid mock header name");
        let value = HeaderValue::from_str(value).expect("invalid mock header value");
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// # Panics
    ///
    /// Panics if `body` cannot be serialized.
    pub fn json(mut self, body: impl serde::Serialize) -> Self {
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self.body = serde_json::to_vec(&body)
            .expect("failed to serialize mock body")
            .into();
        self
    }
}
