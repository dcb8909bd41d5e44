//! In-process test client
//!
//! Builds a [`RequestContext`] the way an invocation adapter would and runs
//! it through the full routing and handler pipeline.
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_health() {
//!     let client = TestClient::new(app());
//!     let response = client.get("/health").await;
//!     response.assert_status(200);
//! }
//! ```

use crate::app::App;
use crate::gateway::{keys, BodyStream, RequestContext};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};

/// Test client wrapping an [`App`]
pub struct TestClient {
    app: App,
}

impl TestClient {
    pub fn new(app: App) -> Self {
        Self { app }
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request(TestRequest::get(path)).await
    }

    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        self.request(TestRequest::post(path).json(body)).await
    }

    pub async fn request(&self, req: TestRequest) -> TestResponse {
        let (status, headers, body) = self.app.respond(req.into_context()).await;

        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                header_map.append(name, value);
            }
        }

        TestResponse {
            status,
            headers: header_map,
            body,
        }
    }
}

/// Request builder for [`TestClient`]
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl TestRequest {
    pub fn new(method: Method, path: &str) -> Self {
        let (path, query) = match path.split_once('?') {
            Some((path, query)) => (path.to_string(), Some(query.to_string())),
            None => (path.to_string(), None),
        };

        Self {
            method,
            path,
            query,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn options(path: &str) -> Self {
        Self::new(Method::OPTIONS, path)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    /// Set a JSON body and its content type
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        if let Ok(bytes) = serde_json::to_vec(body) {
            self.body = Bytes::from(bytes);
            self = self.header("Content-Type", "application/json");
        }
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    fn into_context(self) -> RequestContext {
        let length = self.body.len();
        let mut context = RequestContext::new(BodyStream::new(self.body));
        context.insert(keys::REQUEST_METHOD, self.method.as_str());
        context.insert(keys::PATH_INFO, self.path);
        context.insert(keys::QUERY_STRING, self.query.unwrap_or_default());
        context.insert(keys::CONTENT_LENGTH, length.to_string());
        for (name, value) in &self.headers {
            context.insert_header(name, value.as_str());
        }
        context
    }
}

/// Buffered response with assertion helpers
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header is missing or doesn't match.
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the body doesn't contain `expected`.
    pub fn assert_body_contains(&self, expected: &str) -> &Self {
        let body = self.text();
        assert!(
            body.contains(expected),
            "Expected body to contain '{}', got '{}'",
            expected,
            body
        );
        self
    }
}
