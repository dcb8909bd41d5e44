//! Request types for Quest Core

use crate::error::{ApiError, Result};
use crate::gateway::RequestContext;
use bytes::Bytes;
use http::{request::Parts, Extensions, HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::sync::Arc;

/// Bytes that cannot appear literally in a URI path
const PATH_ESCAPES: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// HTTP Request wrapper
///
/// Provides access to all parts of an incoming HTTP request.
pub struct Request {
    pub(crate) parts: Parts,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) body: Option<Bytes>,
    pub(crate) state: Arc<Extensions>,
    pub(crate) path_params: HashMap<String, String>,
}

impl Request {
    /// Create a new request from parts
    pub(crate) fn new(
        parts: Parts,
        path: String,
        query: Option<String>,
        body: Bytes,
        state: Arc<Extensions>,
    ) -> Self {
        Self {
            parts,
            path,
            query,
            body: Some(body),
            state,
            path_params: HashMap::new(),
        }
    }

    /// Rebuild a request from a gateway context.
    ///
    /// `PATH_INFO` arrives decoded and is routed as-is; the URI carries its
    /// percent-encoded form. The context's body stream is consumed.
    pub(crate) fn from_context(mut context: RequestContext, state: Arc<Extensions>) -> Result<Self> {
        let method_str = context.method().unwrap_or("GET");
        let method = Method::from_bytes(method_str.as_bytes())
            .map_err(|_| ApiError::bad_request(format!("Invalid HTTP method: {}", method_str)))?;

        let path = match context.path_info() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => "/".to_string(),
        };
        let uri: Uri = utf8_percent_encode(&path, PATH_ESCAPES)
            .to_string()
            .parse()
            .map_err(|_| ApiError::bad_request(format!("Invalid request path: {}", path)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in context.headers() {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::debug!(header = %name, "Skipping header with invalid name or value");
                continue;
            };
            headers.append(name, value);
        }

        let query = context
            .query_string()
            .filter(|q| !q.is_empty())
            .map(str::to_string);

        let body = context.input_mut().read_all()?;

        let mut builder = http::Request::builder()
            .method(method)
            .uri(uri)
            .version(Version::HTTP_11);
        if let Some(map) = builder.headers_mut() {
            *map = headers;
        }
        let (parts, _) = builder
            .body(())
            .map_err(|e| ApiError::bad_request(format!("Invalid request: {}", e)))?
            .into_parts();

        Ok(Self::new(parts, path, query, body, state))
    }

    pub(crate) fn set_path_params(&mut self, params: HashMap<String, String>) {
        self.path_params = params;
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Get the HTTP version
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get request extensions
    pub fn extensions(&self) -> &Extensions {
        &self.parts.extensions
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Decoded request path, as used for routing
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get the raw query string
    pub fn query_string(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Take the body bytes (can only be called once)
    pub fn take_body(&mut self) -> Option<Bytes> {
        self.body.take()
    }

    /// Get path parameters
    pub fn path_params(&self) -> &HashMap<String, String> {
        &self.path_params
    }

    /// Get a specific path parameter
    pub fn path_param(&self, name: &str) -> Option<&String> {
        self.path_params.get(name)
    }

    /// Get shared state
    pub fn state(&self) -> &Arc<Extensions> {
        &self.state
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("query", &self.query)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{keys, BodyStream};

    fn context(method: &str, path: &str, body: &'static str) -> RequestContext {
        let mut context = RequestContext::new(BodyStream::new(body));
        context.insert(keys::REQUEST_METHOD, method);
        context.insert(keys::PATH_INFO, path);
        context
    }

    #[test]
    fn test_from_context_basic() {
        let mut ctx = context("POST", "/api/users", r#"{"a":1}"#);
        ctx.insert(keys::QUERY_STRING, "limit=10&page=2");
        ctx.insert(keys::CONTENT_TYPE, "application/json");
        ctx.insert(keys::CONTENT_LENGTH, "7");
        ctx.insert_header("Authorization", "Bearer abc");

        let mut req = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap();
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/api/users");
        assert_eq!(req.query_string(), Some("limit=10&page=2"));
        assert_eq!(req.headers()["content-type"], "application/json");
        assert_eq!(req.headers()["authorization"], "Bearer abc");
        assert_eq!(req.take_body().unwrap(), Bytes::from(r#"{"a":1}"#));
        assert!(req.take_body().is_none());
    }

    #[test]
    fn test_from_context_defaults() {
        let ctx = RequestContext::new(BodyStream::empty());
        let req = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.path(), "/");
        assert_eq!(req.query_string(), None);
    }

    #[test]
    fn test_from_context_keeps_decoded_path() {
        let ctx = context("GET", "/rooms/hello world/ünïcode", "");
        let req = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap();
        assert_eq!(req.path(), "/rooms/hello world/ünïcode");
        assert_eq!(req.uri().path(), "/rooms/hello%20world/%C3%BCn%C3%AFcode");

        let ctx = context("GET", "/100%/a?b#c", "");
        let req = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap();
        assert_eq!(req.path(), "/100%/a?b#c");
        assert_eq!(req.uri().path(), "/100%25/a%3Fb%23c");
        assert_eq!(req.uri().query(), None);
    }

    #[test]
    fn test_from_context_rejects_bad_method() {
        let ctx = context("NOT A METHOD", "/", "");
        let err = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap_err();
        assert_eq!(err.status, http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_from_context_skips_invalid_header_values() {
        let mut ctx = context("GET", "/", "");
        ctx.insert_header("X-Bad", "line\nbreak");
        ctx.insert_header("X-Good", "ok");

        let req = Request::from_context(ctx, Arc::new(Extensions::new())).unwrap();
        assert!(req.headers().get("x-bad").is_none());
        assert_eq!(req.headers()["x-good"], "ok");
    }
}
