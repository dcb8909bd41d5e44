//! Gateway invocation contract
//!
//! The contract between an invocation adapter and an embedded [`App`](crate::App).
//! There is no socket: the adapter hands the application a [`RequestContext`]
//! (environment-style variables plus a single-pass [`BodyStream`]) and a
//! [`StartResponse`] callback. The application calls `start_response` exactly
//! once with a status line and a header list, then returns a [`ResponseBody`]
//! that yields the body chunks in order.
//!
//! ```rust,ignore
//! let mut context = RequestContext::new(BodyStream::new("{}"));
//! context.insert(keys::REQUEST_METHOD, "POST");
//! context.insert(keys::PATH_INFO, "/api/users");
//!
//! let mut body = app.call(context, &mut sink).await?;
//! while let Some(chunk) = body.next_chunk() {
//!     sink.push(chunk?)?;
//! }
//! body.close();
//! ```

use bytes::Bytes;
use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use thiserror::Error;

/// Well-known context keys
pub mod keys {
    pub const REQUEST_METHOD: &str = "REQUEST_METHOD";
    pub const SCRIPT_NAME: &str = "SCRIPT_NAME";
    pub const PATH_INFO: &str = "PATH_INFO";
    pub const QUERY_STRING: &str = "QUERY_STRING";
    pub const CONTENT_TYPE: &str = "CONTENT_TYPE";
    pub const CONTENT_LENGTH: &str = "CONTENT_LENGTH";
    pub const SERVER_NAME: &str = "SERVER_NAME";
    pub const SERVER_PORT: &str = "SERVER_PORT";
    pub const SERVER_PROTOCOL: &str = "SERVER_PROTOCOL";

    /// Prefix for every header except the two content-metadata headers
    pub const HEADER_PREFIX: &str = "HTTP_";
}

/// Errors raised when either side breaks the invocation contract
#[derive(Debug, Error)]
pub enum GatewayError {
    /// `start_response` was called a second time
    #[error("start_response called more than once")]
    AlreadyStarted,

    /// A body chunk arrived before `start_response`
    #[error("response body emitted before start_response")]
    BodyBeforeStart,

    /// The request body stream was read twice
    #[error("request body stream already consumed")]
    BodyConsumed,

    /// The response body failed while producing a chunk
    #[error("response body failed: {0}")]
    Body(String),

    /// The application failed before returning a body
    #[error("application error: {0}")]
    Application(String),
}

/// Fixed protocol identification handed to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GatewayInfo {
    pub url_scheme: &'static str,
    pub version: (u8, u8),
    pub multithread: bool,
    pub multiprocess: bool,
    pub run_once: bool,
}

impl GatewayInfo {
    /// One request per process entry, no threads, no worker pool.
    pub const fn single_invocation() -> Self {
        Self {
            url_scheme: "https",
            version: (1, 0),
            multithread: false,
            multiprocess: false,
            run_once: true,
        }
    }
}

impl Default for GatewayInfo {
    fn default() -> Self {
        Self::single_invocation()
    }
}

/// Single-pass request body.
///
/// Positioned at offset zero until [`BodyStream::read_all`] is called; a
/// second read fails with [`GatewayError::BodyConsumed`].
#[derive(Debug, Default)]
pub struct BodyStream {
    data: Option<Bytes>,
    len: usize,
}

impl BodyStream {
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        Self {
            len: data.len(),
            data: Some(data),
        }
    }

    pub fn empty() -> Self {
        Self::new(Bytes::new())
    }

    /// Total length in bytes, whether or not it has been read
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current read offset
    pub fn position(&self) -> usize {
        if self.data.is_some() {
            0
        } else {
            self.len
        }
    }

    pub fn is_consumed(&self) -> bool {
        self.data.is_none()
    }

    /// Read the whole stream. Can only be called once.
    pub fn read_all(&mut self) -> Result<Bytes, GatewayError> {
        self.data.take().ok_or(GatewayError::BodyConsumed)
    }
}

/// Environment-style request description consumed by an [`Application`].
///
/// Owned by exactly one invocation.
#[derive(Debug)]
pub struct RequestContext {
    vars: BTreeMap<String, String>,
    input: BodyStream,
    info: GatewayInfo,
    header_names: Vec<(String, String)>,
}

impl RequestContext {
    pub fn new(input: BodyStream) -> Self {
        Self {
            vars: BTreeMap::new(),
            input,
            info: GatewayInfo::single_invocation(),
            header_names: Vec::new(),
        }
    }

    pub fn with_info(mut self, info: GatewayInfo) -> Self {
        self.info = info;
        self
    }

    /// Set a variable, returning the previous value if any
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.vars.insert(key.into(), value.into())
    }

    /// Add an incoming header under its canonical key.
    ///
    /// The original header name is remembered with its casing intact.
    pub fn insert_header(&mut self, name: &str, value: impl Into<String>) {
        let key = header_key(name);
        self.header_names.push((name.to_string(), key.clone()));
        self.vars.insert(key, value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    pub fn vars(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn method(&self) -> Option<&str> {
        self.get(keys::REQUEST_METHOD)
    }

    pub fn path_info(&self) -> Option<&str> {
        self.get(keys::PATH_INFO)
    }

    pub fn query_string(&self) -> Option<&str> {
        self.get(keys::QUERY_STRING)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(keys::CONTENT_TYPE)
    }

    pub fn content_length(&self) -> Option<usize> {
        self.get(keys::CONTENT_LENGTH).and_then(|v| v.parse().ok())
    }

    /// Incoming header names as received, paired with their canonical key
    pub fn header_names(&self) -> &[(String, String)] {
        &self.header_names
    }

    /// Headers reconstructed from the context, lowercase wire names
    pub fn headers(&self) -> impl Iterator<Item = (String, &str)> {
        self.vars.iter().filter_map(|(key, value)| {
            let name = match key.as_str() {
                keys::CONTENT_TYPE => "content-type".to_string(),
                keys::CONTENT_LENGTH => "content-length".to_string(),
                other => other
                    .strip_prefix(keys::HEADER_PREFIX)?
                    .to_ascii_lowercase()
                    .replace('_', "-"),
            };
            Some((name, value.as_str()))
        })
    }

    pub fn info(&self) -> &GatewayInfo {
        &self.info
    }

    pub fn input(&self) -> &BodyStream {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut BodyStream {
        &mut self.input
    }
}

/// Translate a header name into its context key.
///
/// Uppercase with `-` replaced by `_`, prefixed with `HTTP_` unless the
/// result is `CONTENT_TYPE` or `CONTENT_LENGTH`.
pub fn header_key(name: &str) -> String {
    let key = name.to_ascii_uppercase().replace('-', "_");
    if key == keys::CONTENT_TYPE || key == keys::CONTENT_LENGTH {
        key
    } else {
        format!("{}{}", keys::HEADER_PREFIX, key)
    }
}

/// Callback the application uses to begin its response.
pub trait StartResponse {
    /// Record the status line (`"<code> <reason>"`) and the header list.
    fn start_response(
        &mut self,
        status: String,
        headers: Vec<(String, String)>,
    ) -> Result<(), GatewayError>;
}

/// Response body produced by an application.
pub trait ResponseBody: Send {
    /// Next chunk in order, `None` once exhausted
    fn next_chunk(&mut self) -> Option<Result<Bytes, GatewayError>>;

    /// Release whatever the body holds. Called once after consumption.
    fn close(&mut self) {}
}

pub type BoxedResponseBody = Box<dyn ResponseBody>;

/// A response body whose chunks are already in memory.
#[derive(Debug, Default)]
pub struct BufferedBody {
    chunks: VecDeque<Bytes>,
}

impl BufferedBody {
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

impl ResponseBody for BufferedBody {
    fn next_chunk(&mut self) -> Option<Result<Bytes, GatewayError>> {
        self.chunks.pop_front().map(Ok)
    }

    fn close(&mut self) {
        if !self.chunks.is_empty() {
            tracing::trace!(remaining = self.chunks.len(), "Dropping unread response chunks");
        }
        self.chunks.clear();
    }
}

/// An application that can be driven through the gateway contract.
pub trait Application: Send + Sync + 'static {
    /// Handle one request.
    ///
    /// Implementations must call `start_response` exactly once before
    /// returning a body.
    fn call(
        &self,
        context: RequestContext,
        start_response: &mut (dyn StartResponse + Send),
    ) -> impl Future<Output = Result<BoxedResponseBody, GatewayError>> + Send;
}
