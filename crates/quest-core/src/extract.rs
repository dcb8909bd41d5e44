//! Extractors for Quest Core
//!
//! Extractors pull typed data out of an incoming [`Request`]. Anything that
//! only needs headers, the path or the query implements [`FromRequestParts`];
//! extractors that consume the body implement [`FromRequest`] and must come
//! last in a handler's argument list.

use crate::error::{ApiError, Result};
use crate::request::Request;
use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::ops::Deref;
use std::str::FromStr;

/// Extract from the request without touching the body
pub trait FromRequestParts: Sized {
    fn from_request_parts(req: &Request) -> Result<Self>;
}

/// Extract from the full request, possibly consuming the body
pub trait FromRequest: Sized {
    fn from_request(req: &mut Request) -> impl Future<Output = Result<Self>> + Send;
}

impl<T: FromRequestParts> FromRequest for T {
    async fn from_request(req: &mut Request) -> Result<Self> {
        T::from_request_parts(req)
    }
}

/// JSON body extractor and response type.
///
/// An empty body is rejected with 400, same as malformed JSON.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct SignupRequest {
///     email: String,
///     password: String,
/// }
///
/// async fn signup(Json(body): Json<SignupRequest>) -> impl IntoResponse {
///     // body.email, body.password
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned + Send> FromRequest for Json<T> {
    async fn from_request(req: &mut Request) -> Result<Self> {
        let body = req
            .take_body()
            .ok_or_else(|| ApiError::internal("Body already consumed"))?;

        if body.is_empty() {
            return Err(ApiError::bad_request("Request body is required"));
        }

        let value: T = serde_json::from_slice(&body)?;
        Ok(Json(value))
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Query string extractor
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct LeaderboardParams {
///     limit: Option<u32>,
/// }
///
/// async fn scores(Query(params): Query<LeaderboardParams>) -> impl IntoResponse { .. }
/// ```
#[derive(Debug, Clone)]
pub struct Query<T>(pub T);

impl<T: DeserializeOwned> FromRequestParts for Query<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        let query = req.query_string().unwrap_or("");
        let value: T = serde_urlencoded::from_str(query)
            .map_err(|e| ApiError::bad_request(format!("Invalid query string: {}", e)))?;
        Ok(Query(value))
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Single path parameter extractor.
///
/// For a route `/users/{id}`, `Path(id): Path<String>`.
#[derive(Debug, Clone)]
pub struct Path<T>(pub T);

impl<T: FromStr> FromRequestParts for Path<T>
where
    T::Err: std::fmt::Display,
{
    fn from_request_parts(req: &Request) -> Result<Self> {
        let Some(value) = req.path_params().values().next() else {
            return Err(ApiError::internal("Missing path parameter"));
        };

        value
            .parse::<T>()
            .map(Path)
            .map_err(|e| ApiError::bad_request(format!("Invalid path parameter: {}", e)))
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Shared application state registered with [`App::state`](crate::App::state).
#[derive(Debug, Clone)]
pub struct State<T>(pub T);

impl<T: Clone + Send + Sync + 'static> FromRequestParts for State<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        req.state().get::<T>().cloned().map(State).ok_or_else(|| {
            ApiError::internal(format!(
                "State of type `{}` not found. Did you forget to call .state()?",
                std::any::type_name::<T>()
            ))
        })
    }
}

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Copy of the request headers
#[derive(Debug, Clone)]
pub struct Headers(pub HeaderMap);

impl Headers {
    /// Header value as a string, if present and visible ASCII
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|v| v.to_str().ok())
    }

    /// Token from an `Authorization: Bearer <token>` header
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.get_str("authorization")?;
        let token = value.strip_prefix("Bearer ")?.trim();
        (!token.is_empty()).then_some(token)
    }
}

impl FromRequestParts for Headers {
    fn from_request_parts(req: &Request) -> Result<Self> {
        Ok(Headers(req.headers().clone()))
    }
}

impl Deref for Headers {
    type Target = HeaderMap;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Raw body bytes
#[derive(Debug, Clone)]
pub struct Body(pub Bytes);

impl FromRequest for Body {
    async fn from_request(req: &mut Request) -> Result<Self> {
        req.take_body()
            .map(Body)
            .ok_or_else(|| ApiError::internal("Body already consumed"))
    }
}

impl Deref for Body {
    type Target = Bytes;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Optional extractor: None instead of a rejection
impl<T: FromRequestParts> FromRequestParts for Option<T> {
    fn from_request_parts(req: &Request) -> Result<Self> {
        Ok(T::from_request_parts(req).ok())
    }
}
