//! Response types for Quest Core
//!
//! The core trait is [`IntoResponse`], which allows any type to be converted
//! into an HTTP response.
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | `String` / `&str` | 200 | text/plain |
//! | `Bytes` | 200 | application/octet-stream |
//! | `()` | 200 | - |
//! | [`Json<T>`] | 200 | application/json |
//! | [`Created<T>`] | 201 | application/json |
//! | [`NoContent`] | 204 | - |
//! | [`WithStatus<T, N>`] | N | varies |
//! | [`ApiError`] | varies | application/json |
//!
//! Tuples customize the status: `(StatusCode::NOT_FOUND, Json(body))`.

use crate::error::{ApiError, ErrorResponse};
use crate::extract::Json;
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::Full;
use serde::Serialize;

/// HTTP Response type
pub type Response = http::Response<Full<Bytes>>;

/// Trait for types that can be converted into an HTTP response
pub trait IntoResponse {
    /// Convert self into a Response
    fn into_response(self) -> Response;
}

fn build(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

// () - 200 OK with empty body
impl IntoResponse for () {
    fn into_response(self) -> Response {
        build(StatusCode::OK, None, Bytes::new())
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        build(StatusCode::OK, Some("text/plain; charset=utf-8"), Bytes::from(self))
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        build(StatusCode::OK, Some("text/plain; charset=utf-8"), Bytes::from(self))
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        build(StatusCode::OK, Some("application/octet-stream"), self)
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        build(self, None, Bytes::new())
    }
}

// (StatusCode, impl IntoResponse)
impl<R: IntoResponse> IntoResponse for (StatusCode, R) {
    fn into_response(self) -> Response {
        let mut response = self.1.into_response();
        *response.status_mut() = self.0;
        response
    }
}

// (StatusCode, HeaderMap, impl IntoResponse)
impl<R: IntoResponse> IntoResponse for (StatusCode, HeaderMap, R) {
    fn into_response(self) -> Response {
        let mut response = self.2.into_response();
        *response.status_mut() = self.0;
        response.headers_mut().extend(self.1);
        response
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        let error_response = ErrorResponse::from(self);
        let body = serde_json::to_vec(&error_response).unwrap_or_else(|_| {
            br#"{"error":{"type":"internal_error","message":"Failed to serialize error"}}"#.to_vec()
        });

        build(status, Some("application/json"), Bytes::from(body))
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => build(StatusCode::OK, Some("application/json"), Bytes::from(body)),
            Err(err) => ApiError::internal(format!("Failed to serialize response: {}", err))
                .into_response(),
        }
    }
}

/// 201 Created response wrapper
///
/// Returns HTTP 201 with JSON body.
#[derive(Debug, Clone)]
pub struct Created<T>(pub T);

impl<T: Serialize> IntoResponse for Created<T> {
    fn into_response(self) -> Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

/// 204 No Content response
#[derive(Debug, Clone, Copy)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        build(StatusCode::NO_CONTENT, None, Bytes::new())
    }
}

/// Generic wrapper for returning a response with a custom status code.
///
/// ```rust,ignore
/// async fn accepted_handler() -> WithStatus<String, 202> {
///     WithStatus("Request accepted for processing".to_string())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct WithStatus<T, const CODE: u16>(pub T);

impl<T: IntoResponse, const CODE: u16> IntoResponse for WithStatus<T, CODE> {
    fn into_response(self) -> Response {
        let mut response = self.0.into_response();
        if let Ok(status) = StatusCode::from_u16(CODE) {
            *response.status_mut() = status;
        }
        response
    }
}

/// Status line in `"<code> <reason phrase>"` form
pub(crate) fn status_line(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use proptest::prelude::*;

    async fn body_to_bytes(body: Full<Bytes>) -> Bytes {
        body.collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = Json(serde_json::json!({"ok": true})).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert_eq!(body_to_bytes(response.into_body()).await, Bytes::from(r#"{"ok":true}"#));
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let response = ApiError::not_found("User not found").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_to_bytes(response.into_body()).await;
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"]["type"], "not_found");
        assert_eq!(value["error"]["message"], "User not found");
    }

    #[test]
    fn test_created_and_tuple_status() {
        assert_eq!(Created("x").into_response().status(), StatusCode::CREATED);
        assert_eq!(
            (StatusCode::BAD_REQUEST, Json("x")).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(NoContent.into_response().status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_status_line() {
        assert_eq!(status_line(StatusCode::CREATED), "201 Created");
        assert_eq!(status_line(StatusCode::NOT_FOUND), "404 Not Found");
        assert_eq!(status_line(StatusCode::from_u16(599).unwrap()), "599 Unknown");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_with_status_applies_code(body in "[a-zA-Z0-9 ]{0,100}") {
            let response_202: Response = WithStatus::<_, 202>(body.clone()).into_response();
            prop_assert_eq!(response_202.status().as_u16(), 202);

            let response_418: Response = WithStatus::<_, 418>(body).into_response();
            prop_assert_eq!(response_418.status().as_u16(), 418);
        }

        #[test]
        fn prop_status_line_leads_with_code(code in 100u16..600) {
            let status = StatusCode::from_u16(code).unwrap();
            let line = status_line(status);
            let (leading, _) = line.split_once(' ').unwrap();
            prop_assert_eq!(leading.parse::<u16>().unwrap(), code);
        }
    }
}
