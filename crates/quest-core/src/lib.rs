//! # Quest Core
//!
//! Core library providing the foundational types and traits for the
//! Quantum Quest backend: the router, request extraction, response types
//! and the gateway contract an invocation adapter uses to drive an [`App`].

mod app;
mod error;
mod extract;
pub mod gateway;
mod handler;
mod request;
mod response;
mod router;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use app::App;
pub use error::{ApiError, Result};
pub use extract::{Body, FromRequest, FromRequestParts, Headers, Json, Path, Query, State};
pub use gateway::{
    Application, BodyStream, BoxedResponseBody, BufferedBody, GatewayError, GatewayInfo,
    RequestContext, ResponseBody, StartResponse,
};
pub use handler::Handler;
pub use request::Request;
pub use response::{Created, IntoResponse, NoContent, Response, WithStatus};
pub use router::{delete, get, patch, post, put, MethodRouter, RouteInfo, Router};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestRequest, TestResponse};
