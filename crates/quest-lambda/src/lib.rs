//! # Quest Lambda
//!
//! Hosts a [`quest_core::Application`] inside a serverless function. Each
//! invocation carries one request event; there is no listening socket.
//!
//! The chain for one invocation:
//!
//! 1. [`normalize`] turns the raw [`InvocationEvent`] into a [`NormalizedRequest`]
//!    and strips the function's routing prefix.
//! 2. [`build_context`] produces the [`RequestContext`](quest_core::RequestContext)
//!    the application expects.
//! 3. [`invoke`] calls the application with a [`ResponseSink`] and drains its body,
//!    closing it on every exit path.
//! 4. [`assemble`] parses the status line, forces the CORS headers and decodes
//!    the body into an [`InvocationResponse`].
//!
//! [`InvocationHandler`] wraps all four in one failure boundary and [`run`]
//! registers it with the Lambda runtime.
//!
//! ```rust,ignore
//! #[tokio::main]
//! async fn main() -> Result<(), lambda_runtime::Error> {
//!     quest_lambda::run(InvocationHandler::new(|| build_app())).await
//! }
//! ```

mod assemble;
mod config;
mod cors;
mod environ;
mod error;
mod event;
mod handler;
mod normalize;
mod sink;

pub use assemble::assemble;
pub use config::{AdapterConfig, DEFAULT_ROUTING_PREFIX};
pub use cors::{apply_cors, ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN, CORS_HEADERS};
pub use environ::build_context;
pub use error::{error_chain, AdapterError, BindError, Result};
pub use event::{InvocationEvent, InvocationResponse};
pub use handler::{run, ApplicationLoader, InvocationHandler};
pub use normalize::{normalize, NormalizedRequest};
pub use sink::{invoke, ResponseSink};
