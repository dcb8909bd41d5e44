//! Testing utilities for the Quantum Quest backend
//!
//! [`MockServer`] stands in for the hosted data service during integration
//! tests. Register expectations with a [`RequestMatcher`], point the client
//! at [`MockServer::base_url`], then call [`MockServer::verify`].

pub mod expectation;
pub mod matcher;
pub mod server;

pub use expectation::{Expectation, MockResponse, Times};
pub use matcher::RequestMatcher;
pub use server::{MockServer, RecordedRequest};
