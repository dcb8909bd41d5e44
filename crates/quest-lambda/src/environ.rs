//! Synthetic request construction

use crate::normalize::NormalizedRequest;
use quest_core::gateway::{header_key, keys};
use quest_core::{BodyStream, GatewayInfo, RequestContext};

const DEFAULT_CONTENT_TYPE: &str = "application/json";
const SERVER_NAME: &str = "netlify";
const SERVER_PORT: &str = "443";
const SERVER_PROTOCOL: &str = "HTTP/1.1";

/// Build the context the embedded application is called with.
///
/// The query string is `key=value` pairs joined with `&` in key order,
/// without re-encoding. Content type falls back to `application/json`;
/// content length is the body's byte length. Content metadata headers are
/// only stored under their own keys.
pub fn build_context(req: NormalizedRequest) -> RequestContext {
    let query_string = req
        .query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    let content_type = req
        .header("content-type")
        .unwrap_or(DEFAULT_CONTENT_TYPE)
        .to_string();
    let content_length = req.body.len().to_string();

    let mut context =
        RequestContext::new(BodyStream::new(req.body)).with_info(GatewayInfo::single_invocation());

    context.insert(keys::REQUEST_METHOD, req.method);
    context.insert(keys::SCRIPT_NAME, "");
    context.insert(keys::PATH_INFO, req.path);
    context.insert(keys::QUERY_STRING, query_string);
    context.insert(keys::CONTENT_TYPE, content_type);
    context.insert(keys::CONTENT_LENGTH, content_length);
    context.insert(keys::SERVER_NAME, SERVER_NAME);
    context.insert(keys::SERVER_PORT, SERVER_PORT);
    context.insert(keys::SERVER_PROTOCOL, SERVER_PROTOCOL);

    for (name, value) in req.headers {
        let key = header_key(&name);
        if key == keys::CONTENT_TYPE || key == keys::CONTENT_LENGTH {
            continue;
        }
        context.insert_header(&name, value);
    }

    context
}
