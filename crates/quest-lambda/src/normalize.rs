//! Event normalization

use crate::event::InvocationEvent;
use bytes::Bytes;
use std::collections::BTreeMap;

/// An event with every field resolved and the routing prefix removed.
///
/// `path` always begins with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRequest {
    pub method: String,
    pub path: String,
    pub headers: BTreeMap<String, String>,
    pub query: BTreeMap<String, String>,
    pub body: Bytes,
}

impl NormalizedRequest {
    /// Header value, name compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Resolve defaults and strip `routing_prefix` from the path.
///
/// The prefix is only stripped on a segment boundary: `/prefix` and
/// `/prefix/x` lose it, `/prefixed` is left alone. A trailing `/` on the
/// prefix is ignored.
pub fn normalize(event: InvocationEvent, routing_prefix: &str) -> NormalizedRequest {
    let raw_path = event.path.unwrap_or_default();
    let routing_prefix = routing_prefix.trim_end_matches('/');

    let path = match raw_path.strip_prefix(routing_prefix) {
        Some(rest) if !routing_prefix.is_empty() && (rest.is_empty() || rest.starts_with('/')) => {
            rest.to_string()
        }
        _ => raw_path,
    };
    let path = if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    };

    NormalizedRequest {
        method: event
            .http_method
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "GET".to_string()),
        path,
        headers: event.headers.unwrap_or_default(),
        query: event.query_string_parameters.unwrap_or_default(),
        body: event.body.map(Bytes::from).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ROUTING_PREFIX;
    use proptest::prelude::*;

    fn event(path: Option<&str>) -> InvocationEvent {
        InvocationEvent {
            path: path.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let req = normalize(InvocationEvent::default(), DEFAULT_ROUTING_PREFIX);
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/");
        assert!(req.headers.is_empty());
        assert!(req.query.is_empty());
        assert!(req.body.is_empty());
    }

    #[test]
    fn test_prefix_stripping() {
        let strip = |p: &str| normalize(event(Some(p)), DEFAULT_ROUTING_PREFIX).path;

        assert_eq!(strip("/.netlify/functions/api"), "/");
        assert_eq!(strip("/.netlify/functions/api/"), "/");
        assert_eq!(strip("/.netlify/functions/api/health"), "/health");
        assert_eq!(strip("/api/users"), "/api/users");
        assert_eq!(strip("/.netlify/functions/apix"), "/.netlify/functions/apix");
        assert_eq!(strip(""), "/");
        assert_eq!(strip("health"), "/health");
    }

    #[test]
    fn test_prefix_with_trailing_slash() {
        let strip = |p: &str| normalize(event(Some(p)), "/fn/").path;

        assert_eq!(strip("/fn/health"), "/health");
        assert_eq!(strip("/fn"), "/");
        assert_eq!(strip("/fn/"), "/");
        assert_eq!(strip("/fnx/health"), "/fnx/health");

        assert_eq!(normalize(event(Some("/health")), "/").path, "/health");
    }

    #[test]
    fn test_body_is_utf8_bytes() {
        let mut ev = event(Some("/"));
        ev.body = Some("héllo".to_string());
        let req = normalize(ev, DEFAULT_ROUTING_PREFIX);
        assert_eq!(req.body.len(), "héllo".len());
        assert_eq!(req.body, Bytes::from("héllo"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut ev = event(Some("/"));
        ev.headers = Some(BTreeMap::from([("Content-Type".to_string(), "text/plain".to_string())]));
        let req = normalize(ev, DEFAULT_ROUTING_PREFIX);
        assert_eq!(req.header("content-type"), Some("text/plain"));
        assert_eq!(req.header("CONTENT-TYPE"), Some("text/plain"));
    }

    proptest! {
        #[test]
        fn prop_prefix_exact_is_root(prefix in "(/[a-z.]{1,10}){1,4}") {
            let req = normalize(event(Some(&prefix)), &prefix);
            prop_assert_eq!(req.path, "/");
        }

        #[test]
        fn prop_prefix_then_segment(rest in "(/[a-zA-Z0-9_-]{1,12}){1,4}") {
            let full = format!("{}{}", DEFAULT_ROUTING_PREFIX, rest);
            let req = normalize(event(Some(&full)), DEFAULT_ROUTING_PREFIX);
            prop_assert_eq!(req.path, rest);
        }

        #[test]
        fn prop_path_always_rooted(path in "[ -~]{0,40}") {
            let req = normalize(event(Some(&path)), DEFAULT_ROUTING_PREFIX);
            prop_assert!(req.path.starts_with('/'));
        }
    }
}
