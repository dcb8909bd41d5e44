//! CORS header injection
//!
//! There is no middleware layer in front of the function, so every
//! response gets these headers stamped on at assembly time.

use std::collections::BTreeMap;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, PATCH, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Header names and values applied to every response
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", ALLOW_ORIGIN),
    ("Access-Control-Allow-Methods", ALLOW_METHODS),
    ("Access-Control-Allow-Headers", ALLOW_HEADERS),
];

/// Overwrite the CORS headers, dropping any spelling the application used.
pub fn apply_cors(headers: &mut BTreeMap<String, String>) {
    headers.retain(|name, _| {
        !CORS_HEADERS
            .iter()
            .any(|(cors, _)| cors.eq_ignore_ascii_case(name))
    });
    for (name, value) in CORS_HEADERS {
        headers.insert(name.to_string(), value.to_string());
    }
}
