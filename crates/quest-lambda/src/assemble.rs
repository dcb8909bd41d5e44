//! Invocation response assembly

use crate::cors::apply_cors;
use crate::error::{AdapterError, Result};
use crate::event::InvocationResponse;
use crate::sink::ResponseSink;
use std::collections::BTreeMap;

/// Turn a filled sink into the platform response.
///
/// Later headers win over earlier ones with the same name. The CORS headers
/// are always overwritten. The body must be valid UTF-8.
pub fn assemble(sink: ResponseSink) -> Result<InvocationResponse> {
    let (status_line, header_list, chunks) = sink.into_parts()?;

    let code = status_line
        .split_once(' ')
        .map_or(status_line.as_str(), |(code, _)| code);
    let status_code = code
        .parse::<u16>()
        .map_err(|_| AdapterError::MalformedStatus(status_line.clone()))?;

    let mut headers: BTreeMap<String, String> = header_list.into_iter().collect();
    apply_cors(&mut headers);

    let body = String::from_utf8(chunks.concat())?;

    Ok(InvocationResponse {
        status_code,
        headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cors::CORS_HEADERS;
    use bytes::Bytes;
    use quest_core::StartResponse;

    fn sink(status: &str, headers: &[(&str, &str)], chunks: &[&[u8]]) -> ResponseSink {
        let mut sink = ResponseSink::new();
        sink.start_response(
            status.to_string(),
            headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
        .unwrap();
        for chunk in chunks {
            sink.push_chunk(Bytes::copy_from_slice(chunk)).unwrap();
        }
        sink
    }

    #[test]
    fn test_created_with_two_chunks() {
        let response = assemble(sink("201 Created", &[], &[b"ab", b"cd"])).unwrap();
        assert_eq!(response.status_code, 201);
        assert_eq!(response.body, "abcd");
        for (name, value) in CORS_HEADERS {
            assert_eq!(response.header(name), Some(value));
        }
    }

    #[test]
    fn test_later_header_wins_case_sensitive() {
        let response = assemble(sink(
            "200 OK",
            &[("X-A", "1"), ("X-A", "2"), ("x-a", "3")],
            &[],
        ))
        .unwrap();
        assert_eq!(response.header("X-A"), Some("2"));
        assert_eq!(response.header("x-a"), Some("3"));
    }

    #[test]
    fn test_status_without_reason() {
        assert_eq!(assemble(sink("204", &[], &[])).unwrap().status_code, 204);
    }

    #[test]
    fn test_malformed_status_is_error() {
        let err = assemble(sink("OK 200", &[], &[])).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedStatus(line) if line == "OK 200"));

        assert!(assemble(sink("", &[], &[])).is_err());
    }

    #[test]
    fn test_invalid_utf8_is_reported() {
        let err = assemble(sink("200 OK", &[], &[&[0xe2, 0x82], &[0x28]])).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidUtf8(_)));
    }

    #[test]
    fn test_missing_start_is_not_a_default_200() {
        let err = assemble(ResponseSink::new()).unwrap_err();
        assert!(matches!(err, AdapterError::MissingStart));
    }
}
