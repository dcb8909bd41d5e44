//! Response collection and application invocation

use crate::error::{AdapterError, Result};
use bytes::Bytes;
use quest_core::{Application, BoxedResponseBody, GatewayError, RequestContext, StartResponse};

/// Collects what the application emits during one invocation.
#[derive(Debug, Default)]
pub struct ResponseSink {
    status: Option<String>,
    headers: Vec<(String, String)>,
    chunks: Vec<Bytes>,
    breach: Option<GatewayError>,
}

impl ResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_started(&self) -> bool {
        self.status.is_some()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Append a body chunk. Fails if the response has not been started.
    pub fn push_chunk(&mut self, chunk: Bytes) -> Result<(), GatewayError> {
        if !self.is_started() {
            return Err(GatewayError::BodyBeforeStart);
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// First contract breach seen, if the application ignored the error
    /// it was handed
    pub(crate) fn take_breach(&mut self) -> Option<GatewayError> {
        self.breach.take()
    }

    /// Status line, headers and chunks.
    pub(crate) fn into_parts(self) -> Result<(String, Vec<(String, String)>, Vec<Bytes>)> {
        let status = self.status.ok_or(AdapterError::MissingStart)?;
        Ok((status, self.headers, self.chunks))
    }
}

impl StartResponse for ResponseSink {
    fn start_response(
        &mut self,
        status: String,
        headers: Vec<(String, String)>,
    ) -> Result<(), GatewayError> {
        if self.is_started() {
            self.breach.get_or_insert(GatewayError::AlreadyStarted);
            return Err(GatewayError::AlreadyStarted);
        }
        self.status = Some(status);
        self.headers = headers;
        Ok(())
    }
}

/// Closes the wrapped body when dropped, whatever the exit path.
struct CloseGuard {
    body: Option<BoxedResponseBody>,
}

impl CloseGuard {
    fn next_chunk(&mut self) -> Option<Result<Bytes, GatewayError>> {
        self.body.as_mut()?.next_chunk()
    }
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        if let Some(mut body) = self.body.take() {
            body.close();
        }
    }
}

/// Call `app` once and drain its body into a fresh sink.
///
/// The body's `close` runs exactly once, including when iteration fails or
/// panics.
pub async fn invoke<A: Application>(app: &A, context: RequestContext) -> Result<ResponseSink> {
    let mut sink = ResponseSink::new();
    let body = app.call(context, &mut sink).await?;
    let mut body = CloseGuard { body: Some(body) };

    if let Some(breach) = sink.take_breach() {
        return Err(breach.into());
    }

    while let Some(chunk) = body.next_chunk() {
        sink.push_chunk(chunk?)?;
    }
    drop(body);

    Ok(sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_core::{BodyStream, ResponseBody};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting {
        chunks: Vec<Result<Bytes, GatewayError>>,
        closed: Arc<AtomicUsize>,
    }

    impl ResponseBody for Counting {
        fn next_chunk(&mut self) -> Option<Result<Bytes, GatewayError>> {
            if self.chunks.is_empty() {
                None
            } else {
                Some(self.chunks.remove(0))
            }
        }

        fn close(&mut self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Emits a fixed status and body, optionally misbehaving
    struct Scripted {
        start_twice: bool,
        skip_start: bool,
        fail_midway: bool,
        closed: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new() -> Self {
            Self {
                start_twice: false,
                skip_start: false,
                fail_midway: false,
                closed: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl Application for Scripted {
        async fn call(
            &self,
            _context: RequestContext,
            start_response: &mut (dyn StartResponse + Send),
        ) -> Result<BoxedResponseBody, GatewayError> {
            if !self.skip_start {
                start_response.start_response("200 OK".to_string(), vec![])?;
            }
            if self.start_twice {
                // ignore the rejection on purpose
                let _ = start_response.start_response("500 Oops".to_string(), vec![]);
            }
            let mut chunks = vec![Ok(Bytes::from("ab"))];
            if self.fail_midway {
                chunks.push(Err(GatewayError::Body("disk on fire".to_string())));
            }
            chunks.push(Ok(Bytes::from("cd")));
            Ok(Box::new(Counting {
                chunks,
                closed: self.closed.clone(),
            }))
        }
    }

    fn context() -> RequestContext {
        RequestContext::new(BodyStream::empty())
    }

    #[test]
    fn test_sink_rejects_body_before_start() {
        let mut sink = ResponseSink::new();
        assert!(matches!(
            sink.push_chunk(Bytes::from("x")),
            Err(GatewayError::BodyBeforeStart)
        ));
    }

    #[test]
    fn test_sink_rejects_second_start() {
        let mut sink = ResponseSink::new();
        sink.start_response("200 OK".into(), vec![]).unwrap();
        assert!(matches!(
            sink.start_response("201 Created".into(), vec![]),
            Err(GatewayError::AlreadyStarted)
        ));
        assert_eq!(sink.status(), Some("200 OK"));
    }

    #[test]
    fn test_unstarted_sink_cannot_be_split() {
        assert!(matches!(
            ResponseSink::new().into_parts(),
            Err(AdapterError::MissingStart)
        ));
    }

    #[tokio::test]
    async fn test_invoke_collects_in_order_and_closes() {
        let app = Scripted::new();
        let sink = invoke(&app, context()).await.unwrap();

        assert_eq!(sink.chunks(), &[Bytes::from("ab"), Bytes::from("cd")]);
        assert_eq!(app.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invoke_closes_on_failure() {
        let app = Scripted {
            fail_midway: true,
            ..Scripted::new()
        };
        let err = invoke(&app, context()).await.unwrap_err();

        assert!(err.to_string().contains("disk on fire"));
        assert_eq!(app.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_ignored_double_start_is_fatal() {
        let app = Scripted {
            start_twice: true,
            ..Scripted::new()
        };
        let err = invoke(&app, context()).await.unwrap_err();

        assert!(matches!(err, AdapterError::Contract(GatewayError::AlreadyStarted)));
        assert_eq!(app.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_body_without_start_is_fatal() {
        let app = Scripted {
            skip_start: true,
            ..Scripted::new()
        };
        let err = invoke(&app, context()).await.unwrap_err();
        assert!(matches!(err, AdapterError::Contract(GatewayError::BodyBeforeStart)));
    }

    #[test]
    fn test_guard_closes_once() {
        struct Flag(Arc<AtomicUsize>);
        impl ResponseBody for Flag {
            fn next_chunk(&mut self) -> Option<Result<Bytes, GatewayError>> {
                None
            }
            fn close(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let closed = Arc::new(AtomicUsize::new(0));
        let mut guard = CloseGuard {
            body: Some(Box::new(Flag(closed.clone()))),
        };
        assert!(guard.next_chunk().is_none());
        drop(guard);
        assert_eq!(closed.load(Ordering::SeqCst), 1);
    }
}
