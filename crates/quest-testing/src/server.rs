use super::expectation::{Expectation, MockResponse, Times};
use super::matcher::RequestMatcher;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

type GenericError = Box<dyn std::error::Error + Send + Sync>;

/// Local HTTP stand-in for the hosted data service.
///
/// Later expectations take priority over earlier ones. A request that
/// matches nothing gets 404 with `No expectation matched` and is kept for
/// inspection through [`MockServer::unmatched_requests`].
pub struct MockServer {
    addr: SocketAddr,
    state: Arc<Mutex<ServerState>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

#[derive(Default)]
struct ServerState {
    expectations: Vec<Expectation>,
    received: Vec<RecordedRequest>,
    unmatched: Vec<RecordedRequest>,
}

/// A request as the mock server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: http::Method,
    pub path: String,
    /// Decoded query pairs in arrival order
    pub query: Vec<(String, String)>,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn json(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl MockServer {
    /// Start on a random local port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock server");
        let addr = listener.local_addr().expect("mock server has no local address");

        let state = Arc::new(Mutex::new(ServerState::default()));
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

        let accept_state = state.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    accepted = listener.accept() => {
                        let stream = match accepted {
                            Ok((stream, _)) => stream,
                            Err(err) => {
                                tracing::warn!(error = %err, "Mock server accept failed");
                                continue;
                            }
                        };

                        let state = accept_state.clone();
                        tokio::spawn(async move {
                            let service = service_fn(move |req| handle_request(req, state.clone()));
                            if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                                .serve_connection(TokioIo::new(stream), service)
                                .await
                            {
                                tracing::debug!(error = %err, "Mock server connection closed with error");
                            }
                        });
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// `http://127.0.0.1:<port>`, no trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    fn lock(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register an expectation. It is committed when the builder drops.
    pub fn expect(&self, matcher: RequestMatcher) -> ExpectationBuilder {
        ExpectationBuilder {
            server: self.state.clone(),
            expectation: Some(Expectation::new(matcher)),
        }
    }

    /// Every request received, matched or not
    pub fn received_requests(&self) -> Vec<RecordedRequest> {
        self.lock().received.clone()
    }

    pub fn unmatched_requests(&self) -> Vec<RecordedRequest> {
        self.lock().unmatched.clone()
    }

    /// # Panics
    ///
    /// Panics listing every expectation whose call count is off.
    pub fn verify(&self) {
        let failures: Vec<String> = self
            .lock()
            .expectations
            .iter()
            .filter_map(Expectation::unmet)
            .collect();

        assert!(
            failures.is_empty(),
            "Mock server expectations not met:\n  {}",
            failures.join("\n  ")
        );
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

pub struct ExpectationBuilder {
    server: Arc<Mutex<ServerState>>,
    expectation: Option<Expectation>,
}

impl ExpectationBuilder {
    fn map(mut self, f: impl FnOnce(Expectation) -> Expectation) -> Self {
        self.expectation = self.expectation.take().map(f);
        self
    }

    pub fn respond_with(self, response: MockResponse) -> Self {
        self.map(|exp| exp.respond_with(response))
    }

    pub fn times(self, n: usize) -> Self {
        self.map(|exp| exp.times(Times::Exactly(n)))
    }

    pub fn once(self) -> Self {
        self.map(|exp| exp.times(Times::Once))
    }

    pub fn at_least_once(self) -> Self {
        self.map(|exp| exp.times(Times::AtLeast(1)))
    }

    /// Match without asserting a call count
    pub fn any_number(self) -> Self {
        self.map(|exp| exp.times(Times::Any))
    }

    pub fn never(self) -> Self {
        self.map(|exp| exp.times(Times::Exactly(0)))
    }
}

impl Drop for ExpectationBuilder {
    fn drop(&mut self) {
        if let Some(exp) = self.expectation.take() {
            let mut state = self
                .server
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.expectations.push(exp);
        }
    }
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: Arc<Mutex<ServerState>>,
) -> Result<Response<Full<Bytes>>, GenericError> {
    let (parts, body) = req.into_parts();
    let body = body.collect().await?.to_bytes();

    let recorded = RecordedRequest {
        query: parts
            .uri
            .query()
            .and_then(|q| serde_urlencoded::from_str(q).ok())
            .unwrap_or_default(),
        method: parts.method,
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body,
    };

    let mut state = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    state.received.push(recorded.clone());

    let matched = state
        .expectations
        .iter_mut()
        .rev()
        .find(|exp| exp.matcher.matches(&recorded));

    let Some(exp) = matched else {
        tracing::debug!(method = %recorded.method, path = %recorded.path, "No expectation matched");
        state.unmatched.push(recorded);
        let mut response = Response::new(Full::new(Bytes::from("No expectation matched")));
        *response.status_mut() = StatusCode::NOT_FOUND;
        return Ok(response);
    };

    exp.call_count += 1;
    let mut response = Response::new(Full::new(exp.response.body.clone()));
    *response.status_mut() = exp.response.status;
    *response.headers_mut() = exp.response.headers.clone();
    Ok(response)
}
