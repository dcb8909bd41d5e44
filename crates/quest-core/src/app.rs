//! Application builder and gateway dispatch

use crate::error::ApiError;
use crate::gateway::{
    Application, BoxedResponseBody, BufferedBody, GatewayError, RequestContext, StartResponse,
};
use crate::request::Request;
use crate::response::{status_line, IntoResponse, Response};
use crate::router::{MethodRouter, RouteInfo, RouteMatch, Router};
use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::BodyExt;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Main application
///
/// An `App` is driven through the [`Application`] contract: it never binds
/// a socket.
///
/// ```rust,ignore
/// let app = App::new()
///     .state(AppState::new(config))
///     .route("/health", get(health))
///     .route("/api/users", get(list_users).post(create_user));
/// ```
pub struct App {
    router: Router,
}

impl App {
    pub fn new() -> Self {
        let _ = tracing_subscriber::registry()
            .with(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,quest_core=debug")),
            )
            .with(tracing_subscriber::fmt::layer())
            .try_init();

        Self {
            router: Router::new(),
        }
    }

    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        self.router = self.router.nest(prefix, router);
        self
    }

    pub fn state<S: Clone + Send + Sync + 'static>(mut self, state: S) -> Self {
        self.router = self.router.state(state);
        self
    }

    pub fn routes(&self) -> Vec<&RouteInfo> {
        self.router.routes()
    }

    /// Route a request and run its handler.
    ///
    /// Unknown paths get 404, known paths with an unregistered method get
    /// 405. `OPTIONS` on a known path without its own handler answers 200
    /// with the allowed methods.
    pub(crate) async fn dispatch(&self, mut request: Request) -> Response {
        let method = request.method().clone();
        let path = request.path().to_string();
        let start = Instant::now();

        let response = match self.router.match_route(&path, &method) {
            RouteMatch::Found { handler, params } => {
                request.set_path_params(params);
                handler(request).await
            }
            RouteMatch::NotFound => {
                ApiError::not_found(format!("No route found for {} {}", method, path))
                    .into_response()
            }
            RouteMatch::MethodNotAllowed { allowed } => {
                let allow = allowed
                    .iter()
                    .map(Method::as_str)
                    .chain(std::iter::once("OPTIONS"))
                    .collect::<Vec<_>>()
                    .join(", ");

                let mut response = if method == Method::OPTIONS {
                    StatusCode::OK.into_response()
                } else {
                    ApiError::method_not_allowed(format!(
                        "Method {} not allowed for {}",
                        method, path
                    ))
                    .into_response()
                };
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(header::ALLOW, value);
                }
                response
            }
        };

        log_request(&method, &path, response.status(), start);
        response
    }

    /// Full round trip for a context: build the request, dispatch, and
    /// buffer the response body.
    pub(crate) async fn respond(&self, context: RequestContext) -> (StatusCode, Vec<(String, String)>, Bytes) {
        let response = match Request::from_context(context, self.router.state_ref()) {
            Ok(request) => self.dispatch(request).await,
            Err(err) => {
                error!(error = %err, "Rejected malformed request context");
                err.into_response()
            }
        };

        let (parts, body) = response.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(never) => match never {},
        };

        let mut headers: Vec<(String, String)> = parts
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        if !parts.headers.contains_key(header::CONTENT_LENGTH) {
            headers.push((header::CONTENT_LENGTH.as_str().to_string(), body.len().to_string()));
        }

        (parts.status, headers, body)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl Application for App {
    async fn call(
        &self,
        context: RequestContext,
        start_response: &mut (dyn StartResponse + Send),
    ) -> Result<BoxedResponseBody, GatewayError> {
        let (status, headers, body) = self.respond(context).await;
        start_response.start_response(status_line(status), headers)?;

        let body = if body.is_empty() {
            BufferedBody::default()
        } else {
            BufferedBody::new([body])
        };
        Ok(Box::new(body))
    }
}

fn log_request(method: &Method, path: &str, status: StatusCode, start: Instant) {
    let elapsed = start.elapsed();

    if status.is_server_error() {
        error!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request failed"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status = %status.as_u16(),
            duration_ms = %elapsed.as_millis(),
            "Request completed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{Json, State};
    use crate::gateway::{keys, BodyStream, ResponseBody};
    use crate::router::{get, post};

    #[derive(Default)]
    struct Recorder {
        status: Option<String>,
        headers: Vec<(String, String)>,
        calls: usize,
    }

    impl StartResponse for Recorder {
        fn start_response(
            &mut self,
            status: String,
            headers: Vec<(String, String)>,
        ) -> Result<(), GatewayError> {
            self.calls += 1;
            self.status = Some(status);
            self.headers = headers;
            Ok(())
        }
    }

    fn context(method: &str, path: &str, body: &'static str) -> RequestContext {
        let mut context = RequestContext::new(BodyStream::new(body));
        context.insert(keys::REQUEST_METHOD, method);
        context.insert(keys::PATH_INFO, path);
        context.insert(keys::CONTENT_TYPE, "application/json");
        context
    }

    fn drain(mut body: BoxedResponseBody) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(chunk) = body.next_chunk() {
            out.extend_from_slice(&chunk.unwrap());
        }
        body.close();
        out
    }

    async fn echo(Json(value): Json<serde_json::Value>) -> Json<serde_json::Value> {
        Json(value)
    }

    async fn greeting(State(name): State<String>) -> String {
        format!("hello {}", name)
    }

    fn app() -> App {
        App::new()
            .state("quest".to_string())
            .route("/echo", post(echo))
            .route("/greet", get(greeting))
    }

    #[tokio::test]
    async fn test_call_starts_response_once_and_yields_body() {
        let app = app();
        let mut recorder = Recorder::default();

        let body = app
            .call(context("POST", "/echo", r#"{"n":1}"#), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.calls, 1);
        assert_eq!(recorder.status.as_deref(), Some("200 OK"));
        assert!(recorder
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
        assert_eq!(drain(body), br#"{"n":1}"#.to_vec());
    }

    #[tokio::test]
    async fn test_state_reaches_handler() {
        let mut recorder = Recorder::default();
        let body = app().call(context("GET", "/greet", ""), &mut recorder).await.unwrap();
        assert_eq!(drain(body), b"hello quest".to_vec());
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let mut recorder = Recorder::default();
        let body = app().call(context("GET", "/missing", ""), &mut recorder).await.unwrap();

        assert_eq!(recorder.status.as_deref(), Some("404 Not Found"));
        let value: serde_json::Value = serde_json::from_slice(&drain(body)).unwrap();
        assert_eq!(value["error"]["type"], "not_found");
    }

    #[tokio::test]
    async fn test_wrong_method_is_405_and_options_is_200() {
        let app = app();

        let mut recorder = Recorder::default();
        app.call(context("DELETE", "/echo", ""), &mut recorder).await.unwrap();
        assert_eq!(recorder.status.as_deref(), Some("405 Method Not Allowed"));
        assert!(recorder
            .headers
            .contains(&("allow".to_string(), "POST, OPTIONS".to_string())));

        let mut recorder = Recorder::default();
        let body = app.call(context("OPTIONS", "/echo", ""), &mut recorder).await.unwrap();
        assert_eq!(recorder.status.as_deref(), Some("200 OK"));
        assert!(drain(body).is_empty());
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let mut recorder = Recorder::default();
        app().call(context("POST", "/echo", "{oops"), &mut recorder).await.unwrap();
        assert_eq!(recorder.status.as_deref(), Some("400 Bad Request"));
    }

    #[tokio::test]
    async fn test_content_length_header_matches_body() {
        let mut recorder = Recorder::default();
        let body = app().call(context("GET", "/greet", ""), &mut recorder).await.unwrap();
        let len = drain(body).len().to_string();
        assert!(recorder.headers.contains(&("content-length".to_string(), len)));
    }
}
