//! Invocation entry point

use crate::assemble::assemble;
use crate::config::AdapterConfig;
use crate::cors::apply_cors;
use crate::environ::build_context;
use crate::error::{error_chain, AdapterError, BindError};
use crate::event::{InvocationEvent, InvocationResponse};
use crate::normalize::normalize;
use crate::sink::invoke;
use futures_util::FutureExt;
use lambda_runtime::{service_fn, LambdaEvent};
use quest_core::Application;
use serde_json::{json, Value};
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error};

/// Locates and builds the embedded application.
///
/// Called on the first invocation of a process, and again on the next
/// invocation whenever it fails.
pub trait ApplicationLoader: Send + Sync + 'static {
    type App: Application;

    fn load(&self) -> Result<Self::App, BindError>;
}

impl<F, A> ApplicationLoader for F
where
    F: Fn() -> Result<A, BindError> + Send + Sync + 'static,
    A: Application,
{
    type App = A;

    fn load(&self) -> Result<A, BindError> {
        self()
    }
}

/// Single failure boundary around one invocation.
///
/// Never fails: every error becomes a 500 response carrying the CORS
/// headers.
pub struct InvocationHandler<L: ApplicationLoader> {
    loader: L,
    app: OnceCell<L::App>,
    config: AdapterConfig,
}

impl<L: ApplicationLoader> InvocationHandler<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            app: OnceCell::new(),
            config: AdapterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AdapterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Handle a raw event payload
    pub async fn handle_value(&self, payload: Value) -> InvocationResponse {
        match serde_json::from_value::<InvocationEvent>(payload) {
            Ok(event) => self.handle(event).await,
            Err(err) => runtime_failure(AdapterError::from(err)),
        }
    }

    pub async fn handle(&self, event: InvocationEvent) -> InvocationResponse {
        let app = match self.bind().await {
            Ok(app) => app,
            Err(err) => {
                error!(
                    error = %err,
                    lookup_path = %err.lookup_path,
                    "Failed to load application"
                );
                return import_error_response(&err);
            }
        };

        match self.process(app, event).await {
            Ok(response) => response,
            Err(err) => runtime_failure(err),
        }
    }

    async fn bind(&self) -> Result<&L::App, BindError> {
        self.app
            .get_or_try_init(|| async {
                std::panic::catch_unwind(AssertUnwindSafe(|| self.loader.load())).unwrap_or_else(
                    |panic| {
                        Err(BindError::new(
                            format!("application loader panicked: {}", panic_message(&*panic)),
                            "<loader>",
                        ))
                    },
                )
            })
            .await
    }

    async fn process(
        &self,
        app: &L::App,
        event: InvocationEvent,
    ) -> Result<InvocationResponse, AdapterError> {
        let outcome = AssertUnwindSafe(async {
            let request = normalize(event, &self.config.routing_prefix);
            debug!(method = %request.method, path = %request.path, "Invocation received");

            let sink = invoke(app, build_context(request)).await?;
            assemble(sink)
        })
        .catch_unwind()
        .await;

        outcome.unwrap_or_else(|panic| Err(AdapterError::Panicked(panic_message(&*panic))))
    }
}

/// Register `handler` with the Lambda runtime and serve until shutdown.
pub async fn run<L: ApplicationLoader>(
    handler: InvocationHandler<L>,
) -> Result<(), lambda_runtime::Error> {
    let handler = Arc::new(handler);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move {
            let response = handler.handle_value(event.payload).await;
            Ok::<InvocationResponse, lambda_runtime::Error>(response)
        }
    }))
    .await
}

fn runtime_failure(err: AdapterError) -> InvocationResponse {
    let chain = error_chain(&err);
    error!(error = %chain, "Invocation failed");
    error_response(json!({ "error": format!("Internal server error: {}", chain) }))
}

fn import_error_response(err: &BindError) -> InvocationResponse {
    error_response(json!({
        "error": format!("Import error: {}", err.reason),
        "backend_path": err.lookup_path,
    }))
}

fn error_response(body: Value) -> InvocationResponse {
    let mut headers = BTreeMap::from([("Content-Type".to_string(), "application/json".to_string())]);
    apply_cors(&mut headers);

    InvocationResponse {
        status_code: 500,
        headers,
        body: body.to_string(),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
