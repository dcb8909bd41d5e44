//! Router implementation using radix tree (matchit)
//!
//! Routes are declared with `{param}` placeholders and several methods can
//! share one path:
//!
//! ```rust,ignore
//! let router = Router::new()
//!     .route("/health", get(health))
//!     .route("/api/users", get(list_users).post(create_user))
//!     .nest("/api/auth", auth_routes());
//! ```
//!
//! Registering two routes that the radix tree cannot tell apart panics at
//! startup with both paths named in the message.

use crate::handler::{into_boxed_handler, BoxedHandler, Handler};
use http::{Extensions, Method};
use matchit::Router as MatchitRouter;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A registered route, as written at registration time
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub path: String,
    pub methods: Vec<Method>,
}

/// Two routes collided in the radix tree
#[derive(Debug, Clone)]
pub struct RouteConflictError {
    pub new_path: String,
    pub existing_path: String,
    pub details: String,
}

impl fmt::Display for RouteConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route conflict: `{}` collides with existing `{}` ({})",
            self.new_path, self.existing_path, self.details
        )
    }
}

impl std::error::Error for RouteConflictError {}

/// HTTP method router for a single path
#[derive(Clone, Default)]
pub struct MethodRouter {
    handlers: HashMap<Method, BoxedHandler>,
}

macro_rules! method_fns {
    ($($name:ident => $method:ident),+ $(,)?) => {
        impl MethodRouter {
            $(
                #[doc = concat!("Also handle `", stringify!($method), "` on this path")]
                pub fn $name<H, T>(self, handler: H) -> Self
                where
                    H: Handler<T>,
                    T: 'static,
                {
                    self.on(Method::$method, handler)
                }
            )+
        }

        $(
            #[doc = concat!("Route `", stringify!($method), "` requests to `handler`")]
            pub fn $name<H, T>(handler: H) -> MethodRouter
            where
                H: Handler<T>,
                T: 'static,
            {
                MethodRouter::new().on(Method::$method, handler)
            }
        )+
    };
}

method_fns!(
    get => GET,
    post => POST,
    put => PUT,
    patch => PATCH,
    delete => DELETE,
);

impl MethodRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle `method` with `handler`.
    ///
    /// Panics if the method already has a handler on this path.
    pub fn on<H, T>(mut self, method: Method, handler: H) -> Self
    where
        H: Handler<T>,
        T: 'static,
    {
        if self.handlers.contains_key(&method) {
            panic!("Duplicate handler for method {} on the same path", method);
        }
        self.handlers.insert(method, into_boxed_handler(handler));
        self
    }

    pub(crate) fn get_handler(&self, method: &Method) -> Option<&BoxedHandler> {
        self.handlers.get(method)
    }

    /// Methods with a handler, in a stable order
    pub(crate) fn allowed_methods(&self) -> Vec<Method> {
        let mut methods: Vec<Method> = self.handlers.keys().cloned().collect();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        methods
    }
}

/// Result of route matching
pub(crate) enum RouteMatch<'a> {
    Found {
        handler: &'a BoxedHandler,
        params: HashMap<String, String>,
    },
    NotFound,
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
}

/// Main router
pub struct Router {
    inner: MatchitRouter<MethodRouter>,
    state: Arc<Extensions>,
    /// Keyed by matchit path, kept so routers can be nested
    routes: HashMap<String, (RouteInfo, MethodRouter)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            inner: MatchitRouter::new(),
            state: Arc::new(Extensions::new()),
            routes: HashMap::new(),
        }
    }

    /// Add a route
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.insert(path.to_string(), method_router);
        self
    }

    fn insert(&mut self, path: String, method_router: MethodRouter) {
        let matchit_path = convert_path_params(&path);
        let info = RouteInfo {
            path: path.clone(),
            methods: method_router.allowed_methods(),
        };

        if let Err(e) = self.inner.insert(matchit_path.clone(), method_router.clone()) {
            let existing_path = self
                .find_conflicting_route(&matchit_path)
                .map(|info| info.path.clone())
                .unwrap_or_else(|| "<unknown>".to_string());

            panic!(
                "{}",
                RouteConflictError {
                    new_path: path,
                    existing_path,
                    details: e.to_string(),
                }
            );
        }

        self.routes.insert(matchit_path, (info, method_router));
    }

    fn find_conflicting_route(&self, matchit_path: &str) -> Option<&RouteInfo> {
        if let Some((info, _)) = self.routes.get(matchit_path) {
            return Some(info);
        }

        let normalized_new = normalize_path_for_comparison(matchit_path);
        self.routes
            .iter()
            .find(|(registered, _)| normalize_path_for_comparison(registered) == normalized_new)
            .map(|(_, (info, _))| info)
    }

    /// Add application state, available to handlers through [`State`](crate::State)
    pub fn state<S: Clone + Send + Sync + 'static>(mut self, state: S) -> Self {
        Arc::make_mut(&mut self.state).insert(state);
        self
    }

    /// Mount every route of `router` under `prefix`.
    ///
    /// State of the nested router is not carried over; register state on
    /// the outer router.
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        let prefix = normalize_prefix(prefix);

        for (_, (info, method_router)) in router.routes {
            let path = if info.path == "/" {
                prefix.clone()
            } else if prefix == "/" {
                info.path
            } else {
                format!("{}{}", prefix, info.path)
            };
            self.insert(path, method_router);
        }

        self
    }

    pub(crate) fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        let Ok(matched) = self.inner.at(path) else {
            return RouteMatch::NotFound;
        };

        let method_router = matched.value;
        match method_router.get_handler(method) {
            Some(handler) => RouteMatch::Found {
                handler,
                params: matched
                    .params
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            None => RouteMatch::MethodNotAllowed {
                allowed: method_router.allowed_methods(),
            },
        }
    }

    pub(crate) fn state_ref(&self) -> Arc<Extensions> {
        self.state.clone()
    }

    /// Registered routes, sorted by path
    pub fn routes(&self) -> Vec<&RouteInfo> {
        let mut routes: Vec<&RouteInfo> = self.routes.values().map(|(info, _)| info).collect();
        routes.sort_by(|a, b| a.path.cmp(&b.path));
        routes
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert `{param}` placeholders to matchit's `:param`
fn convert_path_params(path: &str) -> String {
    path.chars()
        .filter(|&ch| ch != '}')
        .map(|ch| if ch == '{' { ':' } else { ch })
        .collect()
}

/// Replace parameter names with a placeholder
fn normalize_path_for_comparison(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            ':' => {
                in_param = true;
                result.push_str(":_");
            }
            '/' => {
                in_param = false;
                result.push('/');
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }

    result
}

/// One leading slash, no trailing or doubled slashes; empty becomes `/`.
pub(crate) fn normalize_prefix(prefix: &str) -> String {
    let segments: Vec<&str> = prefix.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }

    segments.iter().fold(String::with_capacity(prefix.len() + 1), |mut acc, s| {
        acc.push('/');
        acc.push_str(s);
        acc
    })
}
