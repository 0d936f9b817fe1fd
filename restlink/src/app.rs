use std::net::SocketAddr;

use crate::exposer::Exposer;
use crate::introspection::{ROUTES_PATH, RouteRegistry, list_routes};
use crate::middleware::{Middleware, MiddlewareStack, RequestLogMiddleware, TraceIdMiddleware};
use crate::observability::TracingConfig;
use crate::router::Router;
use crate::server::serve;
use crate::state::AppState;

/// The application: a router, the routes of any exposers installed into
/// it, shared state and middleware.
///
/// ```ignore
/// use restlink::prelude::*;
///
/// let api = Api::new("api", "v1", "Waterways");
/// let mut exposer = Exposer::new().store(Arc::new(store));
/// exposer.register(&api, canals)?;
///
/// Restlink::new()
///     .with_tracing(TracingConfig::new())
///     .exposer(exposer)
///     .listen("127.0.0.1:3000")
///     .await
/// ```
pub struct Restlink {
    pub(crate) router: Router,
    pub(crate) state: AppState,
    pub(crate) middlewares: MiddlewareStack,
    pub(crate) introspection: bool,
}

impl Restlink {
    /// An app with trace id propagation and request logging.
    pub fn new() -> Self {
        Self::bare()
            .middleware(TraceIdMiddleware::new())
            .middleware(RequestLogMiddleware::new())
    }

    /// An app without middleware.
    pub fn bare() -> Self {
        Self {
            router: Router::new(),
            state: AppState::new(),
            middlewares: MiddlewareStack::new(),
            introspection: false,
        }
    }

    /// Replaces the router. Install exposers afterwards.
    pub fn router(mut self, router: Router) -> Self {
        self.router = router;
        self
    }

    /// Adds the routes compiled by `exposer`.
    pub fn exposer(mut self, exposer: Exposer) -> Self {
        exposer.install(&mut self.router);
        self
    }

    pub fn state<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.state = self.state.with(value);
        self
    }

    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middlewares.add(middleware);
        self
    }

    /// Serves the route listing at `/.__restlink/routes`.
    pub fn with_introspection(mut self, enabled: bool) -> Self {
        self.introspection = enabled;
        self
    }

    pub fn with_tracing(self, config: TracingConfig) -> Self {
        config.init();
        self
    }

    /// Adds the introspection route if enabled and splits the app into what
    /// the server needs.
    pub(crate) fn into_parts(self) -> (Router, AppState, MiddlewareStack) {
        let Self {
            mut router,
            mut state,
            middlewares,
            introspection,
        } = self;

        if introspection {
            state.insert(RouteRegistry::with_routes(router.routes()));
            router = router.get_named(ROUTES_PATH, "list_routes", list_routes);
        }

        (router, state, middlewares)
    }

    pub async fn listen(self, addr: &str) -> std::io::Result<()> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let (router, state, middlewares) = self.into_parts();
        serve(router, state, middlewares, addr).await
    }
}

impl Default for Restlink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Api;
    use crate::resource::Resource;
    use http::{Method, StatusCode};

    struct Weir;

    impl Resource for Weir {
        fn rest_path(&self) -> &str {
            "weir"
        }

        fn allowed_methods(&self) -> &[Method] {
            &[Method::DELETE]
        }
    }

    #[test]
    fn test_new_has_default_middleware() {
        assert_eq!(Restlink::new().middlewares.len(), 2);
        assert!(Restlink::bare().middlewares.is_empty());
    }

    #[test]
    fn test_exposer_routes_installed() {
        let api = Api::new("api", "v1", "Waterways");
        let mut exposer = Exposer::new();
        exposer.register(&api, Weir).unwrap();

        let app = Restlink::new()
            .router(Router::new().get("/health", |_, _, _| async { StatusCode::OK }))
            .exposer(exposer);

        let paths: Vec<String> = app.router.routes().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, ["/health", "/api/v1/docs", "/api/v1/weir/:id"]);
    }

    #[test]
    fn test_introspection_route() {
        let (router, state, _) = Restlink::new().with_introspection(true).into_parts();

        let routes = router.routes();
        assert_eq!(routes.last().unwrap().path, ROUTES_PATH);
        assert!(state.get::<RouteRegistry>().unwrap().routes().is_empty());

        let (router, state, _) = Restlink::new().into_parts();
        assert!(router.routes().is_empty());
        assert!(!state.contains::<RouteRegistry>());
    }

    #[test]
    fn test_state() {
        let app = Restlink::new().state(42u32);
        assert_eq!(app.state.get::<u32>(), Some(&42));
    }

    #[tokio::test]
    async fn test_listen_rejects_bad_address() {
        let err = Restlink::new().listen("not an address").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    }
}
