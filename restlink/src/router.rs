//! HTTP routing.
//!
//! The [`Router`] type collects route definitions and matches incoming
//! requests to the appropriate handlers. Routes compiled by an
//! [`Exposer`](crate::exposer::Exposer) end up here next to hand-written
//! ones.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::{Method, Request, Response, StatusCode};
use hyper::body::Incoming;

use crate::extract::{PathParams, extract_path_params};
use crate::introspection::RouteInfo;
use crate::response::{BoxBody, IntoResponse};
use crate::state::AppState;

type BoxFuture = Pin<Box<dyn Future<Output = Response<BoxBody>> + Send>>;
type HandlerFn =
    Box<dyn Fn(Request<Incoming>, PathParams, Arc<AppState>) -> BoxFuture + Send + Sync>;

pub(crate) struct Route {
    pub(crate) pattern: String,
    pub(crate) name: String,
    handler: HandlerFn,
}

/// The HTTP router for matching requests to handlers.
///
/// Use path parameters with the `:param` syntax. When several patterns
/// match a path, the one with more literal segments is taken, so
/// `/canal/locks` beats `/canal/:id`. Otherwise the earlier route wins.
///
/// # Examples
///
/// ```
/// use restlink::prelude::*;
///
/// let router = Router::new()
///     .get("/", |_, _, _| async { "Hello!" })
///     .get_named("/health", "health", |_, _, _| async { StatusCode::OK });
///
/// assert_eq!(router.routes()[1].handler_name, "health");
/// ```
pub struct Router {
    pub(crate) routes: Vec<(Method, Route)>,
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub(crate) fn push<F, Fut, Out>(&mut self, method: Method, pattern: &str, name: &str, handler: F)
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        let handler = Box::new(
            move |req: Request<Incoming>, params: PathParams, state: Arc<AppState>| {
                let handler = handler.clone();
                Box::pin(async move {
                    let output = handler(req, params, state).await;
                    output.into_response()
                }) as BoxFuture
            },
        );

        let route = Route {
            pattern: pattern.to_string(),
            name: name.to_string(),
            handler,
        };

        self.routes.push((method, route));
    }

    /// Adds a named route with the given HTTP method and pattern.
    pub fn route_named<F, Fut, Out>(
        mut self,
        method: Method,
        pattern: &str,
        name: &str,
        handler: F,
    ) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.push(method, pattern, name, handler);
        self
    }

    /// Adds a route with the given HTTP method and pattern. It is listed
    /// under the name `handler`.
    pub fn route<F, Fut, Out>(self, method: Method, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route_named(method, pattern, "handler", handler)
    }

    /// Adds a GET route.
    pub fn get<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::GET, pattern, handler)
    }

    /// Adds a named GET route.
    pub fn get_named<F, Fut, Out>(self, pattern: &str, name: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route_named(Method::GET, pattern, name, handler)
    }

    /// Adds a POST route.
    pub fn post<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::POST, pattern, handler)
    }

    /// Adds a PUT route.
    pub fn put<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::PUT, pattern, handler)
    }

    /// Adds a DELETE route.
    pub fn delete<F, Fut, Out>(self, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request<Incoming>, PathParams, Arc<AppState>) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Out> + Send + 'static,
        Out: IntoResponse + 'static,
    {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Lists the routes in matching order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|(method, route)| RouteInfo::new(method.as_str(), &route.pattern, &route.name))
            .collect()
    }

    /// Handles an incoming request by matching it to a route.
    pub async fn handle(&self, req: Request<Incoming>, state: &Arc<AppState>) -> Response<BoxBody> {
        let found = self.find(req.method(), req.uri().path());
        match found {
            Some((route, params)) => (route.handler)(req, params, state.clone()).await,
            None => StatusCode::NOT_FOUND.into_response(),
        }
    }

    /// Picks the route for `method` and `path`. Among matching patterns the
    /// one with the most literal segments wins; ties go to the earlier route.
    pub(crate) fn find(&self, method: &Method, path: &str) -> Option<(&Route, PathParams)> {
        let mut best: Option<(usize, &Route, PathParams)> = None;

        for (route_method, route) in &self.routes {
            if route_method != method {
                continue;
            }
            let Some(params) = extract_path_params(&route.pattern, path) else {
                continue;
            };

            let literals = literal_segments(&route.pattern);
            if best.as_ref().is_none_or(|(most, _, _)| literals > *most) {
                best = Some((literals, route, params));
            }
        }

        best.map(|(_, route, params)| (route, params))
    }
}

fn literal_segments(pattern: &str) -> usize {
    pattern
        .split('/')
        .filter(|segment| !segment.is_empty() && !segment.starts_with(':'))
        .count()
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_default() {
        let router = Router::default();
        assert!(router.routes.is_empty());
    }

    #[test]
    fn test_router_verbs() {
        let router = Router::new()
            .get("/canal", |_req, _params, _state| async { StatusCode::OK })
            .post("/canal", |_req, _params, _state| async {
                StatusCode::CREATED
            })
            .put("/canal/:id", |_req, _params, _state| async { StatusCode::OK })
            .delete("/canal/:id", |_req, _params, _state| async {
                StatusCode::NO_CONTENT
            });

        let methods: Vec<&Method> = router.routes.iter().map(|(m, _)| m).collect();
        assert_eq!(
            methods,
            [&Method::GET, &Method::POST, &Method::PUT, &Method::DELETE]
        );
        assert_eq!(router.routes[2].1.pattern, "/canal/:id");
    }

    #[test]
    fn test_router_routes_listing() {
        let router = Router::new()
            .get("/canal", |_req, _params, _state| async { StatusCode::OK })
            .route_named(
                Method::DELETE,
                "/canal/:id",
                "drain_canal",
                |_req, _params, _state| async { StatusCode::NO_CONTENT },
            );

        assert_eq!(
            router.routes(),
            vec![
                RouteInfo::new("GET", "/canal", "handler"),
                RouteInfo::new("DELETE", "/canal/:id", "drain_canal"),
            ]
        );
    }

    #[test]
    fn test_router_push_keeps_order() {
        let mut router = Router::new();
        router.push(Method::GET, "/first", "first", |_req, _params, _state| async {
            StatusCode::OK
        });
        router.push(Method::GET, "/second", "second", |_req, _params, _state| async {
            StatusCode::OK
        });

        assert_eq!(router.routes[0].1.name, "first");
        assert_eq!(router.routes[1].1.pattern, "/second");
    }

    #[test]
    fn test_router_prefers_literal_segments() {
        let router = Router::new()
            .get_named("/canal/:id", "canal", |_req, _params, _state| async {
                StatusCode::OK
            })
            .get_named("/canal/locks", "locks", |_req, _params, _state| async {
                StatusCode::OK
            })
            .get_named("/canal/:id/gates", "gates", |_req, _params, _state| async {
                StatusCode::OK
            });

        let (route, params) = router.find(&Method::GET, "/canal/locks").unwrap();
        assert_eq!(route.name, "locks");
        assert!(params.is_empty());

        let (route, params) = router.find(&Method::GET, "/canal/7").unwrap();
        assert_eq!(route.name, "canal");
        assert_eq!(params.get("id").map(String::as_str), Some("7"));

        let (route, _) = router.find(&Method::GET, "/canal/locks/gates").unwrap();
        assert_eq!(route.name, "gates");

        assert!(router.find(&Method::POST, "/canal/locks").is_none());
    }

    #[test]
    fn test_router_ties_go_to_first_route() {
        let router = Router::new()
            .get_named("/:a/locks", "first", |_req, _params, _state| async {
                StatusCode::OK
            })
            .get_named("/canal/:b", "second", |_req, _params, _state| async {
                StatusCode::OK
            });

        let (route, _) = router.find(&Method::GET, "/canal/locks").unwrap();
        assert_eq!(route.name, "first");
    }
}
