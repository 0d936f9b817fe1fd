//! Introspection endpoint for exposing route metadata.

use std::sync::Arc;

use http::{Request, Response, StatusCode};
use hyper::body::Incoming;

use crate::extract::PathParams;
use crate::introspection::RouteInfo;
use crate::response::{BoxBody, IntoResponse, json_response};
use crate::state::AppState;

/// Where the route listing is served.
pub const ROUTES_PATH: &str = "/.__restlink/routes";

/// Snapshot of the router's routes, stored in application state when
/// introspection is enabled.
#[derive(Debug, Clone, Default)]
pub struct RouteRegistry {
    routes: Vec<RouteInfo>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    pub fn with_routes(routes: Vec<RouteInfo>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[RouteInfo] {
        &self.routes
    }
}

/// Returns all registered routes as JSON.
pub async fn list_routes(
    _req: Request<Incoming>,
    _params: PathParams,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    match state.get::<RouteRegistry>() {
        Some(registry) => match serde_json::to_value(registry.routes()) {
            Ok(routes) => json_response(StatusCode::OK, &routes),
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        },
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_registry_with_routes() {
        let registry = RouteRegistry::with_routes(vec![
            RouteInfo::new("GET", "/api/v1/docs", "api_v1_docs"),
            RouteInfo::new("GET", "/api/v1/canal", "api_v1_canal_GET_g"),
        ]);
        assert_eq!(registry.routes().len(), 2);
        assert_eq!(registry.routes()[1].handler_name, "api_v1_canal_GET_g");
        assert!(RouteRegistry::new().routes().is_empty());
    }
}
