//! Route metadata for introspection.

use serde::Serialize;

/// Metadata about a registered route.
///
/// # Examples
///
/// ```
/// use restlink::introspection::RouteInfo;
///
/// let info = RouteInfo::new("GET", "/api/v1/canal/:id", "api_v1_canal_GET_s");
/// assert_eq!(info.method, "GET");
/// assert_eq!(info.path, "/api/v1/canal/:id");
/// ```
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RouteInfo {
    /// The HTTP method (GET, POST, PUT, DELETE, etc.).
    pub method: String,
    /// The path pattern with parameters (e.g., "/api/v1/canal/:id").
    pub path: String,
    /// The endpoint name of the route.
    pub handler_name: String,
}

impl RouteInfo {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        handler_name: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            handler_name: handler_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_info_serialize() {
        let info = RouteInfo::new("DELETE", "/api/v1/lock/:id", "api_v1_lock_DELETE_s");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "DELETE",
                "path": "/api/v1/lock/:id",
                "handler_name": "api_v1_lock_DELETE_s",
            })
        );
    }
}
