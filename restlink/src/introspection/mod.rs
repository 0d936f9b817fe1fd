//! Route listing.
//!
//! When enabled on the app, `GET /.__restlink/routes` answers with every
//! registered route, compiled resource routes included.

mod endpoint;
mod route_info;

pub use endpoint::{ROUTES_PATH, RouteRegistry, list_routes};
pub use route_info::RouteInfo;
