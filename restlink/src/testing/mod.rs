//! Testing utilities for restlink applications.
//!
//! [`TestClient`] serves an app on a random local port so tests can talk
//! to it over real HTTP.

mod client;

pub use client::{TestClient, TestRequestBuilder, TestResponse};
