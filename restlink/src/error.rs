//! Error handling for exposed resources.
//!
//! [`Error`] is the request-time error: anything a resource, a store or the
//! transfer layer raises while serving a call. It carries the HTTP status it
//! should be answered with and converts into a JSON response of the form
//! `{"error": "<message>", "trace_id": "<id>"}`.
//!
//! [`ExposeError`] is the registration-time error returned when a resource
//! description cannot be compiled into routes.
//!
//! # Domain Errors
//!
//! For type-safe domain errors, implement the [`IntoApiError`] trait:
//!
//! ```rust
//! use restlink::error::{Error, IntoApiError};
//!
//! enum CanalError {
//!     Drained(u64),
//!     Locked,
//! }
//!
//! impl IntoApiError for CanalError {
//!     fn into_api_error(self) -> Error {
//!         match self {
//!             CanalError::Drained(id) => Error::not_found(format!("canal {} is drained", id)),
//!             CanalError::Locked => Error::forbidden("canal is locked"),
//!         }
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;

use crate::response::{BoxBody, IntoResponse};
use bytes::Bytes;
use http_body_util::Full;

/// The JSON structure returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Optional additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Unique identifier for request tracing.
    pub trace_id: String,
}

/// The request-time error type.
///
/// Raising one anywhere below a transfer function cuts the call short; the
/// host answers with `status` and the message.
///
/// # Examples
///
/// ```
/// use restlink::error::Error;
///
/// let err = Error::not_found("canal ID=4 does not exist.");
/// assert_eq!(err.status, 404);
///
/// let err = Error::bad_request("validation failed")
///     .with_details(serde_json::json!({"field": "width"}));
/// assert!(err.details.is_some());
/// ```
#[derive(Debug)]
pub struct Error {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error details.
    pub details: Option<serde_json::Value>,
    /// Optional trace ID for this error.
    pub trace_id: Option<String>,
}

impl Error {
    /// Creates a new error with the given status code, code, and message.
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
            trace_id: None,
        }
    }

    /// Adds additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the trace ID for this error.
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Creates a 400 Bad Request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, "BAD_REQUEST", message)
    }

    /// Creates a 400 error for payloads rejected by deserialization or validation.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(400, "VALIDATION_ERROR", message)
    }

    /// Creates a 401 Unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, "UNAUTHORIZED", message)
    }

    /// Creates a 403 Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, "FORBIDDEN", message)
    }

    /// Creates a 404 Not Found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, "NOT_FOUND", message)
    }

    /// Creates a 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, "INTERNAL_ERROR", message)
    }

    /// Creates a 501 Not Implemented error.
    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::new(501, "NOT_IMPLEMENTED", message)
    }

    /// Converts this error to an ErrorResponse with the given trace ID.
    pub fn to_response(&self, trace_id: String) -> ErrorResponse {
        ErrorResponse {
            error: self.message.clone(),
            details: self.details.clone(),
            trace_id,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// Trait for converting domain errors into API errors.
///
/// Implement this trait on your domain error types to enable automatic
/// conversion to [`Error`], so `?` works inside resource hooks.
pub trait IntoApiError {
    /// Converts this error into an API error.
    fn into_api_error(self) -> Error;
}

impl<T: IntoApiError> From<T> for Error {
    fn from(err: T) -> Self {
        err.into_api_error()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> http::Response<BoxBody> {
        // Use existing trace_id or generate new one as fallback
        let trace_id = self
            .trace_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let response = self.to_response(trace_id);
        let body = serde_json::to_vec(&response).unwrap_or_default();

        let status = http::StatusCode::from_u16(self.status)
            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR);

        let mut res = http::Response::new(Full::new(Bytes::from(body)));
        *res.status_mut() = status;
        res.headers_mut().insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );
        res
    }
}

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while compiling a resource into routes and documentation.
#[derive(Debug, Clone, PartialEq)]
pub enum ExposeError {
    /// The resource declared an empty rest path.
    MissingPath,
    /// The resource name collides with a route the exposer reserves.
    ReservedName(String),
    /// An allowed method has no entry in the resource's method map.
    InvalidMethod {
        resource: String,
        method: String,
        valid: Vec<String>,
    },
    /// A verb and route shape combination has no argument convention.
    UnsupportedRoute {
        resource: String,
        method: String,
        shape: &'static str,
    },
    /// The action mapped to a route consumes different arguments than the
    /// route provides.
    ActionMismatch {
        resource: String,
        method: String,
        shape: &'static str,
        action: &'static str,
    },
    /// A resource of the same name is already registered under the API.
    DuplicateResource { name: String, api: String },
}

impl fmt::Display for ExposeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExposeError::MissingPath => write!(f, "Resource has not defined a rest path"),
            ExposeError::ReservedName(name) => {
                write!(f, "Resource name '{}' is reserved by the exposer", name)
            }
            ExposeError::InvalidMethod {
                resource,
                method,
                valid,
            } => write!(
                f,
                "Invalid method {} on {}. Must be one of '{}'.",
                method,
                resource,
                valid.join(", ")
            ),
            ExposeError::UnsupportedRoute {
                resource,
                method,
                shape,
            } => write!(
                f,
                "{} can not expose {} on {} routes",
                resource, method, shape
            ),
            ExposeError::ActionMismatch {
                resource,
                method,
                shape,
                action,
            } => write!(
                f,
                "{} maps {} on {} routes to '{}', which takes different arguments",
                resource, method, shape, action
            ),
            ExposeError::DuplicateResource { name, api } => {
                write!(f, "Resource of name '{}' already registered to {}.", name, api)
            }
        }
    }
}

impl std::error::Error for ExposeError {}

/// A type alias for `Result<T, ExposeError>`.
pub type ExposeResult<T> = std::result::Result<T, ExposeError>;
