//! Response types and conversion traits.
//!
//! Every exposed route answers with JSON; [`IntoResponse`] is how transfer
//! results, errors and the odd plain status reach the wire.

use bytes::Bytes;
use http::{HeaderValue, Response, StatusCode, header};
use http_body_util::Full;
use serde_json::Value;

/// The body type used for HTTP responses.
pub type BoxBody = Full<Bytes>;

/// Trait for types that can be converted into an HTTP response.
///
/// # Examples
///
/// ```
/// use restlink::response::{BoxBody, IntoResponse};
/// use http::Response;
///
/// struct Lock {
///     id: u32,
/// }
///
/// impl IntoResponse for Lock {
///     fn into_response(self) -> Response<BoxBody> {
///         serde_json::json!({ "lock": self.id }).into_response()
///     }
/// }
/// ```
pub trait IntoResponse {
    /// Converts this type into an HTTP response.
    fn into_response(self) -> Response<BoxBody>;
}

/// Builds a JSON response with the given status.
pub fn json_response(status: StatusCode, value: &Value) -> Response<BoxBody> {
    let body = serde_json::to_vec(value).unwrap_or_default();
    let mut res = Response::new(Full::new(Bytes::from(body)));
    *res.status_mut() = status;
    res.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    res
}

impl IntoResponse for Response<BoxBody> {
    fn into_response(self) -> Response<BoxBody> {
        self
    }
}

impl IntoResponse for Value {
    fn into_response(self) -> Response<BoxBody> {
        json_response(StatusCode::OK, &self)
    }
}

impl IntoResponse for &str {
    fn into_response(self) -> Response<BoxBody> {
        self.to_owned().into_response()
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response<BoxBody> {
        let mut res = Response::new(Full::new(Bytes::from(self)));
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        res
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response<BoxBody> {
        let mut res = Response::new(Full::new(Bytes::new()));
        *res.status_mut() = self;
        res
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for std::result::Result<T, E> {
    fn into_response(self) -> Response<BoxBody> {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}
