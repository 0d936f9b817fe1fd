//! Binding of compiled routes to the HTTP router.
//!
//! Every [`RouteRule`] becomes a router handler that decodes the request
//! into a [`Call`], runs the rule's transfer function and encodes the
//! outcome: `200` with the JSON result, or the error's status with
//! `{"error": ..., "trace_id": ...}`.
//!
//! Query values are percent-decoded once more after the usual form
//! decoding and then read as JSON, so `?filter=%7B%22width%22%3A3%7D`
//! arrives as an object. Values that are not JSON stay strings.

use std::sync::Arc;

use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tracing::{error, warn};

use crate::context::{CallContext, RequestContext, RequestInfo};
use crate::error::{Error, Result};
use crate::exposer::{Call, Gateway, RouteRule};
use crate::extract::PathParams;
use crate::resource::Params;
use crate::response::{BoxBody, IntoResponse, json_response};
use crate::router::Router;

/// Anything compiled rules can be installed into.
pub trait RouteSink {
    fn add_rule(&mut self, rule: RouteRule, gateway: Arc<Gateway>);
}

impl RouteSink for Router {
    fn add_rule(&mut self, rule: RouteRule, gateway: Arc<Gateway>) {
        let method = rule.method.clone();
        let pattern = rule.rule.clone();
        let name = rule.endpoint.clone();
        let rule = Arc::new(rule);

        self.push(method, &pattern, &name, move |req, params, _state| {
            let rule = rule.clone();
            let gateway = gateway.clone();
            async move { dispatch(&rule, &gateway, req, params).await }
        });
    }
}

/// Runs `rule` for a request.
pub async fn dispatch(
    rule: &RouteRule,
    gateway: &Gateway,
    req: Request<Incoming>,
    path: PathParams,
) -> Response<BoxBody> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(error = %e, endpoint = %rule.endpoint, "failed to read request body");
            Bytes::new()
        }
    };
    dispatch_parts(rule, gateway, &parts, &body, &path).await
}

/// Runs `rule` for a request that has already been read.
pub async fn dispatch_parts(
    rule: &RouteRule,
    gateway: &Gateway,
    parts: &Parts,
    body: &Bytes,
    path: &PathParams,
) -> Response<BoxBody> {
    let request = parts
        .extensions
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();
    let trace_id = request.trace_id.clone();

    let query = match decode_query(parts.uri.query()) {
        Ok(query) => query,
        Err(e) => return e.with_trace_id(trace_id).into_response(),
    };

    let accessor = gateway.authenticate(&RequestInfo::new(parts, &query));
    let ctx = CallContext::new(request)
        .with_accessor(accessor)
        .with_store(gateway.store());

    let call = Call {
        ctx,
        id: path.get("id").map(|raw| path_id(raw)),
        data: decode_body(&parts.headers, body),
        params: query,
    };

    match rule.call(call).await {
        Ok(value) => json_response(StatusCode::OK, &value),
        Err(e) => {
            if e.status >= 500 {
                error!(endpoint = %rule.endpoint, status = e.status, error = %e, "request failed");
            }
            e.with_trace_id(trace_id).into_response()
        }
    }
}

/// Decodes a query string into JSON values.
pub fn decode_query(query: Option<&str>) -> Result<Params> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query.unwrap_or(""))
        .map_err(|e| Error::bad_request(format!("invalid query: {}", e)))?;

    let mut params = Params::new();
    for (key, raw) in pairs {
        let decoded = percent_decode_str(&raw).decode_utf8_lossy().into_owned();
        let value = serde_json::from_str(&decoded).unwrap_or(Value::String(decoded));
        params.entry(key).or_insert(value);
    }
    Ok(params)
}

/// Reads a JSON body. Anything else, or JSON that does not parse, is no
/// body at all.
pub fn decode_body(headers: &HeaderMap, body: &Bytes) -> Option<Value> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false);

    if !is_json || body.is_empty() {
        return None;
    }
    serde_json::from_slice(body).ok()
}

/// Integer ids stay integers, anything else is passed on as a string.
pub fn path_id(raw: &str) -> Value {
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    decoded
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::String(decoded.into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Accessor;
    use crate::exposer::{Transfer, TransferFuture};
    use crate::test::{TestRequest, params};
    use http_body_util::BodyExt;
    use serde_json::json;

    fn echo() -> RouteRule {
        let transfer: Transfer = Arc::new(|call: Call| {
            Box::pin(async move {
                Ok(json!({
                    "id": call.id,
                    "data": call.data,
                    "params": call.params,
                    "authenticated": call.ctx.is_authenticated(),
                    "trace_id": call.ctx.trace_id(),
                }))
            }) as TransferFuture
        });
        RouteRule::new(http::Method::PUT, "/canal/:id", "echo", transfer)
    }

    fn failing() -> RouteRule {
        let transfer: Transfer = Arc::new(|_call: Call| {
            Box::pin(async { Err(Error::forbidden("Accessor does not have write access to canal")) })
                as TransferFuture
        });
        RouteRule::new(http::Method::DELETE, "/canal/:id", "failing", transfer)
    }

    async fn body_json(response: Response<BoxBody>) -> Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[test]
    fn test_decode_query_parses_json_values() {
        let params = decode_query(Some("filter=%7B%22width%22%3A3%7D&count=4&name=north")).unwrap();
        assert_eq!(params["filter"], json!({"width": 3}));
        assert_eq!(params["count"], json!(4));
        assert_eq!(params["name"], json!("north"));
    }

    #[test]
    fn test_decode_query_double_encoded() {
        let params = decode_query(Some("filter=%257B%2522width%2522%253A3%257D")).unwrap();
        assert_eq!(params["filter"], json!({"width": 3}));
    }

    #[test]
    fn test_decode_query_first_value_wins() {
        let params = decode_query(Some("a=1&a=2")).unwrap();
        assert_eq!(params["a"], json!(1));
        assert!(decode_query(None).unwrap().is_empty());
    }

    #[test]
    fn test_decode_body_requires_json_content_type() {
        let body = Bytes::from_static(br#"{"width": 3}"#);

        let mut headers = HeaderMap::new();
        assert_eq!(decode_body(&headers, &body), None);

        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        assert_eq!(decode_body(&headers, &body), Some(json!({"width": 3})));
        assert_eq!(decode_body(&headers, &Bytes::from_static(b"{nope")), None);

        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        assert_eq!(decode_body(&headers, &body), None);
    }

    #[test]
    fn test_path_id() {
        assert_eq!(path_id("42"), json!(42));
        assert_eq!(path_id("-3"), json!(-3));
        assert_eq!(path_id("north%20gate"), json!("north gate"));
    }

    #[tokio::test]
    async fn test_dispatch_parts_builds_call() {
        let (parts, body) = TestRequest::put("/canal/7?filter=%7B%7D")
            .json(&json!({"width": 3}))
            .into_parts();
        let trace_id = parts
            .extensions
            .get::<RequestContext>()
            .unwrap()
            .trace_id
            .clone();

        let response = dispatch_parts(
            &echo(),
            &Gateway::default(),
            &parts,
            &body,
            &params(&[("id", "7")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "id": 7,
                "data": {"width": 3},
                "params": {"filter": {}},
                "authenticated": false,
                "trace_id": trace_id,
            })
        );
    }

    #[tokio::test]
    async fn test_dispatch_parts_authenticates() {
        let exposer = crate::exposer::Exposer::new().authenticator(|info: &RequestInfo<'_>| {
            (info.header("handshake") == Some("trustworthy")).then(|| Accessor::new("friend"))
        });
        let gateway = exposer.gateway().clone();

        let (parts, body) = TestRequest::put("/canal/1")
            .header("handshake", "trustworthy")
            .into_parts();
        let response = dispatch_parts(&echo(), &gateway, &parts, &body, &params(&[])).await;
        let value = body_json(response).await;

        assert_eq!(value["authenticated"], true);
        assert_eq!(value["id"], Value::Null);
        assert_eq!(value["data"], Value::Null);
    }

    #[tokio::test]
    async fn test_dispatch_parts_error_response() {
        let (parts, body) = TestRequest::delete("/canal/1").into_parts();
        let response = dispatch_parts(
            &failing(),
            &Gateway::default(),
            &parts,
            &body,
            &params(&[("id", "1")]),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let value = body_json(response).await;
        assert_eq!(value["error"], "Accessor does not have write access to canal");
        assert!(value["trace_id"].is_string());
    }
}
