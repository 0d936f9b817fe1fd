use hyper::body::Incoming;
use hyper::{Request, Response};
use tracing::{Instrument, info, info_span, warn};

use crate::context::RequestContext;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

/// Runs each request in an `info` span and logs its completion.
/// Server errors are logged at `warn`.
#[derive(Debug, Clone, Copy)]
pub struct RequestLogMiddleware;

impl RequestLogMiddleware {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RequestLogMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestLogMiddleware {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let trace_id = req
            .extensions()
            .get::<RequestContext>()
            .unwrap_or(ctx)
            .trace_id
            .clone();

        let span = info_span!(
            "request",
            method = %method,
            path = %path,
            trace_id = %trace_id,
        );

        Box::pin(
            async move {
                let response = next.run(req).await;
                let duration = ctx.elapsed();
                let status = response.status().as_u16();

                if status >= 500 {
                    warn!(
                        status = status,
                        duration_ms = duration.as_millis() as u64,
                        "request failed"
                    );
                } else {
                    info!(
                        status = status,
                        duration_ms = duration.as_millis() as u64,
                        "request completed"
                    );
                }

                response
            }
            .instrument(span),
        )
    }
}
