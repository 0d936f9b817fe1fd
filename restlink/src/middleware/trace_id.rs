use hyper::body::Incoming;
use hyper::header::HeaderValue;
use hyper::{Request, Response};

use crate::context::RequestContext;
use crate::response::BoxBody;

use super::{BoxFuture, Middleware, Next};

/// Header carrying the trace id in both directions.
pub const TRACE_ID_HEADER: &str = "x-trace-id";

const MAX_TRACE_ID_LEN: usize = 128;

/// Adopts a caller's `x-trace-id` as the request's trace id and echoes the
/// trace id on every response. Error bodies carry the same id.
///
/// Incoming ids longer than 128 bytes or containing anything but visible
/// ASCII are ignored in favor of the generated one.
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceIdMiddleware;

impl TraceIdMiddleware {
    pub fn new() -> Self {
        Self
    }
}

fn adoptable(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_TRACE_ID_LEN && id.bytes().all(|b| b.is_ascii_graphic())
}

impl Middleware for TraceIdMiddleware {
    fn handle<'a>(
        &'a self,
        mut req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>> {
        let adopted = req
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|id| adoptable(id))
            .map(str::to_owned);

        let trace_id = match adopted {
            Some(id) => {
                let mut request = ctx.clone();
                request.trace_id = id.clone();
                req.extensions_mut().insert(request);
                id
            }
            None => ctx.trace_id.clone(),
        };

        Box::pin(async move {
            let mut response = next.run(req).await;
            if let Ok(value) = HeaderValue::from_str(&trace_id) {
                response.headers_mut().insert(TRACE_ID_HEADER, value);
            }
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adoptable_ids() {
        assert!(adoptable("lock-keeper-7"));
        assert!(adoptable(&"a".repeat(MAX_TRACE_ID_LEN)));
        assert!(!adoptable(""));
        assert!(!adoptable("two words"));
        assert!(!adoptable(&"a".repeat(MAX_TRACE_ID_LEN + 1)));
    }
}
