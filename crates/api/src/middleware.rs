// SPDX-FileCopyrightText: 2025 Semiotic Labs
//
// SPDX-License-Identifier: Apache-2.0

//! Middleware module for HTTP request processing
//!
//! The server wraps every route in the same chain, outermost first:
//!
//! 1. request id assignment (`tower-http` `SetRequestIdLayer`, echoed back by
//!    `PropagateRequestIdLayer`)
//! 2. [`request_context_middleware`], which binds a [`RequestContext`] that
//!    [`request_span`] turns into the per-request logging span
//! 3. access logging (`TraceLayer`, one INFO record per completed request)
//! 4. [`origin_guard_middleware`] followed by the [`OriginPolicy`] CORS layer

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
        header::{ACCEPT, CONTENT_TYPE, HOST, ORIGIN},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{Span, field, info_span, warn};

use crate::error::{ServerError, ServerResult};

/// Header carrying the request identifier on requests and responses
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

const X_REQUESTED_WITH: HeaderName = HeaderName::from_static("x-requested-with");

/// Per-request logging context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    request_id: Option<String>,
}

impl RequestContext {
    /// Derive the context from request headers
    ///
    /// Missing, empty and non-ASCII identifiers all yield a context without id.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned);

        Self { request_id }
    }

    /// Identifier of the request, if one was assigned
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }
}

/// Bind a [`RequestContext`] into the request extensions
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(req.headers());
    req.extensions_mut().insert(context);
    next.run(req).await
}

/// Build the logging span for a request
///
/// The `request_id` field is only recorded when the bound [`RequestContext`]
/// carries an identifier.
pub fn request_span(req: &Request) -> Span {
    let span = info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = field::Empty,
    );

    if let Some(request_id) = req
        .extensions()
        .get::<RequestContext>()
        .and_then(RequestContext::request_id)
    {
        span.record("request_id", request_id);
    }

    span
}

/// Cross-origin allow-list
#[derive(Debug, Clone)]
pub struct OriginPolicy {
    allowed: Arc<[HeaderValue]>,
}

impl OriginPolicy {
    /// Create a policy from configured origins such as `http://localhost:8080`
    ///
    /// # Errors
    ///
    /// Returns `ServerError::Config` for origins that are not valid header
    /// values and for the `*` wildcard, which cannot be combined with
    /// credentials.
    pub fn new(origins: &[String]) -> ServerResult<Self> {
        let allowed = origins
            .iter()
            .map(|origin| {
                if origin == "*" {
                    return Err(ServerError::Config {
                        message: "wildcard origin cannot be used with credentials".to_string(),
                    });
                }
                HeaderValue::from_str(origin).map_err(|e| ServerError::Config {
                    message: format!("invalid allowed origin {origin:?}: {e}"),
                })
            })
            .collect::<ServerResult<Vec<_>>>()?;

        Ok(Self {
            allowed: allowed.into(),
        })
    }

    /// Whether `origin` is on the allow-list
    pub fn is_allowed(&self, origin: &HeaderValue) -> bool {
        self.allowed.iter().any(|allowed| allowed == origin)
    }

    /// Whether a request with `origin` and `host` headers may proceed
    pub fn permits(&self, origin: &HeaderValue, host: Option<&HeaderValue>) -> bool {
        is_same_origin(origin, host) || self.is_allowed(origin)
    }

    /// CORS layer answering preflights and decorating allowed responses
    pub fn cors_layer(&self) -> CorsLayer {
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(self.allowed.iter().cloned()))
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::HEAD])
            .allow_headers([ACCEPT, CONTENT_TYPE, X_REQUESTED_WITH, REQUEST_ID_HEADER])
            .expose_headers([REQUEST_ID_HEADER])
    }
}

/// Whether `origin` names the same authority the request was sent to
fn is_same_origin(origin: &HeaderValue, host: Option<&HeaderValue>) -> bool {
    let (Ok(origin), Some(Ok(host))) = (origin.to_str(), host.map(HeaderValue::to_str)) else {
        return false;
    };

    origin
        .split_once("://")
        .is_some_and(|(_, authority)| authority.eq_ignore_ascii_case(host))
}

/// Reject cross-origin requests from origins outside the allow-list
///
/// Runs before the CORS layer so disallowed preflights are refused as well.
pub async fn origin_guard_middleware(
    State(policy): State<OriginPolicy>,
    req: Request,
    next: Next,
) -> Response {
    if let Some(origin) = req.headers().get(ORIGIN)
        && !policy.permits(origin, req.headers().get(HOST))
    {
        warn!(origin = ?origin, "rejecting request from disallowed origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(req).await
}
