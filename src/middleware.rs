/* src/middleware.rs */

use axum::{
    extract::{ConnectInfo, FromRequestParts, Request},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use futures_util::future::BoxFuture;
use std::{
    net::SocketAddr,
    task::{Context, Poll},
};
use tower::{Layer, Service};

use crate::extractor::clean_candidate;
use crate::gate::{GateOptions, IpGate, IpList, Verdict};
use crate::request::{Connection, RequestInfo};

/// Extension that holds the client IP the gate let through.
///
/// Inserted whenever the gate resolved an address, including when no list is
/// configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    /// Get the IP address.
    pub fn ip(&self) -> &str {
        &self.0
    }
}

/// Layer that refuses requests the configured [`IpGate`] rejects.
///
/// Rejected requests get an empty `403 Forbidden`. Accepted requests reach
/// the inner service with a [`ClientIp`] extension when an address was
/// resolved. The peer address is read from `ConnectInfo<SocketAddr>`, so serve
/// the router with `into_make_service_with_connect_info::<SocketAddr>()`.
///
/// # Examples
///
/// ```rust,no_run
/// use axum::{Router, routing::get};
/// use ipgate::{GateOptions, IpGateLayer};
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "hello" }))
///     .layer(IpGateLayer::from_options(["203.0.113.7"], GateOptions::default()));
/// ```
#[derive(Debug, Clone)]
pub struct IpGateLayer {
    gate: IpGate,
}

impl IpGateLayer {
    /// Create a layer around an existing gate.
    pub fn new(gate: IpGate) -> Self {
        Self { gate }
    }

    /// Create a layer with a gate built from `ips` and `options`.
    pub fn from_options(ips: impl Into<IpList>, options: GateOptions) -> Self {
        Self::new(IpGate::new(ips, options))
    }
}

impl From<IpGate> for IpGateLayer {
    fn from(gate: IpGate) -> Self {
        Self::new(gate)
    }
}

impl<S> Layer<S> for IpGateLayer {
    type Service = IpGateService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        IpGateService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

/// Service produced by [`IpGateLayer`].
#[derive(Debug, Clone)]
pub struct IpGateService<S> {
    inner: S,
    gate: IpGate,
}

impl<S> Service<Request> for IpGateService<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request) -> Self::Future {
        let info = request_info(&req);
        let (verdict, ip) = self.gate.decide(&info);

        if verdict == Verdict::Reject {
            return Box::pin(async move { Ok(StatusCode::FORBIDDEN.into_response()) });
        }

        if let Some(ip) = ip {
            req.extensions_mut().insert(ClientIp(ip));
        }

        let future = self.inner.call(req);
        Box::pin(async move { future.await })
    }
}

/// Build the gate's view of an axum request.
fn request_info(req: &Request) -> RequestInfo {
    let remote_address = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|connect_info| connect_info.0.ip().to_string());

    RequestInfo {
        connection: remote_address.map(|addr| Connection {
            remote_address: Some(addr),
            socket: None,
        }),
        headers: headers_to_map(req.headers()),
        ..Default::default()
    }
}

/// Convert axum headers to our header map. Non UTF-8 values are skipped.
///
/// Repeated lines of one header are joined with `", "` in arrival order, the
/// same as a single comma separated line.
fn headers_to_map(headers: &HeaderMap) -> crate::request::HeaderMap {
    let mut map = crate::request::HeaderMap::new();

    for (name, value) in headers.iter() {
        let Ok(value) = value.to_str() else {
            continue;
        };

        map.entry(name.as_str().to_lowercase())
            .and_modify(|joined: &mut String| {
                joined.push_str(", ");
                joined.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    map
}

/// Axum extractor for the client IP.
///
/// Prefers the address stored by [`IpGateLayer`] and falls back to the
/// connection peer. Fails with `403 Forbidden` when neither is known.
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(client_ip) = parts.extensions.get::<ClientIp>() {
            return Ok(client_ip.clone());
        }

        parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|connect_info| {
                let peer = connect_info.0.ip().to_string();
                ClientIp(clean_candidate(&peer))
            })
            .ok_or(StatusCode::FORBIDDEN)
    }
}
