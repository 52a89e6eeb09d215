use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts, Request},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Resolves the client IP.
///
/// With `trust_proxy_hops > 0` the `x-forwarded-for` entry that many positions
/// from the right is used (1 = the address our own proxy saw), then `x-real-ip`.
/// Otherwise, or when the headers don't parse, the socket address wins.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>, trust_proxy_hops: usize) -> IpAddr {
    if trust_proxy_hops > 0 {
        if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
            let hops: Vec<&str> = h.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
            if let Some(idx) = hops.len().checked_sub(trust_proxy_hops) {
                if let Ok(ip) = hops[idx].parse::<IpAddr>() {
                    return ip;
                }
            }
        }
        if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
            if let Ok(ip) = h.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    if let Some(ip) = fallback {
        return ip;
    }
    IpAddr::from([127, 0, 0, 1])
}

/// Client IP of a request inside a middleware.
pub fn client_ip(req: &Request, trust_proxy_hops: usize) -> IpAddr {
    let remote = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());
    extract_ip_from_headers(req.headers(), remote, trust_proxy_hops)
}

/// Optional extractor for remote socket address. Unlike `ConnectInfo`, this never rejects
/// if the connection info extension is absent (e.g. in tests or custom services).
#[derive(Clone, Copy, Debug, Default)]
pub struct MaybeRemoteAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for MaybeRemoteAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match ConnectInfo::<SocketAddr>::from_request_parts(parts, state).await {
            Ok(ConnectInfo(addr)) => Ok(MaybeRemoteAddr(Some(addr))),
            Err(_) => Ok(MaybeRemoteAddr(None)),
        }
    }
}
