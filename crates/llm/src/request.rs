use std::{
    convert::Infallible,
    net::{IpAddr, SocketAddr},
};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

/// Address of the client issuing a request, used as the per-IP rate limit key.
///
/// The socket peer address wins. Without it (e.g. a server started without
/// connect info), the first `X-Forwarded-For` entry and then `X-Real-IP` are
/// consulted.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClientAddress(pub(crate) Option<IpAddr>);

impl<S> FromRequestParts<S> for ClientAddress
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(address)| address.ip());

        Ok(Self(peer.or_else(|| forwarded_address(&parts.headers))))
    }
}

fn forwarded_address(headers: &HeaderMap) -> Option<IpAddr> {
    if let Some(forwarded_for) = headers.get("x-forwarded-for") {
        // Take the first IP in the chain
        let ip_str = forwarded_for.to_str().ok()?.split(',').next()?;

        return ip_str.trim().parse::<IpAddr>().ok();
    }

    let ip_str = headers.get("x-real-ip")?.to_str().ok()?;

    ip_str.trim().parse::<IpAddr>().ok()
}
