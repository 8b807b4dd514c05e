use std::net::IpAddr;
use hyper::{HeaderMap, header::{HeaderValue, HOST, ORIGIN}};
use crate::errors::GatewayError;
use crate::models::AllowedHost;


/// Lowercased hostname of a `Host` header value, without the port.
pub fn hostname(host: &str) -> String {
    let host = host.trim();
    let name = if host.starts_with('[') {
        // IPv6 literal, keep the brackets
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        host.split(':').next().unwrap_or(host)
    };
    name.to_ascii_lowercase()
}

/// IP literals and `localhost` names cannot be rebound through DNS.
fn is_always_allowed(name: &str) -> bool {
    let bare = name.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().is_ok() || name == "localhost" || name.ends_with(".localhost")
}

pub fn is_host_allowed(allowed: &[AllowedHost], host: &str) -> bool {
    let name = hostname(host);
    is_always_allowed(&name) || allowed.iter().any(|pattern| pattern.matches(&name))
}

/// Rejects requests whose `Host` header is missing or not on the allow-list.
pub fn check_host(allowed: &[AllowedHost], headers: &HeaderMap) -> Result<(), GatewayError> {
    let host = headers
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or(GatewayError::MissingHost)?;

    if is_host_allowed(allowed, host) {
        Ok(())
    } else {
        Err(GatewayError::HostNotAllowed(host.to_string()))
    }
}

/// Makes a forwarded request look same-origin to the backend.
///
/// `Host` is set to `authority`; an `Origin` header, if the client sent one,
/// is replaced by `origin` as well. This intentionally goes further than
/// http-proxy's `changeOrigin`, which only rewrites `Host`.
pub fn rewrite_origin(headers: &mut HeaderMap, authority: &str, origin: &str) -> Result<(), GatewayError> {
    let host = HeaderValue::from_str(authority)
        .map_err(|e| GatewayError::InvalidUri(e.to_string()))?;
    headers.insert(HOST, host);

    if headers.contains_key(ORIGIN) {
        let origin = HeaderValue::from_str(origin)
            .map_err(|e| GatewayError::InvalidUri(e.to_string()))?;
        headers.insert(ORIGIN, origin);
    }
    Ok(())
}
