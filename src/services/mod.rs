use crate::config::Mode;
use crate::errors::GatewayError;
use crate::middleware::rewrite_origin;
use crate::models::ProxyRule;
use bytes::Bytes;
use hyper::{client::HttpConnector, Body, Client, HeaderMap, Method, Request, Response, Uri};


/// Decides, per request path, whether the request leaves this server.
pub trait Router: Send + Sync {
    /// The rule to forward with, or `None` to serve locally.
    fn route(&self, path: &str) -> Option<&ProxyRule>;
}

/// Production routing: everything is served locally.
pub struct PassThrough;

impl Router for PassThrough {
    fn route(&self, _path: &str) -> Option<&ProxyRule> {
        None
    }
}

/// Development routing: first rule whose prefix matches wins.
pub struct PrefixForward {
    rules: Vec<ProxyRule>,
}

impl PrefixForward {
    pub fn new(rules: Vec<ProxyRule>) -> Self {
        Self { rules }
    }
}

impl Router for PrefixForward {
    fn route(&self, path: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|rule| rule.matches(path))
    }
}

pub fn build_router(mode: Mode, rules: Vec<ProxyRule>) -> Box<dyn Router> {
    match mode {
        Mode::Development => Box::new(PrefixForward::new(rules)),
        Mode::Production => Box::new(PassThrough),
    }
}

pub fn target_uri(rule: &ProxyRule, path: &str, query: &str) -> Result<Uri, GatewayError> {
    let mut uri_str = format!("{}{}", rule.target_origin, path);
    if !query.is_empty() {
        uri_str.push('?');
        uri_str.push_str(query);
    }

    uri_str.parse().map_err(|e: hyper::http::uri::InvalidUri| {
        tracing::error!(uri = %uri_str, error = %e, "failed to parse target URI");
        GatewayError::InvalidUri(e.to_string())
    })
}

/// Sends the request to the rule's backend and hands back its response unbuffered.
pub async fn forward(
    client: &Client<HttpConnector>,
    rule: &ProxyRule,
    method: Method,
    mut headers: HeaderMap,
    path: &str,
    query: &str,
    body: Bytes,
) -> Result<Response<Body>, GatewayError> {
    let uri = target_uri(rule, path, query)?;

    if rule.rewrite_origin {
        let authority = uri
            .authority()
            .map(|a| a.to_string())
            .ok_or_else(|| GatewayError::InvalidUri(format!("{} has no authority", uri)))?;
        let scheme = uri.scheme_str().unwrap_or("http");
        let origin = format!("{}://{}", scheme, authority);
        rewrite_origin(&mut headers, &authority, &origin)?;
    }

    let mut req = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::from(body))
        .map_err(|e| GatewayError::Http(e.to_string()))?;
    *req.headers_mut() = headers;

    client.request(req).await.map_err(|e| {
        tracing::error!(target_origin = %rule.target_origin, error = %e, "error forwarding request");
        GatewayError::Upstream(e.to_string())
    })
}
