use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Blocked request. This host ({0}) is not allowed.")]
    HostNotAllowed(String),
    #[error("Missing Host header")]
    MissingHost,
    #[error("Invalid URI: {0}")]
    InvalidUri(String),
    #[error("HTTP Error: {0}")]
    Http(String),
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl warp::reject::Reject for GatewayError {}
