use std::convert::Infallible;
use hyper::StatusCode;
use warp::reply::WithStatus;
use crate::errors::GatewayError;


fn error_reply(e: &GatewayError) -> WithStatus<String> {
    let code = match e {
        GatewayError::HostNotAllowed(_) => StatusCode::FORBIDDEN,
        GatewayError::MissingHost => StatusCode::BAD_REQUEST,
        GatewayError::Upstream(_) => StatusCode::BAD_GATEWAY,
        GatewayError::InvalidUri(_) | GatewayError::Http(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warp::reply::with_status(e.to_string(), code)
}

/// Answers gateway errors in place and passes every other rejection on,
/// so a failed forward is never retried by a later `or` branch.
pub async fn recover_gateway_error(err: warp::Rejection) -> Result<WithStatus<String>, warp::Rejection> {
    match err.find::<GatewayError>() {
        Some(e) => Ok(error_reply(e)),
        None => Err(err),
    }
}

pub async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    if let Some(e) = err.find::<GatewayError>() {
        return Ok(error_reply(e));
    }

    let (code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found")
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
    } else {
        tracing::error!(?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    Ok(warp::reply::with_status(message.to_string(), code))
}
