use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use hyper::{HeaderMap, Method};
use warp::{path::FullPath, Filter, Rejection};

use crate::handlers::{handle_rejection, recover_gateway_error};
use crate::middleware::check_host;
use crate::models::{AppState, ProxyRule};
use crate::services::forward;

/// Where the resolved widget options are served. Outside every proxy prefix.
pub const OPTIONS_PATH: &str = "__gateway";

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Runs before every other filter; a foreign `Host` never reaches routing.
pub fn host_guard(state: Arc<AppState>) -> impl Filter<Extract = (), Error = Rejection> + Clone {
    warp::header::headers_cloned()
        .and(with_state(state))
        .and_then(|headers: HeaderMap, state: Arc<AppState>| async move {
            check_host(&state.config.allowed_hosts, &headers).map_err(|e| {
                tracing::warn!(error = %e, "rejected request");
                warp::reject::custom(e)
            })
        })
        .untuple_one()
}

fn matched_rule(state: Arc<AppState>) -> impl Filter<Extract = (ProxyRule,), Error = Rejection> + Clone {
    warp::path::full()
        .and(with_state(state))
        .and_then(|path: FullPath, state: Arc<AppState>| async move {
            match state.router.route(path.as_str()) {
                Some(rule) => Ok(rule.clone()),
                None => Err(warp::reject::not_found()),
            }
        })
}

async fn proxy_request(
    rule: ProxyRule,
    method: Method,
    full_path: FullPath,
    query: String,
    headers: HeaderMap,
    body: Bytes,
    state: Arc<AppState>,
) -> Result<hyper::Response<hyper::Body>, Rejection> {
    let start_time = Instant::now();

    let response = forward(
        &state.client,
        &rule,
        method.clone(),
        headers,
        full_path.as_str(),
        &query,
        body,
    )
    .await
    .map_err(warp::reject::custom)?;

    tracing::info!(
        %method,
        path = full_path.as_str(),
        status = response.status().as_u16(),
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        upstream = %rule.target_origin,
        "proxied"
    );

    Ok(response)
}

/// Forwards matching requests; rejects with `not_found` when no rule applies.
pub fn proxy(state: Arc<AppState>) -> impl Filter<Extract = impl warp::Reply, Error = Rejection> + Clone {
    matched_rule(state.clone())
        .and(warp::method())
        .and(warp::path::full())
        .and(warp::query::raw().or_else(|_| async { Ok::<(String,), Infallible>((String::new(),)) }))
        .and(warp::header::headers_cloned())
        .and(warp::body::bytes())
        .and(with_state(state))
        .and_then(proxy_request)
        .recover(recover_gateway_error)
}

pub fn widget_options(state: Arc<AppState>) -> impl Filter<Extract = (warp::reply::Json,), Error = Rejection> + Clone {
    warp::path(OPTIONS_PATH)
        .and(warp::path("options.json"))
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state(state))
        .map(|state: Arc<AppState>| warp::reply::json(&state.config.widget))
}

/// Static files from `static_dir`, falling back to its `index.html`.
pub fn spa(static_dir: PathBuf) -> impl Filter<Extract = (warp::fs::File,), Error = Rejection> + Clone {
    let index = static_dir.join("index.html");
    warp::fs::dir(static_dir)
        .or(warp::get().and(warp::fs::file(index)))
        .unify()
}

pub fn routes(
    state: Arc<AppState>,
    static_dir: PathBuf,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    host_guard(state.clone())
        .and(
            widget_options(state.clone())
                .or(proxy(state))
                .or(spa(static_dir)),
        )
        .recover(handle_rejection)
}
