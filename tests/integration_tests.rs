use bytes::Bytes;
use hyper::{Method, StatusCode};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use warp::{path::FullPath, Filter};
use chatkit_dev_gateway::{
    config::{ENV_BACKEND_URL, ENV_NODE_ENV, ENV_SUPPORT_API_BASE},
    server::routes,
    AppState, Deployment, Overrides, ResolvedConfig,
};

/// Backend that echoes what it received as JSON.
fn spawn_echo_backend() -> SocketAddr {
    let echo = warp::method()
        .and(warp::path::full())
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and(warp::header::optional::<String>("host"))
        .and(warp::header::optional::<String>("origin"))
        .and(warp::body::bytes())
        .map(|method: Method, path: FullPath, query: String, host: Option<String>, origin: Option<String>, body: Bytes| {
            warp::reply::json(&serde_json::json!({
                "method": method.as_str(),
                "path": path.as_str(),
                "query": query,
                "host": host,
                "origin": origin,
                "body": String::from_utf8_lossy(&body),
            }))
        });

    let (addr, server) = warp::serve(echo).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn unused_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn static_site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), "<html>ticketbot</html>").unwrap();
    std::fs::create_dir(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets").join("app.js"), "console.log('app');").unwrap();
    dir
}

fn config(deployment: Deployment, pairs: &[(&str, String)]) -> ResolvedConfig {
    ResolvedConfig::resolve(deployment, &Overrides::from_pairs(pairs.iter().cloned()))
}

fn gateway(
    config: ResolvedConfig,
    static_dir: &Path,
) -> impl Filter<Extract = impl warp::Reply, Error = std::convert::Infallible> + Clone + 'static {
    routes(Arc::new(AppState::new(config)), static_dir.to_path_buf())
}

fn json(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn test_forwards_matching_prefix_with_rewritten_origin() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let filter = gateway(
        config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", backend))]),
        site.path(),
    );

    let resp = warp::test::request()
        .method("POST")
        .path("/facts/today?limit=2")
        .header("host", "localhost:5170")
        .header("origin", "http://localhost:5170")
        .body("payload")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let echoed = json(resp.body());
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["path"], "/facts/today");
    assert_eq!(echoed["query"], "limit=2");
    assert_eq!(echoed["body"], "payload");
    assert_eq!(echoed["host"], backend.to_string());
    assert_eq!(echoed["origin"], format!("http://{}", backend));
}

#[tokio::test]
async fn test_forwards_session_endpoint() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let filter = gateway(
        config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", backend))]),
        site.path(),
    );

    let resp = warp::test::request()
        .method("POST")
        .path("/api/chatkit/session")
        .header("host", "abc.ngrok.io")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp.body())["path"], "/api/chatkit/session");
}

#[tokio::test]
async fn test_keeps_client_host_without_rewrite() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let mut config = config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", backend))]);
    for rule in config.proxy_rules.iter_mut() {
        rule.rewrite_origin = false;
    }
    let filter = gateway(config, site.path());

    let resp = warp::test::request()
        .path("/chatkit")
        .header("host", "localhost:5170")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp.body())["host"], "localhost:5170");
}

#[tokio::test]
async fn test_rejects_foreign_host_before_routing() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let filter = gateway(
        config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", backend))]),
        site.path(),
    );

    for path in ["/facts/today", "/", "/assets/app.js"] {
        let resp = warp::test::request()
            .path(path)
            .header("host", "evil.example.com")
            .reply(&filter)
            .await;

        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(String::from_utf8_lossy(resp.body()).contains("evil.example.com"));
    }
}

#[tokio::test]
async fn test_unmatched_paths_are_served_locally() {
    let site = static_site();
    // Forwarding would fail, so any 200 here came from the static directory.
    let filter = gateway(
        config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", unused_addr()))]),
        site.path(),
    );

    let resp = warp::test::request()
        .path("/assets/app.js")
        .header("host", "localhost:5170")
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body().as_ref(), b"console.log('app');");

    let resp = warp::test::request()
        .path("/tickets/42")
        .header("host", "localhost:5170")
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body().as_ref(), b"<html>ticketbot</html>");
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let site = static_site();
    let filter = gateway(
        config(Deployment::Boilerplate, &[(ENV_BACKEND_URL, format!("http://{}", unused_addr()))]),
        site.path(),
    );

    let resp = warp::test::request()
        .path("/facts")
        .header("host", "localhost:5170")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_production_mode_does_not_forward() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let filter = gateway(
        config(
            Deployment::Boilerplate,
            &[
                (ENV_BACKEND_URL, format!("http://{}", backend)),
                (ENV_NODE_ENV, "production".to_string()),
            ],
        ),
        site.path(),
    );

    let resp = warp::test::request()
        .path("/facts")
        .header("host", "gatethegreat.github.io")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.body().as_ref(), b"<html>ticketbot</html>");
}

#[tokio::test]
async fn test_customer_support_routes_only_support_prefix() {
    let backend = spawn_echo_backend();
    let site = static_site();
    let filter = gateway(
        config(
            Deployment::CustomerSupport,
            &[
                (ENV_BACKEND_URL, format!("http://{}", backend)),
                (ENV_SUPPORT_API_BASE, "/svc".to_string()),
            ],
        ),
        site.path(),
    );

    let resp = warp::test::request()
        .method("POST")
        .path("/support/chatkit")
        .header("host", "localhost:5171")
        .body("{}")
        .reply(&filter)
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json(resp.body())["path"], "/support/chatkit");

    let resp = warp::test::request()
        .path("/facts")
        .header("host", "localhost:5171")
        .reply(&filter)
        .await;
    assert_eq!(resp.body().as_ref(), b"<html>ticketbot</html>");

    let resp = warp::test::request()
        .path("/__gateway/options.json")
        .header("host", "localhost:5171")
        .reply(&filter)
        .await;
    let options = json(resp.body());
    assert_eq!(options["endpointUrl"], "/svc/chatkit");
    assert_eq!(options["sidebarUrl"], "/svc/customer");
    assert_eq!(options["placeholderText"], Value::Null);
}

#[tokio::test]
async fn test_widget_options_with_no_overrides() {
    let site = static_site();
    let filter = gateway(config(Deployment::Boilerplate, &[]), site.path());

    let resp = warp::test::request()
        .path("/__gateway/options.json")
        .header("host", "127.0.0.1:5170")
        .reply(&filter)
        .await;

    assert_eq!(resp.status(), StatusCode::OK);
    let options = json(resp.body());
    assert_eq!(options["domainKey"], "domain_pk_localhost_dev");
    assert_eq!(options["endpointUrl"], "/chatkit");
    assert_eq!(options["themeStorageKey"], "chatkit-boilerplate-theme");
    assert_eq!(options["placeholderText"], "Describe your issue or question...");

    let labels: Vec<&str> = options["starterPrompts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["label"].as_str().unwrap())
        .collect();
    assert_eq!(
        labels,
        ["Report an issue", "Technical problem", "Account help", "General question"]
    );
}
