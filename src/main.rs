use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use chatkit_dev_gateway::{
    config::DEFAULT_LISTEN_IP,
    server::{routes, OPTIONS_PATH},
    AppState, Deployment, Mode, Overrides, ResolvedConfig,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Which frontend to serve.
    #[arg(short, long, value_enum, env = "CHATKIT_DEPLOYMENT", default_value_t = Deployment::Boilerplate)]
    deployment: Deployment,

    #[arg(long, default_value_t = DEFAULT_LISTEN_IP)]
    host: IpAddr,

    /// Defaults to 5170 (boilerplate) or 5171 (customer-support).
    #[arg(short, long)]
    port: Option<u16>,

    /// Built single-page application.
    #[arg(long, default_value = "dist")]
    static_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = ResolvedConfig::resolve(args.deployment, &Overrides::from_env());

    for warning in config.warnings() {
        tracing::warn!("{}", warning);
    }

    tracing::info!(
        deployment = %config.deployment,
        mode = ?config.mode,
        endpoint_url = %config.widget.endpoint_url,
        sidebar_url = %config.widget.sidebar_url,
        domain_key = %config.widget.domain_key,
        "resolved configuration"
    );
    match config.mode {
        Mode::Development => {
            for rule in &config.proxy_rules {
                tracing::info!(prefix = %rule.path_prefix, upstream = %rule.target_origin, "proxy rule");
            }
        }
        Mode::Production => tracing::info!("production mode, proxying disabled"),
    }

    if !args.static_dir.is_dir() {
        tracing::warn!(dir = %args.static_dir.display(), "static directory not found; only proxied routes will respond");
    }

    let addr = SocketAddr::new(
        args.host,
        args.port.unwrap_or_else(|| args.deployment.default_port()),
    );
    let state = Arc::new(AppState::new(config));
    let routes = routes(state, args.static_dir);

    let (bound, server) = warp::serve(routes)
        .try_bind_ephemeral(addr)
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!("Dev gateway running on http://{} (widget options at /{}/options.json)", bound, OPTIONS_PATH);
    server.await;
    Ok(())
}
