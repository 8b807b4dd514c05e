pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod server;
pub mod services;

pub use config::{Deployment, Mode, Overrides, ResolvedConfig};
pub use errors::GatewayError;
pub use models::{AllowedHost, AppState, ProxyRule, StarterPrompt, WidgetOptions};
