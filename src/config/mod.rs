use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};

use clap::ValueEnum;
use http::Uri;
use lazy_static::lazy_static;

use crate::models::{AllowedHost, ProxyRule, StarterPrompt, WidgetOptions};


// Override names, as read by the two frontends.
pub const ENV_CHATKIT_API_URL: &str = "VITE_CHATKIT_API_URL";
pub const ENV_CHATKIT_API_DOMAIN_KEY: &str = "VITE_CHATKIT_API_DOMAIN_KEY";
pub const ENV_FACTS_API_URL: &str = "VITE_FACTS_API_URL";
pub const ENV_SUPPORT_API_BASE: &str = "VITE_SUPPORT_API_BASE";
pub const ENV_SUPPORT_CHATKIT_API_DOMAIN_KEY: &str = "VITE_SUPPORT_CHATKIT_API_DOMAIN_KEY";
pub const ENV_SUPPORT_CHATKIT_API_URL: &str = "VITE_SUPPORT_CHATKIT_API_URL";
pub const ENV_SUPPORT_CUSTOMER_URL: &str = "VITE_SUPPORT_CUSTOMER_URL";
pub const ENV_SUPPORT_GREETING: &str = "VITE_SUPPORT_GREETING";
pub const ENV_VITE_BACKEND_URL: &str = "VITE_BACKEND_URL";
pub const ENV_BACKEND_URL: &str = "BACKEND_URL";
pub const ENV_NODE_ENV: &str = "NODE_ENV";

pub const DOMAIN_KEY_PLACEHOLDER: &str = "domain_pk_localhost_dev";
pub const DEFAULT_LISTEN_IP: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

const BOILERPLATE_GREETING: &str =
    "TicketBot - Let me know what's wrong and I'll get that info to the right person";
const BOILERPLATE_PLACEHOLDER: &str = "Describe your issue or question...";
const SUPPORT_GREETING: &str =
    "Welcome to TicketBot! Let me know what's wrong and I'll get that info to the right person.";

lazy_static! {
    // Public domains must be added here before exposing the dev server.
    pub static ref DEFAULT_ALLOWED_HOSTS: Vec<AllowedHost> = [
        "localhost",
        "127.0.0.1",
        "[::1]",
        "gatethegreat.github.io",
        ".ngrok.io",
        ".trycloudflare.com",
    ]
    .iter()
    .map(|pattern| AllowedHost::parse(pattern))
    .collect();
}

#[derive(Debug, Clone, Default)]
pub struct Overrides {
    values: HashMap<String, String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            values: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Empty values are treated as absent.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn first(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.get(name))
    }
}

pub fn resolve(overrides: &Overrides, names: &[&str], default: &str) -> String {
    overrides.first(names).unwrap_or(default).to_string()
}

pub fn derive_endpoint(base: &str, suffix: &str) -> String {
    format!("{}{}", base, suffix)
}

pub fn resolve_derived(overrides: &Overrides, name: &str, base: &str, suffix: &str) -> String {
    match overrides.get(name) {
        Some(value) => value.to_string(),
        None => derive_endpoint(base, suffix),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Deployment {
    Boilerplate,
    CustomerSupport,
}

impl Deployment {
    pub fn default_port(self) -> u16 {
        match self {
            Self::Boilerplate => 5170,
            Self::CustomerSupport => 5171,
        }
    }

    pub fn default_backend(self) -> &'static str {
        match self {
            Self::Boilerplate => "http://127.0.0.1:8000",
            Self::CustomerSupport => "http://127.0.0.1:8001",
        }
    }

    fn backend_chain(self) -> &'static [&'static str] {
        match self {
            Self::Boilerplate => &[ENV_VITE_BACKEND_URL, ENV_BACKEND_URL],
            Self::CustomerSupport => &[ENV_BACKEND_URL],
        }
    }

    pub fn proxy_prefixes(self) -> &'static [&'static str] {
        match self {
            Self::Boilerplate => &["/chatkit", "/api/chatkit/session", "/facts"],
            Self::CustomerSupport => &["/support"],
        }
    }

    pub fn theme_storage_key(self) -> &'static str {
        match self {
            Self::Boilerplate => "chatkit-boilerplate-theme",
            Self::CustomerSupport => "customer-support-theme",
        }
    }

    pub fn starter_prompts(self) -> Vec<StarterPrompt> {
        match self {
            Self::Boilerplate => vec![
                StarterPrompt::new("Report an issue", "I need to report an issue", "circle-question"),
                StarterPrompt::new("Technical problem", "I'm having a technical problem", "sparkle"),
                StarterPrompt::new("Account help", "I need help with my account", "book-open"),
                StarterPrompt::new("General question", "I have a general question", "search"),
            ],
            Self::CustomerSupport => vec![
                StarterPrompt::new("Report an issue", "I need to report an issue", "lightbulb"),
                StarterPrompt::new("Technical problem", "I'm having a technical problem", "sparkle"),
                StarterPrompt::new("Account help", "I need help with my account", "compass"),
            ],
        }
    }

    fn widget_options(self, overrides: &Overrides) -> WidgetOptions {
        match self {
            Self::Boilerplate => WidgetOptions {
                endpoint_url: resolve(overrides, &[ENV_CHATKIT_API_URL], "/chatkit"),
                domain_key: resolve(
                    overrides,
                    &[ENV_CHATKIT_API_DOMAIN_KEY],
                    DOMAIN_KEY_PLACEHOLDER,
                ),
                greeting: BOILERPLATE_GREETING.to_string(),
                starter_prompts: self.starter_prompts(),
                placeholder_text: Some(BOILERPLATE_PLACEHOLDER.to_string()),
                theme_storage_key: self.theme_storage_key().to_string(),
                sidebar_url: resolve(overrides, &[ENV_FACTS_API_URL], "/facts"),
            },
            Self::CustomerSupport => {
                let base = resolve(overrides, &[ENV_SUPPORT_API_BASE], "/support");
                WidgetOptions {
                    endpoint_url: resolve_derived(
                        overrides,
                        ENV_SUPPORT_CHATKIT_API_URL,
                        &base,
                        "/chatkit",
                    ),
                    domain_key: resolve(
                        overrides,
                        &[ENV_SUPPORT_CHATKIT_API_DOMAIN_KEY],
                        DOMAIN_KEY_PLACEHOLDER,
                    ),
                    greeting: resolve(overrides, &[ENV_SUPPORT_GREETING], SUPPORT_GREETING),
                    starter_prompts: self.starter_prompts(),
                    placeholder_text: None,
                    theme_storage_key: self.theme_storage_key().to_string(),
                    sidebar_url: resolve_derived(
                        overrides,
                        ENV_SUPPORT_CUSTOMER_URL,
                        &base,
                        "/customer",
                    ),
                }
            }
        }
    }
}

impl fmt::Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Boilerplate => write!(f, "boilerplate"),
            Self::CustomerSupport => write!(f, "customer-support"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    pub fn from_overrides(overrides: &Overrides) -> Self {
        match overrides.get(ENV_NODE_ENV) {
            Some("production") => Self::Production,
            _ => Self::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub deployment: Deployment,
    pub mode: Mode,
    pub widget: WidgetOptions,
    pub backend_target: String,
    pub proxy_rules: Vec<ProxyRule>,
    pub allowed_hosts: Vec<AllowedHost>,
}

impl ResolvedConfig {
    pub fn resolve(deployment: Deployment, overrides: &Overrides) -> Self {
        let backend_target = resolve(
            overrides,
            deployment.backend_chain(),
            deployment.default_backend(),
        );
        let proxy_rules = deployment
            .proxy_prefixes()
            .iter()
            .map(|prefix| ProxyRule::new(prefix, &backend_target))
            .collect();

        Self {
            deployment,
            mode: Mode::from_overrides(overrides),
            widget: deployment.widget_options(overrides),
            backend_target,
            proxy_rules,
            allowed_hosts: DEFAULT_ALLOWED_HOSTS.clone(),
        }
    }

    /// Non-fatal problems with the resolved values. Overrides are still used verbatim.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let target_ok = self
            .backend_target
            .parse::<Uri>()
            .map(|uri| {
                matches!(uri.scheme_str(), Some("http") | Some("https"))
                    && uri.authority().is_some()
            })
            .unwrap_or(false);
        if !target_ok {
            warnings.push(format!(
                "backend target {:?} is not an absolute http(s) URL; proxied requests will fail",
                self.backend_target
            ));
        }

        if self.mode == Mode::Production && self.widget.domain_key == DOMAIN_KEY_PLACEHOLDER {
            warnings.push(format!(
                "running in production with the placeholder domain key {:?}",
                DOMAIN_KEY_PLACEHOLDER
            ));
        }

        warnings
    }
}
