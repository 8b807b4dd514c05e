use hyper::{client::HttpConnector, Client};
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::services::{build_router, Router};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StarterPrompt {
    pub label: String,
    pub prompt: String,
    pub icon: String,
}

impl StarterPrompt {
    pub fn new(label: &str, prompt: &str, icon: &str) -> Self {
        Self {
            label: label.to_string(),
            prompt: prompt.to_string(),
            icon: icon.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    pub path_prefix: String,
    pub target_origin: String,
    pub rewrite_origin: bool,
}

impl ProxyRule {
    pub fn new(path_prefix: &str, target_origin: &str) -> Self {
        Self {
            path_prefix: path_prefix.to_string(),
            target_origin: target_origin.trim_end_matches('/').to_string(),
            rewrite_origin: true,
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHost {
    Exact(String),
    Suffix(String), // domain and any subdomain
}

impl AllowedHost {
    /// Parses `example.com`, `.example.com` or `*.example.com`.
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_ascii_lowercase();
        if let Some(domain) = pattern.strip_prefix("*.") {
            Self::Suffix(domain.to_string())
        } else if let Some(domain) = pattern.strip_prefix('.') {
            Self::Suffix(domain.to_string())
        } else {
            Self::Exact(pattern)
        }
    }

    /// `hostname` must already be lowercased and stripped of its port.
    pub fn matches(&self, hostname: &str) -> bool {
        match self {
            Self::Exact(name) => hostname == name,
            Self::Suffix(domain) => {
                hostname == domain
                    || hostname
                        .strip_suffix(domain.as_str())
                        .map_or(false, |rest| rest.ends_with('.'))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetOptions {
    pub endpoint_url: String,
    pub domain_key: String,
    pub greeting: String,
    pub starter_prompts: Vec<StarterPrompt>,
    pub placeholder_text: Option<String>,
    pub theme_storage_key: String,
    pub sidebar_url: String,
}

pub struct AppState {
    pub config: ResolvedConfig,
    pub router: Box<dyn Router>,
    pub client: Client<HttpConnector>,
}

impl AppState {
    pub fn new(config: ResolvedConfig) -> Self {
        let router = build_router(config.mode, config.proxy_rules.clone());
        Self {
            config,
            router,
            client: Client::new(),
        }
    }
}
