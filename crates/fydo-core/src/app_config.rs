use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which route shape the product-data base URL speaks.
///
/// `Upstream` is the OpenFoodFacts layout (`/product/{code}.json`,
/// `/search`). `Proxy` is the layout served by `fydo-server`
/// (`/api/products/{code}`, `/api/products/search`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RouteLayout {
    #[default]
    Upstream,
    Proxy,
}

impl std::fmt::Display for RouteLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouteLayout::Upstream => write!(f, "upstream"),
            RouteLayout::Proxy => write!(f, "proxy"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub off_base_url: String,
    pub off_layout: RouteLayout,
    pub off_timeout_secs: u64,
    pub off_user_agent: String,
    pub off_search_fields: String,
    pub search_page_size: u32,
    pub rate_limit_per_minute: usize,
}
