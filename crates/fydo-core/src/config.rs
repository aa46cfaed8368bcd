use crate::app_config::{AppConfig, Environment, RouteLayout};
use crate::ConfigError;

pub const DEFAULT_OFF_BASE_URL: &str = "https://world.openfoodfacts.org/api/v2";
pub const DEFAULT_USER_AGENT: &str = "Fydo/0.1 (product-lookup)";
pub const DEFAULT_SEARCH_FIELDS: &str = "code,product_name,brands,image_url,image_front_small_url,\
quantity,nutriscore_grade,ecoscore_grade,allergens_tags,ingredients_text,nutriments,categories";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let env = parse_environment(&or_default("FYDO_ENV", "development"))?;
    let bind_addr = parse_addr("FYDO_BIND_ADDR", "0.0.0.0:3001")?;
    let log_level = or_default("FYDO_LOG_LEVEL", "info");

    let off_base_url = or_default("FYDO_OFF_BASE_URL", DEFAULT_OFF_BASE_URL);
    if off_base_url.trim().is_empty() {
        return Err(invalid("FYDO_OFF_BASE_URL", "must not be empty".to_string()));
    }
    let off_layout = parse_layout(&or_default("FYDO_OFF_LAYOUT", "upstream"))?;

    let off_timeout_secs = parse_u64("FYDO_OFF_TIMEOUT_SECS", "10")?;
    if off_timeout_secs == 0 {
        return Err(invalid(
            "FYDO_OFF_TIMEOUT_SECS",
            "must be greater than zero".to_string(),
        ));
    }

    let off_user_agent = or_default("FYDO_OFF_USER_AGENT", DEFAULT_USER_AGENT);
    let off_search_fields = or_default("FYDO_OFF_SEARCH_FIELDS", DEFAULT_SEARCH_FIELDS);

    let search_page_size = parse_u32("FYDO_SEARCH_PAGE_SIZE", "20")?;
    if search_page_size == 0 {
        return Err(invalid(
            "FYDO_SEARCH_PAGE_SIZE",
            "must be greater than zero".to_string(),
        ));
    }

    let rate_limit_per_minute = parse_usize("FYDO_RATE_LIMIT_PER_MINUTE", "100")?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        off_base_url,
        off_layout,
        off_timeout_secs,
        off_user_agent,
        off_search_fields,
        search_page_size,
        rate_limit_per_minute,
    })
}

/// Parse `FYDO_ENV` into an [`Environment`]; unknown values are rejected.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FYDO_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_layout(s: &str) -> Result<RouteLayout, ConfigError> {
    match s {
        "upstream" => Ok(RouteLayout::Upstream),
        "proxy" => Ok(RouteLayout::Proxy),
        other => Err(ConfigError::InvalidEnvVar {
            var: "FYDO_OFF_LAYOUT".to_string(),
            reason: format!("expected \"upstream\" or \"proxy\", got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
