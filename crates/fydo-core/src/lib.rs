pub mod app_config;
pub mod config;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, RouteLayout};
pub use config::{load_app_config, load_app_config_from_env};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
