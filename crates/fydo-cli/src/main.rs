mod lookup;
mod search;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use fydo_core::{AppConfig, RouteLayout};
use fydo_openfoodfacts::{ProductLookupClient, QueryOutcome};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "fydo-cli")]
#[command(about = "Look up and search food products on OpenFoodFacts")]
struct Cli {
    /// Override the product API base URL (`FYDO_OFF_BASE_URL`)
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Send requests through a running fydo-server instead of upstream
    #[arg(long, global = true)]
    via_proxy: bool,
    /// Print raw JSON instead of a human-readable summary
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one product by barcode
    Lookup {
        /// EAN/UPC barcode, e.g. 3523230014267
        barcode: String,
    },
    /// Search products by name, loading several pages if asked
    Search {
        /// Free-text search term
        term: String,
        /// Number of pages to accumulate
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        pages: u32,
        /// Results per page (defaults to `FYDO_SEARCH_PAGE_SIZE`)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
        page_size: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = fydo_core::load_app_config()?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(&config.log_level)?)
        .with_writer(std::io::stderr)
        .init();

    let Some(command) = cli.command else {
        println!("fydo-cli ready; run with --help for commands");
        return Ok(ExitCode::SUCCESS);
    };

    let client = build_client(&config, cli.base_url.as_deref(), cli.via_proxy)?;
    tracing::debug!(
        base_url = %client.base_url(),
        layout = %client.layout(),
        "client configured"
    );

    let status = match command {
        Commands::Lookup { barcode } => {
            let outcome = lookup::run_lookup(&client, &barcode, cli.json).await?;
            exit_status(&outcome)
        }
        Commands::Search {
            term,
            pages,
            page_size,
        } => {
            let page_size = page_size.unwrap_or(config.search_page_size);
            let outcome =
                search::run_search(Arc::new(client), &term, pages, page_size, cli.json).await?;
            exit_status(&outcome)
        }
    };

    Ok(ExitCode::from(status))
}

/// Builds the shared client, applying command-line overrides on top of the
/// loaded configuration.
/// `RUST_LOG` wins when set; otherwise the configured `FYDO_LOG_LEVEL`.
fn env_filter(log_level: &str) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(log_level))?)
}

fn build_client(
    config: &AppConfig,
    base_url: Option<&str>,
    via_proxy: bool,
) -> anyhow::Result<ProductLookupClient> {
    let layout = if via_proxy {
        RouteLayout::Proxy
    } else {
        config.off_layout
    };
    let base_url = match (base_url, via_proxy) {
        (Some(url), _) => url.to_owned(),
        (None, true) => local_proxy_url(config.bind_addr),
        (None, false) => config.off_base_url.clone(),
    };

    let client = ProductLookupClient::with_base_url(
        &base_url,
        layout,
        Duration::from_secs(config.off_timeout_secs),
        &config.off_user_agent,
    )?;
    Ok(client.with_search_fields(&config.off_search_fields))
}

/// URL of the proxy listening on `bind_addr`; a wildcard bind is reached
/// through loopback.
fn local_proxy_url(bind_addr: SocketAddr) -> String {
    let ip = if bind_addr.ip().is_unspecified() {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        bind_addr.ip()
    };
    format!("http://{}", SocketAddr::new(ip, bind_addr.port()))
}

/// `NotFound` is a valid answer and exits zero; caller errors exit 2 and
/// every other failure exits 1.
fn exit_status<T>(outcome: &QueryOutcome<T>) -> u8 {
    match outcome {
        QueryOutcome::Success(_) | QueryOutcome::NotFound => 0,
        QueryOutcome::InvalidInput(_) => 2,
        _ => 1,
    }
}

/// One-line description of a failed outcome for stderr.
fn describe_failure<T>(outcome: &QueryOutcome<T>) -> String {
    match outcome {
        QueryOutcome::Success(_) => "success".to_owned(),
        QueryOutcome::NotFound => "not found".to_owned(),
        QueryOutcome::InvalidInput(reason) => format!("invalid input: {reason}"),
        QueryOutcome::Timeout => "the product service did not answer in time".to_owned(),
        QueryOutcome::NetworkError(message) => format!("network error: {message}"),
        QueryOutcome::UpstreamError(status) => {
            format!("the product service answered with HTTP {status}")
        }
        QueryOutcome::MalformedResponse(message) => format!("unreadable response: {message}"),
    }
}
