//! urlcheck: synthetic monitoring over HTTP.
//!
//! # Architecture Overview
//!
//! ```text
//!                ┌──────────────────────────────────────────────────────┐
//!                │                      URLCHECK                         │
//!                │                                                       │
//!  POST / {url}  │  ┌─────────┐   ┌────────────┐   ┌─────────────────┐  │
//!  ──────────────┼─▶│  http   │──▶│  checker   │──▶│ transport+probe │──┼──▶ Target
//!                │  │ server  │   │ (deadline, │   │ DNS/TCP/TLS/GET │  │
//!                │  └────┬────┘   │ redirects) │   └─────────────────┘  │
//!                │       │        └─────┬──────┘                        │
//!  CheckResult   │       │              ▼                               │
//!  ◀─────────────┼───────┘        ┌────────────┐   ┌─────────────────┐  │
//!                │                │  dispatch  │──▶│ InfluxDB sink   │──┼──▶
//!                │                │ (classify) │──▶│ Mailgun notifier│──┼──▶
//!                │                └────────────┘   └─────────────────┘  │
//!                │                                                       │
//!                │  config · health · lifecycle · observability          │
//!                └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use urlcheck::config::load_config;
use urlcheck::http::{bind, HttpServer, Services};
use urlcheck::lifecycle::Shutdown;
use urlcheck::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "urlcheck", version, about = "Synthetic URL check service")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file. ":3000" binds all interfaces.
    #[arg(short, long)]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref(), args.listen_addr.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("urlcheck: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "urlcheck starting");
    tracing::info!(
        listen_address = %config.server.listen_address,
        check_timeout_secs = config.checker.timeout_secs,
        failure_status = config.alerting.failure_status,
        dispatch_mode = ?config.alerting.dispatch_mode,
        influxdb = config.influxdb.enabled,
        mailgun = config.mailgun.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = Services::from_config(&config)?;
    let listener = bind(&config.server.listen_address).await?;
    let server = HttpServer::new(&config, services);

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
