use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "urlcheck-cli")]
#[command(about = "Command-line client for a running urlcheck service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    server: String,

    /// Client-side timeout; must exceed the service's check timeout.
    #[arg(short, long, default_value_t = 45)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a URL through the service
    Check { url: String },
    /// Query service readiness
    Health,
    /// Query service liveness
    Ping,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs))
        .build()?;
    let base = cli.server.trim_end_matches('/');

    let res = match cli.command {
        Commands::Check { url } => {
            client
                .post(format!("{base}/"))
                .json(&json!({ "url": url }))
                .send()
                .await?
        }
        Commands::Health => client.get(format!("{base}/health")).send().await?,
        Commands::Ping => client.get(format!("{base}/ping")).send().await?,
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{body}");
    } else {
        eprintln!("Error: service returned status {status}");
        eprintln!("{body}");
        std::process::exit(1);
    }
    Ok(())
}
