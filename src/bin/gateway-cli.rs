use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Inspection CLI for the API gateway", long_about = None)]
struct Cli {
    /// Gateway listener base URL
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Admin listener base URL
    #[arg(short, long, default_value = "http://localhost:8081")]
    admin_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the gateway's health endpoint
    Health,
    /// Show overall gateway status
    Status,
    /// List backends with their breaker state
    Breakers,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let target = match cli.command {
        Commands::Health => format!("{}/health", cli.url.trim_end_matches('/')),
        Commands::Status => format!("{}/admin/status", cli.admin_url.trim_end_matches('/')),
        Commands::Breakers => format!("{}/admin/breakers", cli.admin_url.trim_end_matches('/')),
    };

    let res = client.get(target).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
