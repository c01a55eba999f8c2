use anyhow::Result;
use clap::Parser;

use lemonade_manager_core::Config;

#[derive(Parser)]
#[command(name = "lemonade-manager")]
#[command(author, version, about = "Web panel for managing a Lemonade inference server", long_about = None)]
struct Cli {
    /// Host interface to bind to (overrides MANAGER_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides MANAGER_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.bind.host = host;
    }
    if let Some(port) = cli.port {
        config.bind.port = port;
    }

    println!(
        "Starting Lemonade Manager on {}:{}...",
        config.bind.host, config.bind.port
    );
    println!("Server Target: {}", config.upstream.base_url);
    if config.upstream.api_key.is_some() {
        println!("API Key:       [Enabled]");
    }
    println!("Recipe File:   {}", config.storage.recipe_file.display());
    println!("Prefs File:    {}", config.storage.prefs_file.display());

    lemonade_manager_server::run_server(config).await
}
