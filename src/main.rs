use std::sync::Arc;

use anyhow::Context;
use chelsea_site_kit::{ColorExtractor, HttpImageFetcher, KitConfig, ServeArgs, server};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "chelsea-site-kit", version, about = "Chelsea Beach site integration services")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the color extraction HTTP service.
    Serve(ServeArgs),
    /// Print the effective configuration as JSON.
    Config(ServeArgs),
}

fn load_config(args: &ServeArgs) -> anyhow::Result<KitConfig> {
    let base = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            KitConfig::from_json(&raw).with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => KitConfig::default(),
    };
    Ok(args.apply_to(base))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chelsea_site_kit=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let config = load_config(&args)?;
            let fetcher = HttpImageFetcher::new(config.fetch_timeout())?.with_max_bytes(config.max_image_bytes);
            let extractor = ColorExtractor::new(Arc::new(fetcher)).with_canvas_size(config.canvas_size);
            info!(canvas_size = config.canvas_size, "starting color extraction service");

            let listener = tokio::net::TcpListener::bind(&config.bind)
                .await
                .with_context(|| format!("binding {}", config.bind))?;
            server::serve(listener, server::router(extractor)).await?;
        }
        Command::Config(args) => {
            println!("{}", load_config(&args)?.to_json_pretty()?);
        }
    }

    Ok(())
}
