use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repo_docs::cli::{run, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli).await {
        Ok(report) => {
            println!("Run complete.\nReport:");
            println!("{:#?}", report);
            Ok(())
        }
        Err(e) => {
            eprintln!("[ERROR] Run failed: {e}");
            std::process::exit(1);
        }
    }
}
