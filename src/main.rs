mod classify;
mod cli;
mod config;
mod diff;
mod exec;
mod llm;
mod pipeline;
mod report;
mod server;

use clap::Parser;
use cli::Cli;
use config::Config;
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is reserved for the report key/value contract
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cli.log_level))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_cli(&cli);

    let code = match pipeline::run(&config, cli.mode).await {
        Ok(code) => code,
        Err(e) => {
            error!("Pipeline aborted: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
