//! Marketplace query CLI
//!
//! Compiles filters to store queries and runs listings against fixture files.

use marketplace_query::cli::{self, Command};
use marketplace_query::config::Config;
use marketplace_query::logging::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    init_tracing(&config);

    let command = Command::parse(std::env::args().skip(1))?;
    tracing::debug!(?command, "Parsed command");

    let output = cli::run(command, &config).await?;
    println!("{output}");
    Ok(())
}
