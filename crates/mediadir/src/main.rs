//! mediadir CLI binary.
//!
//! This binary provides command-line access to a mediadir store:
//! - List, save, export and delete records by category
//! - Hide and reveal records
//! - Print photo metadata and resolved locations

use clap::Parser;
use mediadir::cli::{Cli, run};
use mediadir::telemetry::init_console_telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Parse command-line arguments
    let cli = Cli::parse();

    init_console_telemetry(cli.verbose)?;

    let mut stdout = std::io::stdout();
    if let Err(e) = run(&cli, &mut stdout).await {
        tracing::error!(error = %e, "Command failed");
        return Err(e.into());
    }

    Ok(())
}
