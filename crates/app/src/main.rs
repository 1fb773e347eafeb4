//! Storefront Operator CLI

use std::process::ExitCode;

use clap::Parser;
use storefront_app::{config, logging};
use tracing::error;

mod cli;

#[tokio::main]
pub async fn main() -> ExitCode {
    config::load_dotenv();

    let cli = cli::Cli::parse();

    if let Err(error) = logging::init(&cli.logging) {
        #[expect(
            clippy::print_stderr,
            reason = "logging not initialized yet, must use eprintln"
        )]
        {
            eprintln!("failed to initialise logging: {error}");
        }

        return ExitCode::FAILURE;
    }

    match cli.run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{message}");

            ExitCode::FAILURE
        }
    }
}
