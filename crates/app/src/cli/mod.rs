use clap::{Parser, Subcommand};
use serde::Serialize;
use storefront_app::{
    config::{LoggingConfig, StoreConfig},
    context::AppContext,
};

mod categories;
mod discounts;
mod migrate;
mod pricing;

#[derive(Debug, Parser)]
#[command(name = "storefront-app", about = "Storefront operator CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending schema migrations
    Migrate(migrate::MigrateArgs),
    Categories(categories::CategoriesCommand),
    Pricing(pricing::PricingCommand),
    Discounts(discounts::DiscountsCommand),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Migrate(args) => migrate::run(args).await,
            Commands::Categories(command) => categories::run(command).await,
            Commands::Pricing(command) => pricing::run(command).await,
            Commands::Discounts(command) => discounts::run(command).await,
        }
    }
}

async fn context(config: &StoreConfig) -> Result<AppContext, String> {
    AppContext::from_config(config)
        .await
        .map_err(|error| format!("failed to initialise: {error}"))
}

#[expect(clippy::print_stdout, reason = "command output goes to stdout")]
fn print_json(value: &impl Serialize) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|error| format!("failed to encode output: {error}"))?;

    println!("{json}");

    Ok(())
}
