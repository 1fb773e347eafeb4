use clap::{Args, Subcommand};
use jiff::Timestamp;
use serde::Serialize;
use storefront::{pricing::PricedProduct, products::ProductUuid};
use storefront_app::config::StoreConfig;
use uuid::Uuid;

use super::{context, print_json};

#[derive(Debug, Args)]
pub(crate) struct PricingCommand {
    #[command(subcommand)]
    command: PricingSubcommand,
}

#[derive(Debug, Subcommand)]
enum PricingSubcommand {
    /// Resolve the effective price of one product
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
struct ResolveArgs {
    #[command(flatten)]
    config: StoreConfig,

    /// Product to price
    #[arg(long)]
    product: Uuid,

    /// Point in time to price at; now when omitted
    #[arg(long)]
    at: Option<Timestamp>,
}

#[derive(Debug, Serialize)]
struct AppliedOutput {
    discount_uuid: Uuid,
    name: String,
    kind: &'static str,
    amount: String,
}

#[derive(Debug, Serialize)]
struct PriceOutput {
    product_uuid: Uuid,
    currency: String,
    price: String,
    effective_price: String,
    discount: Option<AppliedOutput>,
    priced_at: Timestamp,
}

impl PriceOutput {
    fn new(priced: PricedProduct<'static>, currency: String, priced_at: Timestamp) -> Self {
        Self {
            product_uuid: priced.product.uuid.into_uuid(),
            currency,
            price: priced.product.price.amount().to_string(),
            effective_price: priced.effective_price.amount().to_string(),
            discount: priced.applied.map(|applied| AppliedOutput {
                discount_uuid: applied.discount.into_uuid(),
                name: applied.name,
                kind: applied.kind.as_str(),
                amount: applied.amount.to_string(),
            }),
            priced_at,
        }
    }
}

pub(crate) async fn run(command: PricingCommand) -> Result<(), String> {
    match command.command {
        PricingSubcommand::Resolve(args) => {
            let ctx = context(&args.config).await?;
            let priced_at = args.at.unwrap_or_else(Timestamp::now);

            let priced = ctx
                .pricing
                .resolve(ProductUuid::from_uuid(args.product), priced_at)
                .await
                .map_err(|error| format!("failed to resolve price: {error}"))?;

            print_json(&PriceOutput::new(
                priced,
                args.config.currency.to_ascii_uppercase(),
                priced_at,
            ))
        }
    }
}
