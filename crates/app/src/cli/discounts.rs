use clap::{Args, Subcommand};
use serde::Serialize;
use storefront::discounts::DiscountUuid;
use storefront_app::config::StoreConfig;
use uuid::Uuid;

use super::{context, print_json};

#[derive(Debug, Args)]
pub(crate) struct DiscountsCommand {
    #[command(subcommand)]
    command: DiscountsSubcommand,
}

#[derive(Debug, Subcommand)]
enum DiscountsSubcommand {
    /// Archive a discount so it no longer applies
    Archive(ArchiveArgs),
}

#[derive(Debug, Args)]
struct ArchiveArgs {
    #[command(flatten)]
    config: StoreConfig,

    /// Discount to archive
    #[arg(long)]
    discount: Uuid,
}

#[derive(Debug, Serialize)]
struct ArchivedOutput {
    discount_uuid: Uuid,
    name: String,
    is_archived: bool,
    target_count: usize,
}

pub(crate) async fn run(command: DiscountsCommand) -> Result<(), String> {
    match command.command {
        DiscountsSubcommand::Archive(args) => {
            let ctx = context(&args.config).await?;

            let details = ctx
                .discounts
                .remove_discount(DiscountUuid::from_uuid(args.discount))
                .await
                .map_err(|error| format!("failed to archive discount: {error}"))?;

            print_json(&ArchivedOutput {
                discount_uuid: details.discount.uuid.into_uuid(),
                name: details.discount.name,
                is_archived: details.discount.is_archived,
                target_count: details.targets.len(),
            })
        }
    }
}
