use clap::{Args, Subcommand};
use serde::Serialize;
use storefront::categories::CategoryTreeNode;
use storefront_app::config::StoreConfig;
use uuid::Uuid;

use super::{context, print_json};

#[derive(Debug, Args)]
pub(crate) struct CategoriesCommand {
    #[command(subcommand)]
    command: CategoriesSubcommand,
}

#[derive(Debug, Subcommand)]
enum CategoriesSubcommand {
    /// Print the category forest as JSON
    Tree(StoreConfig),
}

#[derive(Debug, Serialize)]
struct CategoryOutput {
    uuid: Uuid,
    name: String,
    sort_order: i32,
    children: Vec<CategoryOutput>,
}

impl From<CategoryTreeNode> for CategoryOutput {
    fn from(node: CategoryTreeNode) -> Self {
        Self {
            uuid: node.category.uuid.into_uuid(),
            name: node.category.name,
            sort_order: node.category.sort_order,
            children: node.children.into_iter().map(Self::from).collect(),
        }
    }
}

pub(crate) async fn run(command: CategoriesCommand) -> Result<(), String> {
    match command.command {
        CategoriesSubcommand::Tree(config) => {
            let ctx = context(&config).await?;

            let forest = ctx
                .categories
                .tree()
                .await
                .map_err(|error| format!("failed to load categories: {error}"))?;

            let output: Vec<CategoryOutput> = forest.into_iter().map(CategoryOutput::from).collect();

            print_json(&output)
        }
    }
}
