//! Pricing snapshots
//!
//! Everything the engine's resolver needs to price a set of products, read
//! inside one transaction: the category tree and the active discounts that
//! target the products or any category on their lineage.

use jiff::Timestamp;
use rustc_hash::FxHashSet;
use storefront::{
    categories::{CategoryTree, CategoryUuid},
    pricing::{DiscountIndex, PriceResolver},
    products::{Product, ProductUuid},
};

use crate::{
    domain::{
        categories::repository::CategoriesRepository, discounts::repository::DiscountsRepository,
    },
    store::StoreError,
};

#[derive(Debug, Clone)]
pub struct PricingSnapshot {
    categories: CategoryTree,
    discounts: DiscountIndex,
}

impl PricingSnapshot {
    /// Read the category tree and the discounts relevant to `products`.
    ///
    /// # Errors
    ///
    /// Returns any storage error raised by the transaction.
    pub async fn load<T>(
        tx: &mut T,
        products: &[Product<'_>],
        point_in_time: Timestamp,
    ) -> Result<Self, StoreError>
    where
        T: CategoriesRepository + DiscountsRepository,
    {
        let categories = CategoryTree::from_categories(tx.list_categories().await?);

        Self::with_tree(tx, categories, products, point_in_time).await
    }

    /// Like [`PricingSnapshot::load`], reusing a tree the caller already read.
    ///
    /// # Errors
    ///
    /// Returns any storage error raised by the transaction.
    pub async fn with_tree<T>(
        tx: &mut T,
        categories: CategoryTree,
        products: &[Product<'_>],
        point_in_time: Timestamp,
    ) -> Result<Self, StoreError>
    where
        T: DiscountsRepository,
    {
        let mut product_ids: Vec<ProductUuid> = products.iter().map(|product| product.uuid).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let mut category_ids: FxHashSet<CategoryUuid> = FxHashSet::default();

        for category in products.iter().filter_map(|product| product.category) {
            match categories.lineage(category) {
                Ok(lineage) => category_ids.extend(lineage),
                Err(_) => {
                    category_ids.insert(category);
                }
            }
        }

        let category_ids: Vec<CategoryUuid> = category_ids.into_iter().collect();

        let mut targeted = Vec::new();

        if !product_ids.is_empty() {
            targeted.extend(tx.active_for_products(&product_ids, point_in_time).await?);
        }

        if !category_ids.is_empty() {
            targeted.extend(tx.active_for_categories(&category_ids, point_in_time).await?);
        }

        Ok(Self {
            categories,
            discounts: DiscountIndex::new(targeted, point_in_time),
        })
    }

    /// Resolver over this snapshot.
    #[must_use]
    pub const fn resolver(&self) -> PriceResolver<'_> {
        PriceResolver::new(&self.categories, &self.discounts)
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryTree {
        &self.categories
    }

    /// Number of active discount targets in the snapshot.
    #[must_use]
    pub fn discount_count(&self) -> usize {
        self.discounts.len()
    }
}
